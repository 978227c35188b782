//! Matter-side core of the light node.

pub mod clusters;
pub mod data_model;
pub mod device_types;
pub mod dispatch;
pub mod endpoints;
pub mod lifecycle;
pub mod node;

pub use dispatch::AttributeDispatcher;
pub use lifecycle::{LifecycleEvent, LifecycleState, LifecycleTracker};
pub use node::Node;
