//! Endpoint templates and the driver hook interface.
//!
//! - `handler`: `AttributeHooks` trait drivers implement
//! - `root_node`, `color_temperature_light`, `aggregator`: endpoint builders

pub mod aggregator;
pub mod color_temperature_light;
pub mod handler;
pub mod root_node;

pub use handler::{AttributeHooks, IdentifyRequest, UpdateContext};
