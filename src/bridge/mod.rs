//! Radio bridge integration: remote devices exposed as dynamic endpoints.

pub mod link;
pub mod persistence;
pub mod registry;

pub use link::{LoggingLink, RemoteId, RemoteLink};
pub use persistence::{BridgeStore, PersistedDevice, PersistedDevices};
pub use registry::{BridgeEntry, BridgeRegistry, ResumeReport};
