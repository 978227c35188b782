use crate::matter::data_model::{AttrPath, AttrType};
use thiserror::Error as ThisError;

/// Which side of a committed write a hook failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum HookPhase {
    /// Failure before commit; the stored value is unchanged.
    #[strum(serialize = "pre-update")]
    Pre,
    /// Failure after commit; the stored value already holds the new value.
    #[strum(serialize = "post-update")]
    Post,
}

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum DataModelError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(u16),

    #[error("Cluster 0x{cluster:04X} already exists on endpoint {endpoint}")]
    DuplicateCluster { endpoint: u16, cluster: u32 },

    #[error("Attribute 0x{attribute:04X} already exists in cluster 0x{cluster:04X} on endpoint {endpoint}")]
    DuplicateAttribute {
        endpoint: u16,
        cluster: u32,
        attribute: u32,
    },

    #[error("Cluster 0x{cluster:04X} not found on endpoint {endpoint}")]
    UnknownCluster { endpoint: u16, cluster: u32 },

    #[error("Attribute path not found: {0}")]
    NotFound(AttrPath),

    #[error("Attribute is read-only: {0}")]
    UnsupportedWrite(AttrPath),

    #[error("Type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: AttrPath,
        expected: AttrType,
        actual: AttrType,
    },

    #[error("Maximum endpoint count reached")]
    CapacityExceeded,

    #[error("Operation only valid during node construction")]
    InvalidPhase,

    #[error("Endpoint {0} is static and cannot be removed")]
    StaticEndpointImmutable(u16),

    #[error("Remote device already bridged: {0}")]
    DuplicateRemote(String),

    #[error("Remote device not bridged: {0}")]
    UnknownRemote(String),

    #[error("{phase} hook rejected write: {reason}")]
    HookRejected { phase: HookPhase, reason: String },
}

impl DataModelError {
    /// True when the error left the attribute with the newly written value.
    pub fn value_committed(&self) -> bool {
        matches!(
            self,
            Self::HookRejected {
                phase: HookPhase::Post,
                ..
            }
        )
    }
}

/// Failure reported by a driver hook or a remote link.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(ThisError, Debug)]
pub enum PersistError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataModelError>;
