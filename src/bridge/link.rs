//! Remote-command interface of the radio bridge.
//!
//! Writes addressed to a bridged endpoint are not applied to local hardware;
//! they are handed to a [`RemoteLink`] that delivers them over the radio.

use crate::error::HookError;
use crate::matter::data_model::{AttrPath, AttrValue};
use crate::matter::endpoints::{AttributeHooks, UpdateContext};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier the radio bridge assigns to a remote device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a device known by its radio MAC address.
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self(
            mac.iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(":"),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Outbound side of the radio bridge.
///
/// `send_write` runs inside attribute dispatch and must not block; queue the
/// frame and return. An error vetoes the write.
pub trait RemoteLink: Send + Sync + 'static {
    fn send_write(&self, remote: &RemoteId, path: AttrPath, value: &AttrValue)
    -> Result<(), HookError>;
}

/// Link that only logs. Used when no radio is attached.
pub struct LoggingLink;

impl RemoteLink for LoggingLink {
    fn send_write(
        &self,
        remote: &RemoteId,
        path: AttrPath,
        value: &AttrValue,
    ) -> Result<(), HookError> {
        info!("[Bridge] -> {}: {} = {}", remote, path, value);
        Ok(())
    }
}

/// Hooks installed on a bridged endpoint: the pre-update step forwards the
/// write to the remote device instead of local hardware.
pub(crate) struct RemoteForwarder {
    remote: RemoteId,
    link: Arc<dyn RemoteLink>,
}

impl RemoteForwarder {
    pub(crate) fn new(remote: RemoteId, link: Arc<dyn RemoteLink>) -> Self {
        Self { remote, link }
    }
}

impl AttributeHooks for RemoteForwarder {
    fn pre_update(&self, ctx: &UpdateContext<'_>) -> Result<(), HookError> {
        debug!("[Bridge] Forwarding {} to {}", ctx.path, self.remote);
        self.link.send_write(&self.remote, ctx.path, ctx.value)
    }
}
