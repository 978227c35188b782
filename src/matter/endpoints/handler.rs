//! AttributeHooks trait connecting attribute writes to driver logic.
//!
//! Implement this trait to let a physical (or remote) driver take part in
//! attribute writes on the endpoints it owns.
//! - `pre_update` runs before the value is stored and can veto the write
//! - `post_update` runs after the value is stored and observes it
//! - `identify` receives Identify cluster requests for the endpoint

use crate::error::HookError;
use crate::matter::clusters::identify;
use crate::matter::data_model::{AttrPath, AttrValue, DriverHandle, EndpointId};

/// Everything a hook learns about one write.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub path: AttrPath,
    pub value: &'a AttrValue,
    /// Token supplied when the endpoint was created, passed through untouched.
    pub driver: Option<DriverHandle>,
}

/// An Identify cluster request addressed to one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyRequest {
    /// Identify for this many seconds.
    Start { time: u16 },
    Stop,
    /// TriggerEffect command.
    Effect { effect_id: u8, effect_variant: u8 },
}

impl IdentifyRequest {
    /// IdentifyTime value the request leaves behind, `None` when unchanged.
    pub fn identify_time(&self) -> Option<u16> {
        match *self {
            Self::Start { time } => Some(time),
            Self::Stop => Some(0),
            Self::Effect { effect_id, .. }
                if effect_id == identify::effect::FINISH_EFFECT
                    || effect_id == identify::effect::STOP_EFFECT =>
            {
                Some(0)
            }
            Self::Effect { .. } => None,
        }
    }
}

/// Trait for driver participation in attribute writes.
///
/// Hooks run synchronously on the caller's thread while the node's mutation
/// lock is held. They must return promptly: no unbounded I/O, no waiting on
/// other threads that may themselves be writing attributes.
///
/// # Example
/// ```ignore
/// struct Relay {
///     pin: AtomicBool,
/// }
///
/// impl AttributeHooks for Relay {
///     fn pre_update(&self, ctx: &UpdateContext<'_>) -> Result<(), HookError> {
///         match ctx.value.as_bool() {
///             Some(on) => {
///                 self.pin.store(on, Ordering::SeqCst);
///                 Ok(())
///             }
///             None => Err(HookError::new("relay only accepts booleans")),
///         }
///     }
/// }
/// ```
pub trait AttributeHooks: Send + Sync + 'static {
    /// Called before commit. An error aborts the write; the stored value is
    /// left unchanged and the error reaches the caller.
    fn pre_update(&self, ctx: &UpdateContext<'_>) -> Result<(), HookError>;

    /// Called after commit. An error is reported to the caller but the
    /// committed value stays.
    fn post_update(&self, _ctx: &UpdateContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// Called for Identify requests on the endpoint. An error rejects the
    /// request and leaves IdentifyTime unchanged.
    fn identify(&self, _endpoint: EndpointId, _request: IdentifyRequest) -> Result<(), HookError> {
        Ok(())
    }
}
