//! Identify cluster (0x0003).
//!
//! Lets a controller make the light stand out, by a countdown written to
//! IdentifyTime or by a TriggerEffect command. The command side reaches the
//! driver through [`AttributeHooks::identify`](crate::matter::endpoints::AttributeHooks::identify).

use super::with_globals;
use crate::matter::data_model::{AttrValue, AttributeSpec, ClusterId, ClusterSpec};
use serde::{Deserialize, Serialize};

pub const ID: ClusterId = 0x0003;
pub const CLUSTER_REVISION: u16 = 4;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    /// Seconds left to identify, 0 when idle.
    pub const IDENTIFY_TIME: AttributeId = 0x0000;
    pub const IDENTIFY_TYPE: AttributeId = 0x0001;
}

/// IdentifyType enumeration values.
pub mod identify_type {
    pub const NONE: u8 = 0x00;
    pub const LIGHT_OUTPUT: u8 = 0x01;
    pub const VISIBLE_INDICATOR: u8 = 0x02;
    pub const AUDIBLE_BEEP: u8 = 0x03;
    pub const DISPLAY: u8 = 0x04;
    pub const ACTUATOR: u8 = 0x05;
}

/// TriggerEffect effect identifiers.
pub mod effect {
    pub const BLINK: u8 = 0x00;
    pub const BREATHE: u8 = 0x01;
    pub const OKAY: u8 = 0x02;
    pub const CHANNEL_CHANGE: u8 = 0x0B;
    pub const FINISH_EFFECT: u8 = 0xFE;
    pub const STOP_EFFECT: u8 = 0xFF;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub identify_type: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identify_type: identify_type::LIGHT_OUTPUT,
        }
    }
}

pub fn cluster(config: &Config) -> ClusterSpec {
    with_globals(ID, 0, CLUSTER_REVISION)
        .with_attribute(AttributeSpec::new(attributes::IDENTIFY_TIME, 0u16))
        .with_attribute(
            AttributeSpec::new(attributes::IDENTIFY_TYPE, AttrValue::Enum8(config.identify_type))
                .read_only(),
        )
}
