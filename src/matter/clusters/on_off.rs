//! On/Off cluster (0x0006).

use super::with_globals;
use crate::matter::data_model::{AttrType, AttrValue, AttributeSpec, ClusterId, ClusterSpec};
use serde::{Deserialize, Serialize};

pub const ID: ClusterId = 0x0006;
pub const CLUSTER_REVISION: u16 = 6;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    pub const ON_OFF: AttributeId = 0x0000;
    pub const GLOBAL_SCENE_CONTROL: AttributeId = 0x4000;
    pub const ON_TIME: AttributeId = 0x4001;
    pub const OFF_WAIT_TIME: AttributeId = 0x4002;
    pub const START_UP_ON_OFF: AttributeId = 0x4003;
}

pub mod feature {
    pub const LIGHTING: u32 = 0x01;
}

/// StartUpOnOff enumeration values.
pub mod start_up {
    pub const OFF: u8 = 0;
    pub const ON: u8 = 1;
    pub const TOGGLE: u8 = 2;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub on_off: bool,
    /// `None` keeps the last state across power cycles.
    pub start_up_on_off: Option<u8>,
    pub lighting: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            on_off: false,
            start_up_on_off: None,
            lighting: true,
        }
    }
}

pub fn cluster(config: &Config) -> ClusterSpec {
    let start_up = config.start_up_on_off.map(AttrValue::Enum8);
    let initial = match start_up {
        Some(AttrValue::Enum8(start_up::ON)) => true,
        Some(AttrValue::Enum8(start_up::OFF)) => false,
        Some(AttrValue::Enum8(start_up::TOGGLE)) => !config.on_off,
        _ => config.on_off,
    };
    let features = if config.lighting { feature::LIGHTING } else { 0 };

    let mut spec = with_globals(ID, features, CLUSTER_REVISION)
        .with_attribute(AttributeSpec::new(attributes::ON_OFF, initial));
    if config.lighting {
        spec = spec
            .with_attribute(AttributeSpec::new(attributes::GLOBAL_SCENE_CONTROL, true).read_only())
            .with_attribute(AttributeSpec::new(attributes::ON_TIME, 0u16))
            .with_attribute(AttributeSpec::new(attributes::OFF_WAIT_TIME, 0u16))
            .with_attribute(AttributeSpec::nullable(
                attributes::START_UP_ON_OFF,
                AttrType::Enum8,
                start_up.unwrap_or(AttrValue::Null),
            ));
    }
    spec
}
