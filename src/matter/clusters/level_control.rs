//! Level Control cluster (0x0008).

use super::with_globals;
use crate::matter::data_model::{AttrType, AttrValue, AttributeSpec, ClusterId, ClusterSpec};
use serde::{Deserialize, Serialize};

pub const ID: ClusterId = 0x0008;
pub const CLUSTER_REVISION: u16 = 5;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    pub const CURRENT_LEVEL: AttributeId = 0x0000;
    pub const MIN_LEVEL: AttributeId = 0x0002;
    pub const MAX_LEVEL: AttributeId = 0x0003;
    pub const OPTIONS: AttributeId = 0x000F;
    pub const ON_LEVEL: AttributeId = 0x0011;
    pub const START_UP_CURRENT_LEVEL: AttributeId = 0x4000;
}

pub mod feature {
    pub const ON_OFF: u32 = 0x01;
    pub const LIGHTING: u32 = 0x02;
}

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 254;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub current_level: u8,
    pub on_level: Option<u8>,
    pub start_up_current_level: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_level: 64,
            on_level: None,
            start_up_current_level: Some(64),
        }
    }
}

fn nullable_u8(v: Option<u8>) -> AttrValue {
    v.map(AttrValue::U8).unwrap_or(AttrValue::Null)
}

pub fn cluster(config: &Config) -> ClusterSpec {
    let start_up = nullable_u8(config.start_up_current_level);
    with_globals(ID, feature::ON_OFF | feature::LIGHTING, CLUSTER_REVISION)
        .with_attribute(
            AttributeSpec::nullable(
                attributes::CURRENT_LEVEL,
                AttrType::U8,
                AttrValue::U8(config.current_level),
            )
            .with_startup_default(Some(start_up.clone())),
        )
        .with_attribute(AttributeSpec::new(attributes::MIN_LEVEL, MIN_LEVEL).read_only())
        .with_attribute(AttributeSpec::new(attributes::MAX_LEVEL, MAX_LEVEL).read_only())
        .with_attribute(AttributeSpec::new(attributes::OPTIONS, 0u8))
        .with_attribute(AttributeSpec::nullable(
            attributes::ON_LEVEL,
            AttrType::U8,
            nullable_u8(config.on_level),
        ))
        .with_attribute(AttributeSpec::nullable(
            attributes::START_UP_CURRENT_LEVEL,
            AttrType::U8,
            start_up,
        ))
}
