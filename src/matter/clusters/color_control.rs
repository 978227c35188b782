//! Color Control cluster (0x0300).
//!
//! Created with the color temperature feature. Hue/saturation is an optional
//! feature added during node construction via [`feature::hue_saturation::add`].

use super::with_globals;
use crate::matter::data_model::{AttrType, AttrValue, AttributeSpec, ClusterId, ClusterSpec};
use serde::{Deserialize, Serialize};

pub const ID: ClusterId = 0x0300;
pub const CLUSTER_REVISION: u16 = 6;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    pub const CURRENT_HUE: AttributeId = 0x0000;
    pub const CURRENT_SATURATION: AttributeId = 0x0001;
    pub const COLOR_TEMPERATURE_MIREDS: AttributeId = 0x0007;
    pub const COLOR_MODE: AttributeId = 0x0008;
    pub const OPTIONS: AttributeId = 0x000F;
    pub const ENHANCED_COLOR_MODE: AttributeId = 0x4001;
    pub const COLOR_CAPABILITIES: AttributeId = 0x400A;
    pub const COLOR_TEMP_PHYSICAL_MIN_MIREDS: AttributeId = 0x400B;
    pub const COLOR_TEMP_PHYSICAL_MAX_MIREDS: AttributeId = 0x400C;
    pub const START_UP_COLOR_TEMPERATURE_MIREDS: AttributeId = 0x4010;
}

/// ColorMode enumeration values.
pub mod color_mode {
    pub const HUE_SATURATION: u8 = 0;
    pub const XY: u8 = 1;
    pub const COLOR_TEMPERATURE: u8 = 2;
}

pub const MIN_MIREDS: u16 = 153;
pub const MAX_MIREDS: u16 = 500;
pub const MAX_HUE: u8 = 254;
pub const MAX_SATURATION: u8 = 254;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub color_mode: u8,
    pub enhanced_color_mode: u8,
    pub color_temperature_mireds: u16,
    pub start_up_color_temperature_mireds: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_mode: color_mode::COLOR_TEMPERATURE,
            enhanced_color_mode: color_mode::COLOR_TEMPERATURE,
            color_temperature_mireds: 250,
            start_up_color_temperature_mireds: None,
        }
    }
}

pub fn cluster(config: &Config) -> ClusterSpec {
    let start_up = config
        .start_up_color_temperature_mireds
        .map(AttrValue::U16)
        .unwrap_or(AttrValue::Null);
    with_globals(ID, feature::color_temperature::BIT, CLUSTER_REVISION)
        .with_attribute(
            AttributeSpec::new(attributes::COLOR_MODE, AttrValue::Enum8(config.color_mode))
                .read_only(),
        )
        .with_attribute(
            AttributeSpec::new(
                attributes::ENHANCED_COLOR_MODE,
                AttrValue::Enum8(config.enhanced_color_mode),
            )
            .read_only(),
        )
        .with_attribute(AttributeSpec::new(attributes::OPTIONS, 0u8))
        .with_attribute(
            AttributeSpec::new(
                attributes::COLOR_CAPABILITIES,
                feature::color_temperature::BIT as u16,
            )
            .read_only(),
        )
        .with_attribute(
            AttributeSpec::new(
                attributes::COLOR_TEMPERATURE_MIREDS,
                config.color_temperature_mireds,
            )
            .with_startup_default(Some(start_up.clone())),
        )
        .with_attribute(
            AttributeSpec::new(attributes::COLOR_TEMP_PHYSICAL_MIN_MIREDS, MIN_MIREDS).read_only(),
        )
        .with_attribute(
            AttributeSpec::new(attributes::COLOR_TEMP_PHYSICAL_MAX_MIREDS, MAX_MIREDS).read_only(),
        )
        .with_attribute(AttributeSpec::nullable(
            attributes::START_UP_COLOR_TEMPERATURE_MIREDS,
            AttrType::U16,
            start_up,
        ))
}

pub mod feature {
    pub mod color_temperature {
        pub const BIT: u32 = 0x10;
    }

    pub mod hue_saturation {
        use super::super::{ID, attributes};
        use crate::error::Result;
        use crate::matter::data_model::{
            AttrPath, AttrValue, AttributeSpec, DataModel, EndpointId, Feature,
        };
        use serde::{Deserialize, Serialize};

        pub const BIT: u32 = 0x01;

        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct Config {
            pub current_hue: u8,
            pub current_saturation: u8,
        }

        impl Default for Config {
            fn default() -> Self {
                Self {
                    current_hue: 128,
                    current_saturation: 254,
                }
            }
        }

        pub fn feature(config: &Config) -> Feature {
            Feature {
                bit: BIT,
                attributes: vec![
                    AttributeSpec::new(attributes::CURRENT_HUE, config.current_hue),
                    AttributeSpec::new(attributes::CURRENT_SATURATION, config.current_saturation),
                ],
            }
        }

        /// Add hue/saturation to the color control cluster of `endpoint`.
        ///
        /// Construction phase only. Also advertises the capability in
        /// ColorCapabilities.
        pub fn add(model: &DataModel, endpoint: EndpointId, config: &Config) -> Result<()> {
            model.mutate(|tree| {
                tree.add_feature(endpoint, ID, feature(config))?;
                let caps = AttrPath::new(endpoint, ID, attributes::COLOR_CAPABILITIES);
                if let Some(current) = tree.resolve(caps).ok().and_then(|a| a.value().as_i64()) {
                    tree.commit(caps, AttrValue::U16(current as u16 | BIT as u16))?;
                }
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataModelError;
    use crate::matter::clusters::global;
    use crate::matter::data_model::{AttrPath, DataModel, EndpointKind};

    fn setup() -> (DataModel, u16) {
        let model = DataModel::with_capacity(4);
        let ep = model.create_endpoint(EndpointKind::Static, None).unwrap();
        model.add_cluster(ep, cluster(&Config::default())).unwrap();
        (model, ep)
    }

    #[test]
    fn test_hue_saturation_feature_adds_attributes() {
        let (model, ep) = setup();
        feature::hue_saturation::add(&model, ep, &Default::default()).unwrap();

        assert_eq!(
            model
                .read_attribute(AttrPath::new(ep, ID, attributes::CURRENT_HUE))
                .unwrap(),
            AttrValue::U8(128)
        );
        assert_eq!(
            model
                .read_attribute(AttrPath::new(ep, ID, global::FEATURE_MAP))
                .unwrap(),
            AttrValue::Bitmap32(0x11)
        );
        assert_eq!(
            model
                .read_attribute(AttrPath::new(ep, ID, attributes::COLOR_CAPABILITIES))
                .unwrap(),
            AttrValue::U16(0x11)
        );
    }

    #[test]
    fn test_hue_saturation_rejected_after_start() {
        let (model, ep) = setup();
        model.start_serving();
        assert_eq!(
            feature::hue_saturation::add(&model, ep, &Default::default()),
            Err(DataModelError::InvalidPhase)
        );
        assert!(model
            .resolve(AttrPath::new(ep, ID, attributes::CURRENT_HUE))
            .is_err());
    }
}
