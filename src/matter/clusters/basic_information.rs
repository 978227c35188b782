//! Basic Information cluster (0x0028) on the root endpoint.

use super::with_globals;
use crate::matter::data_model::{AttributeSpec, ClusterId, ClusterSpec};
use serde::{Deserialize, Serialize};

pub const ID: ClusterId = 0x0028;
pub const CLUSTER_REVISION: u16 = 3;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    pub const VENDOR_NAME: AttributeId = 0x0001;
    pub const VENDOR_ID: AttributeId = 0x0002;
    pub const PRODUCT_NAME: AttributeId = 0x0003;
    pub const PRODUCT_ID: AttributeId = 0x0004;
    pub const NODE_LABEL: AttributeId = 0x0005;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vendor_name: String,
    pub vendor_id: u16,
    pub product_name: String,
    pub product_id: u16,
    pub node_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_name: "Bridge Light".to_string(),
            vendor_id: 0xFFF1,
            product_name: "Bridged Light Node".to_string(),
            product_id: 0x8001,
            node_label: "Bridged Light".to_string(),
        }
    }
}

pub fn cluster(config: &Config) -> ClusterSpec {
    with_globals(ID, 0, CLUSTER_REVISION)
        .with_attribute(
            AttributeSpec::new(attributes::VENDOR_NAME, config.vendor_name.as_str()).read_only(),
        )
        .with_attribute(AttributeSpec::new(attributes::VENDOR_ID, config.vendor_id).read_only())
        .with_attribute(
            AttributeSpec::new(attributes::PRODUCT_NAME, config.product_name.as_str()).read_only(),
        )
        .with_attribute(AttributeSpec::new(attributes::PRODUCT_ID, config.product_id).read_only())
        .with_attribute(AttributeSpec::new(
            attributes::NODE_LABEL,
            config.node_label.as_str(),
        ))
}
