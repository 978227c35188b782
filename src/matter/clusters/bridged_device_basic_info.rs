//! BridgedDeviceBasicInformation Cluster (0x0039).
//!
//! Every bridged endpoint carries one. Controllers read NodeLabel to name the
//! bridged device and Reachable to grey it out when the radio link drops.

use super::with_globals;
use crate::matter::data_model::{AttributeSpec, ClusterId, ClusterSpec};

pub const ID: ClusterId = 0x0039;
pub const CLUSTER_REVISION: u16 = 4;

pub mod attributes {
    use crate::matter::data_model::AttributeId;

    pub const NODE_LABEL: AttributeId = 0x0005;
    pub const REACHABLE: AttributeId = 0x0011;
}

/// Cluster reporting the device as reachable under `label`.
pub fn cluster(label: &str) -> ClusterSpec {
    with_globals(ID, 0, CLUSTER_REVISION)
        .with_attribute(AttributeSpec::new(attributes::NODE_LABEL, label))
        .with_attribute(AttributeSpec::new(attributes::REACHABLE, true).read_only())
}
