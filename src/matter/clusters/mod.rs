//! Cluster catalogue for the light node and its bridged devices.
//!
//! Each module carries the cluster id, attribute ids, a serde-derived
//! `Config` with the defaults the node starts from, and a `cluster()`
//! builder producing the [`ClusterSpec`] that goes into the capability tree.

use super::data_model::{AttrValue, AttributeId, AttributeSpec, ClusterSpec};

pub mod basic_information;
pub mod bridged_device_basic_info;
pub mod color_control;
pub mod identify;
pub mod level_control;
pub mod on_off;

/// Global attributes present on every cluster.
pub mod global {
    use super::AttributeId;

    pub const FEATURE_MAP: AttributeId = crate::matter::data_model::FEATURE_MAP_ATTRIBUTE_ID;
    pub const CLUSTER_REVISION: AttributeId = 0xFFFD;
}

/// Start a cluster spec with its FeatureMap and ClusterRevision attributes.
pub(crate) fn with_globals(id: u32, features: u32, revision: u16) -> ClusterSpec {
    ClusterSpec::new(id)
        .with_attribute(
            AttributeSpec::new(global::FEATURE_MAP, AttrValue::Bitmap32(features)).read_only(),
        )
        .with_attribute(AttributeSpec::new(global::CLUSTER_REVISION, revision).read_only())
}
