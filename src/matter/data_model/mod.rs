//! In-memory Matter data model: endpoints, clusters, attributes.

mod shared;
mod tree;
mod value;

pub use shared::DataModel;
pub use tree::{
    AttrPath, Attribute, AttributeId, AttributeSpec, CapabilityTree, Cluster, ClusterId,
    ClusterSpec, DeviceType, DriverHandle, Endpoint, EndpointDecl, EndpointId, EndpointKind,
    FEATURE_MAP_ATTRIBUTE_ID, Feature, Phase, ROOT_ENDPOINT_ID,
};
pub use value::{AttrType, AttrValue};
