//! Capability tree: endpoints, clusters and attributes of one node.
//!
//! Storage is flat. Endpoints, clusters and attributes each live in their own
//! ordered map keyed by id, `(endpoint, cluster)` and [`AttrPath`]
//! respectively, so removing a dynamic endpoint is a key-range sweep rather
//! than a walk over linked nodes.

use super::value::{AttrType, AttrValue};
use crate::error::{DataModelError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type EndpointId = u16;
pub type ClusterId = u32;
pub type AttributeId = u32;

/// Endpoint reserved for node-level metadata.
pub const ROOT_ENDPOINT_ID: EndpointId = 0;

/// Global attribute carrying a cluster's enabled feature bits.
pub const FEATURE_MAP_ATTRIBUTE_ID: AttributeId = 0xFFFC;

/// Fully qualified attribute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttrPath {
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
}

impl AttrPath {
    pub const fn new(endpoint: EndpointId, cluster: ClusterId, attribute: AttributeId) -> Self {
        Self {
            endpoint,
            cluster,
            attribute,
        }
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/0x{:04X}/0x{:04X}",
            self.endpoint, self.cluster, self.attribute
        )
    }
}

/// Static endpoints live for the whole process; dynamic ones back bridged devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    Static,
    Dynamic,
}

/// Opaque token handed to hooks unchanged. Never interpreted by the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverHandle(pub u64);

/// Matter device type advertised by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: u32,
    pub revision: u16,
}

/// Declaration of an attribute at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub id: AttributeId,
    pub attr_type: AttrType,
    pub nullable: bool,
    pub value: AttrValue,
    /// Used instead of `value` at creation when present and non-null.
    #[serde(default)]
    pub startup_default: Option<AttrValue>,
    /// False for attributes the fabric may only read.
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_writable() -> bool {
    true
}

impl AttributeSpec {
    /// Non-nullable attribute whose type is taken from `value`.
    pub fn new(id: AttributeId, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        Self {
            id,
            attr_type: value.attr_type(),
            nullable: false,
            value,
            startup_default: None,
            writable: true,
        }
    }

    /// Nullable attribute of an explicit type.
    pub fn nullable(id: AttributeId, attr_type: AttrType, value: AttrValue) -> Self {
        Self {
            id,
            attr_type,
            nullable: true,
            value,
            startup_default: None,
            writable: true,
        }
    }

    pub fn with_startup_default(mut self, startup: Option<AttrValue>) -> Self {
        self.startup_default = startup;
        self
    }

    /// Reject writes from the fabric. The node itself can still update it.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    fn initial_value(&self) -> &AttrValue {
        match &self.startup_default {
            Some(v) if !v.is_null() => v,
            _ => &self.value,
        }
    }
}

/// Declaration of a cluster and its initial attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub id: ClusterId,
    pub attributes: Vec<AttributeSpec>,
}

impl ClusterSpec {
    pub fn new(id: ClusterId) -> Self {
        Self {
            id,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn has_attribute(&self, id: AttributeId) -> bool {
        self.attributes.iter().any(|a| a.id == id)
    }
}

/// Optional cluster feature: a feature-map bit plus the attributes it adds.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub bit: u32,
    pub attributes: Vec<AttributeSpec>,
}

/// Endpoint creation parameters.
#[derive(Debug, Clone)]
pub struct EndpointDecl {
    pub kind: EndpointKind,
    pub driver: Option<DriverHandle>,
    pub parent: Option<EndpointId>,
    pub device_types: Vec<DeviceType>,
    /// Honoured only if it is not below the next unused id and not more than
    /// `max_endpoints` above it.
    pub preferred_id: Option<EndpointId>,
}

impl EndpointDecl {
    pub fn new(kind: EndpointKind) -> Self {
        Self {
            kind,
            driver: None,
            parent: None,
            device_types: Vec::new(),
            preferred_id: None,
        }
    }

    pub fn with_driver(mut self, driver: DriverHandle) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_parent(mut self, parent: EndpointId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_types.push(device_type);
        self
    }

    pub fn with_preferred_id(mut self, id: Option<EndpointId>) -> Self {
        self.preferred_id = id;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    id: EndpointId,
    kind: EndpointKind,
    driver: Option<DriverHandle>,
    parent: Option<EndpointId>,
    device_types: Vec<DeviceType>,
    clusters: Vec<ClusterId>,
}

impl Endpoint {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn driver(&self) -> Option<DriverHandle> {
        self.driver
    }

    pub fn parent(&self) -> Option<EndpointId> {
        self.parent
    }

    pub fn device_types(&self) -> &[DeviceType] {
        &self.device_types
    }

    /// Cluster ids in creation order.
    pub fn clusters(&self) -> &[ClusterId] {
        &self.clusters
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    id: ClusterId,
    attributes: Vec<AttributeId>,
    data_version: u32,
}

impl Cluster {
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Attribute ids in creation order.
    pub fn attributes(&self) -> &[AttributeId] {
        &self.attributes
    }

    /// Incremented on every committed write to any attribute of the cluster.
    pub fn data_version(&self) -> u32 {
        self.data_version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    attr_type: AttrType,
    nullable: bool,
    writable: bool,
    value: AttrValue,
    startup_default: Option<AttrValue>,
}

impl Attribute {
    pub fn attr_type(&self) -> &AttrType {
        &self.attr_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    pub fn startup_default(&self) -> Option<&AttrValue> {
        self.startup_default.as_ref()
    }
}

/// Construction vs steady-state serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Construction,
    Serving,
}

/// In-memory model of all endpoints of a node.
///
/// Owns its own id counter, so independent trees never interfere.
#[derive(Debug)]
pub struct CapabilityTree {
    max_endpoints: usize,
    next_endpoint_id: u32,
    phase: Phase,
    endpoints: BTreeMap<EndpointId, Endpoint>,
    clusters: BTreeMap<(EndpointId, ClusterId), Cluster>,
    attributes: BTreeMap<AttrPath, Attribute>,
}

impl CapabilityTree {
    /// Create a tree holding only the static root endpoint 0.
    ///
    /// `max_endpoints` counts live endpoints, the root included.
    pub fn new(max_endpoints: usize) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            ROOT_ENDPOINT_ID,
            Endpoint {
                id: ROOT_ENDPOINT_ID,
                kind: EndpointKind::Static,
                driver: None,
                parent: None,
                device_types: Vec::new(),
                clusters: Vec::new(),
            },
        );
        Self {
            max_endpoints: max_endpoints.max(1),
            next_endpoint_id: u32::from(ROOT_ENDPOINT_ID) + 1,
            phase: Phase::Construction,
            endpoints,
            clusters: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// End the construction phase. Feature additions fail afterwards.
    pub fn start_serving(&mut self) {
        if self.phase == Phase::Construction {
            info!(
                "[Tree] Construction complete, serving {} endpoint(s)",
                self.endpoints.len()
            );
        }
        self.phase = Phase::Serving;
    }

    pub fn max_endpoints(&self) -> usize {
        self.max_endpoints
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// The id the next endpoint would receive.
    pub fn next_endpoint_id(&self) -> u32 {
        self.next_endpoint_id
    }

    /// A preferred id must be unused and within `max_endpoints` of the
    /// allocation cursor, so one stray id cannot exhaust the id space.
    fn accepts_preferred_id(&self, preferred: EndpointId) -> bool {
        let preferred = u32::from(preferred);
        let window = u32::try_from(self.max_endpoints).unwrap_or(u32::MAX);
        preferred >= self.next_endpoint_id
            && preferred < self.next_endpoint_id.saturating_add(window)
    }

    pub fn create_endpoint(
        &mut self,
        kind: EndpointKind,
        driver: Option<DriverHandle>,
    ) -> Result<EndpointId> {
        let mut decl = EndpointDecl::new(kind);
        decl.driver = driver;
        self.create_endpoint_with(decl)
    }

    /// Allocate a fresh endpoint id and create the endpoint.
    ///
    /// Ids grow monotonically and are never handed out twice, even after the
    /// endpoint holding them is removed.
    pub fn create_endpoint_with(&mut self, decl: EndpointDecl) -> Result<EndpointId> {
        if self.endpoints.len() >= self.max_endpoints {
            return Err(DataModelError::CapacityExceeded);
        }

        let id = match decl.preferred_id {
            Some(preferred) if self.accepts_preferred_id(preferred) => preferred,
            _ => EndpointId::try_from(self.next_endpoint_id)
                .map_err(|_| DataModelError::CapacityExceeded)?,
        };
        if let Some(parent) = decl.parent
            && !self.endpoints.contains_key(&parent)
        {
            return Err(DataModelError::UnknownEndpoint(parent));
        }

        self.next_endpoint_id = u32::from(id) + 1;
        self.endpoints.insert(
            id,
            Endpoint {
                id,
                kind: decl.kind,
                driver: decl.driver,
                parent: decl.parent,
                device_types: decl.device_types,
                clusters: Vec::new(),
            },
        );
        debug!("[Tree] Created {:?} endpoint {}", decl.kind, id);
        Ok(id)
    }

    /// Attach a device type to an existing endpoint (root node metadata etc.).
    pub fn add_device_type(&mut self, endpoint: EndpointId, device_type: DeviceType) -> Result<()> {
        let ep = self
            .endpoints
            .get_mut(&endpoint)
            .ok_or(DataModelError::UnknownEndpoint(endpoint))?;
        if !ep.device_types.contains(&device_type) {
            ep.device_types.push(device_type);
        }
        Ok(())
    }

    pub fn add_cluster(&mut self, endpoint: EndpointId, spec: ClusterSpec) -> Result<()> {
        if !self.endpoints.contains_key(&endpoint) {
            return Err(DataModelError::UnknownEndpoint(endpoint));
        }
        if self.clusters.contains_key(&(endpoint, spec.id)) {
            return Err(DataModelError::DuplicateCluster {
                endpoint,
                cluster: spec.id,
            });
        }
        Self::validate_specs(endpoint, spec.id, &[], &spec.attributes)?;

        let mut cluster = Cluster {
            id: spec.id,
            attributes: Vec::with_capacity(spec.attributes.len()),
            data_version: 0,
        };
        for attr in spec.attributes {
            cluster.attributes.push(attr.id);
            self.insert_attribute(AttrPath::new(endpoint, spec.id, attr.id), attr);
        }
        self.clusters.insert((endpoint, spec.id), cluster);
        if let Some(ep) = self.endpoints.get_mut(&endpoint) {
            ep.clusters.push(spec.id);
        }
        debug!("[Tree] Added cluster 0x{:04X} to endpoint {}", spec.id, endpoint);
        Ok(())
    }

    /// Append a feature's attributes to an existing cluster.
    ///
    /// Only allowed during construction. Sets the feature bit in the cluster's
    /// FeatureMap attribute when the cluster has one.
    pub fn add_feature(
        &mut self,
        endpoint: EndpointId,
        cluster: ClusterId,
        feature: Feature,
    ) -> Result<()> {
        if self.phase != Phase::Construction {
            return Err(DataModelError::InvalidPhase);
        }
        if !self.endpoints.contains_key(&endpoint) {
            return Err(DataModelError::UnknownEndpoint(endpoint));
        }
        let existing = self
            .clusters
            .get(&(endpoint, cluster))
            .ok_or(DataModelError::UnknownCluster { endpoint, cluster })?
            .attributes
            .clone();
        Self::validate_specs(endpoint, cluster, &existing, &feature.attributes)?;

        let mut added = Vec::with_capacity(feature.attributes.len());
        for attr in feature.attributes {
            added.push(attr.id);
            self.insert_attribute(AttrPath::new(endpoint, cluster, attr.id), attr);
        }
        if let Some(c) = self.clusters.get_mut(&(endpoint, cluster)) {
            c.attributes.extend(added);
        }

        let feature_map = AttrPath::new(endpoint, cluster, FEATURE_MAP_ATTRIBUTE_ID);
        if let Some(attr) = self.attributes.get_mut(&feature_map)
            && let AttrValue::Bitmap32(bits) = attr.value
        {
            attr.value = AttrValue::Bitmap32(bits | feature.bit);
        }
        debug!(
            "[Tree] Added feature 0x{:X} to cluster 0x{:04X} on endpoint {}",
            feature.bit, cluster, endpoint
        );
        Ok(())
    }

    /// Remove a dynamic endpoint together with all its clusters and attributes.
    pub fn remove_endpoint(&mut self, endpoint: EndpointId) -> Result<()> {
        let ep = self
            .endpoints
            .get(&endpoint)
            .ok_or(DataModelError::UnknownEndpoint(endpoint))?;
        if ep.kind != EndpointKind::Dynamic {
            return Err(DataModelError::StaticEndpointImmutable(endpoint));
        }

        self.endpoints.remove(&endpoint);
        let cluster_keys: Vec<_> = self
            .clusters
            .range((endpoint, 0)..=(endpoint, ClusterId::MAX))
            .map(|(k, _)| *k)
            .collect();
        for key in &cluster_keys {
            self.clusters.remove(key);
        }
        let attr_keys: Vec<_> = self
            .attributes
            .range(
                AttrPath::new(endpoint, 0, 0)
                    ..=AttrPath::new(endpoint, ClusterId::MAX, AttributeId::MAX),
            )
            .map(|(k, _)| *k)
            .collect();
        for key in &attr_keys {
            self.attributes.remove(key);
        }

        info!(
            "[Tree] Removed endpoint {} ({} cluster(s), {} attribute(s))",
            endpoint,
            cluster_keys.len(),
            attr_keys.len()
        );
        Ok(())
    }

    pub fn resolve(&self, path: AttrPath) -> Result<&Attribute> {
        self.attributes
            .get(&path)
            .ok_or(DataModelError::NotFound(path))
    }

    /// Resolve `path` and check that `value` fits the attribute's declared type.
    pub fn check_value(&self, path: AttrPath, value: &AttrValue) -> Result<&Attribute> {
        let attr = self.resolve(path)?;
        if !value.conforms_to(&attr.attr_type, attr.nullable) {
            return Err(DataModelError::TypeMismatch {
                path,
                expected: attr.attr_type.clone(),
                actual: value.attr_type(),
            });
        }
        Ok(attr)
    }

    /// Check a write coming from the fabric: type as in [`Self::check_value`],
    /// and the attribute must be writable.
    pub fn check_write(&self, path: AttrPath, value: &AttrValue) -> Result<&Attribute> {
        let attr = self.check_value(path, value)?;
        if !attr.writable {
            return Err(DataModelError::UnsupportedWrite(path));
        }
        Ok(attr)
    }

    /// Replace a stored value. Type checked but not writability checked;
    /// bumps the cluster data version.
    pub(crate) fn commit(&mut self, path: AttrPath, value: AttrValue) -> Result<()> {
        self.check_value(path, &value)?;
        if let Some(attr) = self.attributes.get_mut(&path) {
            attr.value = value;
        }
        if let Some(cluster) = self.clusters.get_mut(&(path.endpoint, path.cluster)) {
            cluster.data_version = cluster.data_version.wrapping_add(1);
        }
        Ok(())
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn cluster(&self, endpoint: EndpointId, cluster: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&(endpoint, cluster))
    }

    /// All clusters of an endpoint, ordered by cluster id.
    pub fn clusters_of(&self, endpoint: EndpointId) -> impl Iterator<Item = &Cluster> {
        self.clusters
            .range((endpoint, 0)..=(endpoint, ClusterId::MAX))
            .map(|(_, c)| c)
    }

    fn insert_attribute(&mut self, path: AttrPath, spec: AttributeSpec) {
        let value = spec.initial_value().clone();
        self.attributes.insert(
            path,
            Attribute {
                attr_type: spec.attr_type,
                nullable: spec.nullable,
                writable: spec.writable,
                value,
                startup_default: spec.startup_default,
            },
        );
    }

    fn validate_specs(
        endpoint: EndpointId,
        cluster: ClusterId,
        existing: &[AttributeId],
        specs: &[AttributeSpec],
    ) -> Result<()> {
        let mut seen: Vec<AttributeId> = existing.to_vec();
        for spec in specs {
            if seen.contains(&spec.id) {
                return Err(DataModelError::DuplicateAttribute {
                    endpoint,
                    cluster,
                    attribute: spec.id,
                });
            }
            seen.push(spec.id);

            let path = AttrPath::new(endpoint, cluster, spec.id);
            // A null startup default means "none".
            let candidates = std::iter::once(&spec.value)
                .chain(spec.startup_default.iter().filter(|v| !v.is_null()));
            for candidate in candidates {
                if spec.attr_type == AttrType::Null
                    || !candidate.conforms_to(&spec.attr_type, spec.nullable)
                {
                    return Err(DataModelError::TypeMismatch {
                        path,
                        expected: spec.attr_type.clone(),
                        actual: candidate.attr_type(),
                    });
                }
            }
        }
        Ok(())
    }
}
