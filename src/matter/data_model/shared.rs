//! Thread-safe wrapper around the capability tree.
//!
//! Two locks:
//! - `mutation`: a re-entrant mutex serializing every structural change and
//!   every attribute commit. Dispatch holds it across pre-hook, commit and
//!   post-hook so a hook may itself dispatch on the same thread.
//! - `tree`: a read/write lock. Writers hold it only for the instant of a
//!   change, so readers never observe a half-applied mutation.

use super::tree::{
    AttrPath, Attribute, CapabilityTree, ClusterId, ClusterSpec, DriverHandle, EndpointDecl,
    EndpointId, EndpointKind, Feature,
};
use super::value::AttrValue;
use crate::error::Result;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

pub struct DataModel {
    mutation: ReentrantMutex<()>,
    tree: RwLock<CapabilityTree>,
}

impl DataModel {
    pub fn new(tree: CapabilityTree) -> Self {
        Self {
            mutation: ReentrantMutex::new(()),
            tree: RwLock::new(tree),
        }
    }

    pub fn with_capacity(max_endpoints: usize) -> Self {
        Self::new(CapabilityTree::new(max_endpoints))
    }

    /// Take the mutation lock. Re-entrant on the owning thread.
    pub fn lock_mutations(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutation.lock()
    }

    /// Run `f` against a consistent view of the tree.
    ///
    /// Must not call back into a mutating method of this model.
    pub fn read<R>(&self, f: impl FnOnce(&CapabilityTree) -> R) -> R {
        f(&self.tree.read())
    }

    /// Run `f` with exclusive access, serialized with all other mutations.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut CapabilityTree) -> R) -> R {
        let _guard = self.mutation.lock();
        f(&mut self.tree.write())
    }

    pub fn create_endpoint(
        &self,
        kind: EndpointKind,
        driver: Option<DriverHandle>,
    ) -> Result<EndpointId> {
        self.mutate(|tree| tree.create_endpoint(kind, driver))
    }

    pub fn create_endpoint_with(&self, decl: EndpointDecl) -> Result<EndpointId> {
        self.mutate(|tree| tree.create_endpoint_with(decl))
    }

    pub fn add_cluster(&self, endpoint: EndpointId, spec: ClusterSpec) -> Result<()> {
        self.mutate(|tree| tree.add_cluster(endpoint, spec))
    }

    pub fn add_feature(&self, endpoint: EndpointId, cluster: ClusterId, feature: Feature) -> Result<()> {
        self.mutate(|tree| tree.add_feature(endpoint, cluster, feature))
    }

    pub fn remove_endpoint(&self, endpoint: EndpointId) -> Result<()> {
        self.mutate(|tree| tree.remove_endpoint(endpoint))
    }

    pub fn start_serving(&self) {
        self.mutate(|tree| tree.start_serving());
    }

    /// Snapshot of the attribute at `path`.
    pub fn resolve(&self, path: AttrPath) -> Result<Attribute> {
        self.read(|tree| tree.resolve(path).cloned())
    }

    /// Current committed value at `path`.
    pub fn read_attribute(&self, path: AttrPath) -> Result<AttrValue> {
        self.read(|tree| tree.resolve(path).map(|a| a.value().clone()))
    }

    /// Store a value without running hooks. For bridge-maintained and
    /// driver-derived attributes only.
    pub(crate) fn commit(&self, path: AttrPath, value: AttrValue) -> Result<()> {
        self.mutate(|tree| tree.commit(path, value))
    }
}
