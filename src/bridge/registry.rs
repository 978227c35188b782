//! Bridge registry: remote devices reported by the radio bridge, each exposed
//! as a dynamic endpoint of this node.
//!
//! A join creates the endpoint, fills it with the declared clusters and
//! installs a [`RemoteForwarder`] as its hooks, so every write addressed to it
//! is validated locally and then handed to the radio link. A leave tears the
//! whole subtree down again.

use super::link::{RemoteForwarder, RemoteId, RemoteLink};
use super::persistence::{BridgeStore, PersistedDevice};
use crate::error::{DataModelError, HookPhase, Result};
use crate::matter::clusters::bridged_device_basic_info;
use crate::matter::data_model::{
    AttrPath, AttrValue, AttributeId, ClusterId, ClusterSpec, EndpointDecl, EndpointId,
    EndpointKind,
};
use crate::matter::device_types::DEV_TYPE_BRIDGED_NODE;
use crate::matter::dispatch::AttributeDispatcher;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One bridged device and the endpoint standing in for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeEntry {
    pub remote_id: RemoteId,
    pub endpoint_id: EndpointId,
    pub label: Option<String>,
    /// Clusters as declared by the remote, without the ones added locally.
    pub capabilities: Vec<ClusterSpec>,
    pub joined_at: DateTime<Utc>,
}

impl BridgeEntry {
    fn to_persisted(&self) -> PersistedDevice {
        PersistedDevice {
            remote_id: self.remote_id.clone(),
            endpoint_id: Some(self.endpoint_id),
            label: self.label.clone(),
            capabilities: self.capabilities.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// Outcome of replaying persisted devices at startup.
#[derive(Debug, Default)]
pub struct ResumeReport {
    pub restored: Vec<(RemoteId, EndpointId)>,
    /// Devices whose persisted endpoint id could not be kept.
    pub renumbered: Vec<(RemoteId, EndpointId)>,
    pub failed: Vec<(RemoteId, DataModelError)>,
}

#[derive(Default)]
struct Entries {
    by_remote: BTreeMap<RemoteId, BridgeEntry>,
    by_endpoint: BTreeMap<EndpointId, RemoteId>,
}

pub struct BridgeRegistry {
    dispatcher: Arc<AttributeDispatcher>,
    link: Arc<dyn RemoteLink>,
    /// Aggregator endpoint bridged endpoints are attached to.
    parent: Option<EndpointId>,
    entries: RwLock<Entries>,
    store: Option<Arc<BridgeStore>>,
}

impl BridgeRegistry {
    pub fn new(dispatcher: Arc<AttributeDispatcher>, link: Arc<dyn RemoteLink>) -> Self {
        Self {
            dispatcher,
            link,
            parent: None,
            entries: RwLock::new(Entries::default()),
            store: None,
        }
    }

    pub fn with_parent(mut self, aggregator: EndpointId) -> Self {
        self.parent = Some(aggregator);
        self
    }

    /// Persist every join and leave to `store`.
    pub fn with_store(mut self, store: Arc<BridgeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn on_device_joined(
        &self,
        remote_id: RemoteId,
        capabilities: Vec<ClusterSpec>,
    ) -> Result<EndpointId> {
        self.on_device_joined_labeled(remote_id, None, capabilities)
    }

    /// Bridge a newly discovered remote device under a user-visible label.
    pub fn on_device_joined_labeled(
        &self,
        remote_id: RemoteId,
        label: Option<String>,
        capabilities: Vec<ClusterSpec>,
    ) -> Result<EndpointId> {
        // Held through the store update so a concurrent leave cannot slip in
        // between and leave a stale record behind.
        let _guard = self.dispatcher.model().lock_mutations();
        let entry = self.attach(remote_id, label, capabilities, None, Utc::now())?;
        info!(
            "[Bridge] Remote {} joined as endpoint {}",
            entry.remote_id, entry.endpoint_id
        );
        if let Some(store) = &self.store {
            store.upsert(entry.to_persisted());
        }
        Ok(entry.endpoint_id)
    }

    /// Drop a remote device and destroy its endpoint.
    ///
    /// Fails with `UnknownRemote` when the device is not bridged, so a second
    /// call for the same id is harmless.
    pub fn on_device_left(&self, remote_id: &RemoteId) -> Result<()> {
        let model = self.dispatcher.model();
        let _guard = model.lock_mutations();

        let endpoint = {
            let entries = self.entries.read();
            entries
                .by_remote
                .get(remote_id)
                .map(|e| e.endpoint_id)
                .ok_or_else(|| DataModelError::UnknownRemote(remote_id.to_string()))?
        };

        self.dispatcher.unregister_hooks(endpoint);
        if let Err(e) = model.remove_endpoint(endpoint) {
            // Entry is dropped regardless so the remote can rejoin cleanly.
            warn!(
                "[Bridge] Endpoint {} of remote {} already gone: {}",
                endpoint, remote_id, e
            );
        }
        {
            let mut entries = self.entries.write();
            entries.by_remote.remove(remote_id);
            entries.by_endpoint.remove(&endpoint);
        }
        info!("[Bridge] Remote {} left, endpoint {} removed", remote_id, endpoint);

        if let Some(store) = &self.store {
            store.remove(remote_id);
        }
        Ok(())
    }

    /// Write an attribute of a bridged endpoint.
    ///
    /// Path and type are checked against the local tree, then the value goes
    /// to the radio link instead of any hooks registered for the endpoint, and
    /// is stored once the link accepted it. Endpoints that are not bridged
    /// take the regular dispatch path.
    pub fn route_write(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
        value: AttrValue,
    ) -> Result<()> {
        let path = AttrPath::new(endpoint, cluster, attribute);
        let model = self.dispatcher.model();
        let _guard = model.lock_mutations();

        let Some(remote) = self.remote_for(endpoint) else {
            debug!("[Bridge] Endpoint {} is not bridged, dispatching locally", endpoint);
            return self.dispatcher.write(path, value);
        };

        if let Err(e) = model.read(|tree| tree.check_write(path, &value).map(|_| ())) {
            warn!("[Bridge] Rejected write to {}: {}", path, e);
            return Err(e);
        }
        debug!("[Bridge] Routing {} to remote {}", path, remote);
        if let Err(e) = self.link.send_write(&remote, path, &value) {
            warn!("[Bridge] Remote {} refused {} = {}: {}", remote, path, value, e);
            return Err(DataModelError::HookRejected {
                phase: HookPhase::Pre,
                reason: e.0,
            });
        }
        model.commit(path, value)
    }

    /// Recreate previously bridged devices in the order given.
    ///
    /// A persisted endpoint id is reused when it has not been handed out yet
    /// in this process; otherwise the device gets a fresh id. A device that
    /// cannot be restored is reported and skipped.
    pub fn resume(&self, devices: Vec<PersistedDevice>) -> ResumeReport {
        let _guard = self.dispatcher.model().lock_mutations();
        let mut report = ResumeReport::default();

        for device in devices {
            let remote_id = device.remote_id.clone();
            match self.attach(
                device.remote_id,
                device.label,
                device.capabilities,
                device.endpoint_id,
                device.joined_at,
            ) {
                Ok(entry) => {
                    if let Some(previous) = device.endpoint_id
                        && previous != entry.endpoint_id
                    {
                        warn!(
                            "[Bridge] Remote {} moved from endpoint {} to {}",
                            remote_id, previous, entry.endpoint_id
                        );
                        report.renumbered.push((remote_id.clone(), entry.endpoint_id));
                    }
                    report.restored.push((remote_id, entry.endpoint_id));
                }
                Err(e) => {
                    error!("[Bridge] Failed to restore remote {}: {}", remote_id, e);
                    report.failed.push((remote_id, e));
                }
            }
        }

        info!(
            "[Bridge] Resumed {} bridged device(s), {} failed",
            report.restored.len(),
            report.failed.len()
        );
        if let Some(store) = &self.store {
            store.replace_all(self.entries().iter().map(BridgeEntry::to_persisted).collect());
        }
        report
    }

    /// Update the Reachable attribute of a bridged device.
    pub fn set_reachable(&self, remote_id: &RemoteId, reachable: bool) -> Result<()> {
        let endpoint = self
            .endpoint_for(remote_id)
            .ok_or_else(|| DataModelError::UnknownRemote(remote_id.to_string()))?;
        self.dispatcher.model().commit(
            AttrPath::new(
                endpoint,
                bridged_device_basic_info::ID,
                bridged_device_basic_info::attributes::REACHABLE,
            ),
            AttrValue::Bool(reachable),
        )?;
        info!(
            "[Bridge] Remote {} is {}",
            remote_id,
            if reachable { "reachable" } else { "unreachable" }
        );
        Ok(())
    }

    pub fn endpoint_for(&self, remote_id: &RemoteId) -> Option<EndpointId> {
        self.entries
            .read()
            .by_remote
            .get(remote_id)
            .map(|e| e.endpoint_id)
    }

    pub fn remote_for(&self, endpoint: EndpointId) -> Option<RemoteId> {
        self.entries.read().by_endpoint.get(&endpoint).cloned()
    }

    /// All entries, ordered by endpoint id.
    pub fn entries(&self) -> Vec<BridgeEntry> {
        let entries = self.entries.read();
        entries
            .by_endpoint
            .values()
            .filter_map(|remote| entries.by_remote.get(remote).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().by_remote.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create and populate the endpoint for one remote, all or nothing.
    fn attach(
        &self,
        remote_id: RemoteId,
        label: Option<String>,
        capabilities: Vec<ClusterSpec>,
        preferred_id: Option<EndpointId>,
        joined_at: DateTime<Utc>,
    ) -> Result<BridgeEntry> {
        let model = self.dispatcher.model();
        let _guard = model.lock_mutations();

        if self.entries.read().by_remote.contains_key(&remote_id) {
            warn!("[Bridge] Remote {} is already bridged", remote_id);
            return Err(DataModelError::DuplicateRemote(remote_id.to_string()));
        }

        let mut decl = EndpointDecl::new(EndpointKind::Dynamic)
            .with_device_type(DEV_TYPE_BRIDGED_NODE)
            .with_preferred_id(preferred_id);
        if let Some(parent) = self.parent {
            decl = decl.with_parent(parent);
        }
        let endpoint_id = model.create_endpoint_with(decl)?;

        let mut clusters = capabilities.clone();
        if !clusters.iter().any(|c| c.id == bridged_device_basic_info::ID) {
            let node_label = label.as_deref().unwrap_or(remote_id.as_str());
            clusters.push(bridged_device_basic_info::cluster(node_label));
        }
        for spec in clusters {
            let cluster = spec.id;
            if let Err(e) = model.add_cluster(endpoint_id, spec) {
                warn!(
                    "[Bridge] Remote {} declared bad cluster 0x{:04X}: {}",
                    remote_id, cluster, e
                );
                if let Err(e) = model.remove_endpoint(endpoint_id) {
                    error!("[Bridge] Rollback of endpoint {} failed: {}", endpoint_id, e);
                }
                return Err(e);
            }
        }

        self.dispatcher.register_hooks(
            endpoint_id,
            Arc::new(RemoteForwarder::new(remote_id.clone(), self.link.clone())),
        );

        let entry = BridgeEntry {
            remote_id: remote_id.clone(),
            endpoint_id,
            label,
            capabilities,
            joined_at,
        };
        let mut entries = self.entries.write();
        entries.by_endpoint.insert(endpoint_id, remote_id.clone());
        entries.by_remote.insert(remote_id, entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::matter::clusters::{level_control, on_off};
    use crate::matter::data_model::DataModel;
    use crate::matter::endpoints::{AttributeHooks, UpdateContext};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingLink {
        sent: Mutex<Vec<(RemoteId, AttrPath, AttrValue)>>,
        reject: bool,
    }

    impl RemoteLink for RecordingLink {
        fn send_write(
            &self,
            remote: &RemoteId,
            path: AttrPath,
            value: &AttrValue,
        ) -> std::result::Result<(), HookError> {
            if self.reject {
                return Err(HookError::new("radio queue full"));
            }
            self.sent.lock().push((remote.clone(), path, value.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingHooks {
        pre: Mutex<Vec<AttrValue>>,
        post: Mutex<Vec<AttrValue>>,
    }

    impl AttributeHooks for CountingHooks {
        fn pre_update(&self, ctx: &UpdateContext<'_>) -> std::result::Result<(), HookError> {
            self.pre.lock().push(ctx.value.clone());
            Ok(())
        }

        fn post_update(&self, ctx: &UpdateContext<'_>) -> std::result::Result<(), HookError> {
            self.post.lock().push(ctx.value.clone());
            Ok(())
        }
    }

    fn on_off_caps() -> Vec<ClusterSpec> {
        vec![on_off::cluster(&on_off::Config::default())]
    }

    fn setup() -> (Arc<AttributeDispatcher>, Arc<RecordingLink>, BridgeRegistry) {
        let model = Arc::new(DataModel::with_capacity(8));
        let dispatcher = Arc::new(AttributeDispatcher::new(model));
        let link = Arc::new(RecordingLink::default());
        let registry = BridgeRegistry::new(dispatcher.clone(), link.clone());
        (dispatcher, link, registry)
    }

    fn on_off_path(endpoint: EndpointId) -> AttrPath {
        AttrPath::new(endpoint, on_off::ID, on_off::attributes::ON_OFF)
    }

    #[test]
    fn test_join_creates_bridged_endpoint() {
        let (dispatcher, _, registry) = setup();
        let ep = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();

        let model = dispatcher.model();
        model.read(|tree| {
            let endpoint = tree.endpoint(ep).unwrap();
            assert_eq!(endpoint.kind(), EndpointKind::Dynamic);
            assert!(endpoint.device_types().contains(&DEV_TYPE_BRIDGED_NODE));
            assert!(tree.cluster(ep, bridged_device_basic_info::ID).is_some());
        });
        assert_eq!(
            model
                .read_attribute(AttrPath::new(
                    ep,
                    bridged_device_basic_info::ID,
                    bridged_device_basic_info::attributes::NODE_LABEL
                ))
                .unwrap(),
            AttrValue::from("remoteA")
        );
        assert_eq!(registry.endpoint_for(&RemoteId::from("remoteA")), Some(ep));
        assert_eq!(registry.remote_for(ep), Some(RemoteId::from("remoteA")));
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let (dispatcher, _, registry) = setup();
        registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();
        let before = dispatcher.model().read(|tree| tree.endpoint_count());

        let err = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap_err();
        assert_eq!(err, DataModelError::DuplicateRemote("remoteA".into()));
        assert_eq!(dispatcher.model().read(|tree| tree.endpoint_count()), before);
    }

    #[test]
    fn test_join_propagates_capacity_exceeded() {
        let model = Arc::new(DataModel::with_capacity(2));
        let dispatcher = Arc::new(AttributeDispatcher::new(model));
        let registry = BridgeRegistry::new(dispatcher, Arc::new(RecordingLink::default()));

        registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        assert_eq!(
            registry
                .on_device_joined(RemoteId::from("b"), on_off_caps())
                .unwrap_err(),
            DataModelError::CapacityExceeded
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bad_capabilities_roll_back() {
        let (dispatcher, _, registry) = setup();
        let cluster = on_off::cluster(&on_off::Config::default());
        let caps = vec![cluster.clone(), cluster];
        let err = registry
            .on_device_joined(RemoteId::from("remoteA"), caps)
            .unwrap_err();
        assert!(matches!(err, DataModelError::DuplicateCluster { .. }));
        assert!(registry.is_empty());
        // Only the root endpoint is left.
        assert_eq!(dispatcher.model().read(|tree| tree.endpoint_count()), 1);
    }

    #[test]
    fn test_route_write_forwards_to_link() {
        let (dispatcher, link, registry) = setup();
        let ep = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();

        registry
            .route_write(ep, on_off::ID, on_off::attributes::ON_OFF, true.into())
            .unwrap();

        let sent = link.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RemoteId::from("remoteA"));
        assert_eq!(sent[0].1, on_off_path(ep));
        assert_eq!(sent[0].2, AttrValue::Bool(true));
        assert_eq!(
            dispatcher.model().read_attribute(on_off_path(ep)).unwrap(),
            AttrValue::Bool(true)
        );
    }

    #[test]
    fn test_route_write_type_checked_before_forwarding() {
        let (_, link, registry) = setup();
        let ep = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();

        let err = registry
            .route_write(ep, on_off::ID, on_off::attributes::ON_OFF, 7u8.into())
            .unwrap_err();
        assert!(matches!(err, DataModelError::TypeMismatch { .. }));
        let err = registry
            .route_write(ep, level_control::ID, 0, 7u8.into())
            .unwrap_err();
        assert!(matches!(err, DataModelError::NotFound(_)));
        assert!(link.sent.lock().is_empty());
    }

    #[test]
    fn test_link_failure_vetoes_write() {
        let model = Arc::new(DataModel::with_capacity(8));
        let dispatcher = Arc::new(AttributeDispatcher::new(model.clone()));
        let link = Arc::new(RecordingLink {
            reject: true,
            ..Default::default()
        });
        let registry = BridgeRegistry::new(dispatcher, link);
        let ep = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();

        let err = registry
            .route_write(ep, on_off::ID, on_off::attributes::ON_OFF, true.into())
            .unwrap_err();
        assert_eq!(
            err,
            DataModelError::HookRejected {
                phase: HookPhase::Pre,
                reason: "radio queue full".into()
            }
        );
        assert_eq!(
            model.read_attribute(on_off_path(ep)).unwrap(),
            AttrValue::Bool(false)
        );
    }

    #[test]
    fn test_device_left_is_idempotent() {
        let (dispatcher, _, registry) = setup();
        let a = registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        let b = registry
            .on_device_joined(RemoteId::from("b"), on_off_caps())
            .unwrap();

        registry.on_device_left(&RemoteId::from("a")).unwrap();
        assert_eq!(
            registry.on_device_left(&RemoteId::from("a")).unwrap_err(),
            DataModelError::UnknownRemote("a".into())
        );

        assert!(dispatcher.model().read(|tree| tree.endpoint(a).is_none()));
        assert_eq!(registry.endpoint_for(&RemoteId::from("b")), Some(b));
        assert!(dispatcher.model().read_attribute(on_off_path(b)).is_ok());
    }

    #[test]
    fn test_rejoin_gets_fresh_endpoint() {
        let (_, _, registry) = setup();
        let first = registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        registry.on_device_left(&RemoteId::from("a")).unwrap();
        let second = registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_bridged_endpoints_hang_off_aggregator() {
        let model = Arc::new(DataModel::with_capacity(8));
        let aggregator = crate::matter::endpoints::aggregator::create(&model).unwrap();
        let dispatcher = Arc::new(AttributeDispatcher::new(model.clone()));
        let registry = BridgeRegistry::new(dispatcher, Arc::new(RecordingLink::default()))
            .with_parent(aggregator);

        let ep = registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        assert_eq!(
            model.read(|tree| tree.endpoint(ep).and_then(|e| e.parent())),
            Some(aggregator)
        );
    }

    #[test]
    fn test_set_reachable() {
        let (dispatcher, _, registry) = setup();
        let ep = registry
            .on_device_joined(RemoteId::from("a"), on_off_caps())
            .unwrap();
        let path = AttrPath::new(
            ep,
            bridged_device_basic_info::ID,
            bridged_device_basic_info::attributes::REACHABLE,
        );

        registry.set_reachable(&RemoteId::from("a"), false).unwrap();
        assert_eq!(
            dispatcher.model().read_attribute(path).unwrap(),
            AttrValue::Bool(false)
        );
        assert_eq!(
            registry
                .set_reachable(&RemoteId::from("ghost"), true)
                .unwrap_err(),
            DataModelError::UnknownRemote("ghost".into())
        );
    }

    #[test]
    fn test_resume_keeps_endpoint_ids() {
        let persisted = |id: &str, ep: EndpointId| PersistedDevice {
            remote_id: RemoteId::from(id),
            endpoint_id: Some(ep),
            label: None,
            capabilities: on_off_caps(),
            joined_at: Utc::now(),
        };
        let (_, _, registry) = setup();

        let report = registry.resume(vec![persisted("a", 4), persisted("b", 6)]);
        assert!(report.failed.is_empty());
        assert!(report.renumbered.is_empty());
        assert_eq!(registry.endpoint_for(&RemoteId::from("a")), Some(4));
        assert_eq!(registry.endpoint_for(&RemoteId::from("b")), Some(6));

        // Ids below the allocation cursor are not reused.
        let report = registry.resume(vec![persisted("c", 5)]);
        assert_eq!(report.renumbered, vec![(RemoteId::from("c"), 7)]);
    }

    #[test]
    fn test_resume_renumbers_out_of_range_id() {
        let (_, _, registry) = setup();
        let report = registry.resume(vec![PersistedDevice {
            remote_id: RemoteId::from("far"),
            endpoint_id: Some(EndpointId::MAX),
            label: None,
            capabilities: on_off_caps(),
            joined_at: Utc::now(),
        }]);
        assert_eq!(report.renumbered, vec![(RemoteId::from("far"), 1)]);

        // The cursor did not jump past the id range, later joins still work.
        assert_eq!(
            registry
                .on_device_joined(RemoteId::from("next"), on_off_caps())
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_route_write_bypasses_local_hooks() {
        let (dispatcher, link, registry) = setup();
        let ep = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();
        let hooks = Arc::new(CountingHooks::default());
        dispatcher.register_hooks(ep, hooks.clone());

        registry
            .route_write(ep, on_off::ID, on_off::attributes::ON_OFF, true.into())
            .unwrap();

        assert_eq!(link.sent.lock().len(), 1);
        assert!(hooks.pre.lock().is_empty());
        assert!(hooks.post.lock().is_empty());
        assert_eq!(
            dispatcher.model().read_attribute(on_off_path(ep)).unwrap(),
            AttrValue::Bool(true)
        );
    }

    #[test]
    fn test_concurrent_join_and_leave_keep_store_consistent() {
        let path = std::env::temp_dir().join(format!(
            "bridge-light-node-test-{}-registry-race.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = Arc::new(BridgeStore::new(path.clone()));
        let model = Arc::new(DataModel::with_capacity(256));
        let dispatcher = Arc::new(AttributeDispatcher::new(model));
        let registry = Arc::new(
            BridgeRegistry::new(dispatcher, Arc::new(RecordingLink::default()))
                .with_store(store.clone()),
        );
        let remote = RemoteId::from("flappy");

        let joiner = {
            let registry = registry.clone();
            let remote = remote.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let _ = registry.on_device_joined(remote.clone(), on_off_caps());
                }
            })
        };
        let leaver = {
            let registry = registry.clone();
            let remote = remote.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let _ = registry.on_device_left(&remote);
                }
            })
        };
        joiner.join().unwrap();
        leaver.join().unwrap();

        let stored: Vec<_> = store.get_all().into_iter().map(|d| d.endpoint_id).collect();
        match registry.endpoint_for(&remote) {
            Some(ep) => assert_eq!(stored, vec![Some(ep)]),
            None => assert!(stored.is_empty()),
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_resume_skips_failures() {
        let (_, _, registry) = setup();
        let good = PersistedDevice {
            remote_id: RemoteId::from("good"),
            endpoint_id: None,
            label: Some("Kitchen".into()),
            capabilities: on_off_caps(),
            joined_at: Utc::now(),
        };
        let duplicate = PersistedDevice {
            remote_id: RemoteId::from("good"),
            ..good.clone()
        };

        let report = registry.resume(vec![good, duplicate]);
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(registry.entries()[0].label.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_join_leave_scenario() {
        let (dispatcher, link, registry) = setup();
        let model = dispatcher.model().clone();

        let light = model.create_endpoint(EndpointKind::Static, None).unwrap();
        assert_eq!(light, 1);
        model
            .add_cluster(light, on_off::cluster(&on_off::Config::default()))
            .unwrap();
        let hooks = Arc::new(CountingHooks::default());
        dispatcher.register_hooks(light, hooks.clone());

        dispatcher
            .dispatch_write(light, on_off::ID, on_off::attributes::ON_OFF, true.into())
            .unwrap();
        assert_eq!(
            model.read_attribute(on_off_path(light)).unwrap(),
            AttrValue::Bool(true)
        );
        assert_eq!(*hooks.post.lock(), vec![AttrValue::Bool(true)]);

        let remote = registry
            .on_device_joined(RemoteId::from("remoteA"), on_off_caps())
            .unwrap();
        assert_eq!(remote, 2);
        registry
            .route_write(remote, on_off::ID, on_off::attributes::ON_OFF, true.into())
            .unwrap();
        assert_eq!(link.sent.lock().len(), 1);
        assert_eq!(hooks.pre.lock().len(), 1);

        registry.on_device_left(&RemoteId::from("remoteA")).unwrap();
        assert_eq!(
            dispatcher
                .dispatch_write(remote, on_off::ID, on_off::attributes::ON_OFF, false.into())
                .unwrap_err(),
            DataModelError::NotFound(on_off_path(remote))
        );
    }
}
