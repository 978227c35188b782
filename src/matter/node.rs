//! The light node: one capability tree with its dispatcher, lifecycle tracker
//! and (optionally) the radio bridge registry.

use super::data_model::{
    AttrPath, AttrValue, Attribute, AttributeId, ClusterId, DataModel, EndpointId, Phase,
};
use super::dispatch::AttributeDispatcher;
use super::endpoints::IdentifyRequest;
use super::lifecycle::{LifecycleEvent, LifecycleTracker};
use crate::bridge::{BridgeRegistry, RemoteLink};
use crate::error::Result;
use log::info;
use std::sync::Arc;

pub struct Node {
    model: Arc<DataModel>,
    dispatcher: Arc<AttributeDispatcher>,
    lifecycle: Arc<LifecycleTracker>,
    bridge: Option<Arc<BridgeRegistry>>,
}

impl Node {
    pub fn new(max_endpoints: usize) -> Self {
        let model = Arc::new(DataModel::with_capacity(max_endpoints));
        Self {
            dispatcher: Arc::new(AttributeDispatcher::new(model.clone())),
            model,
            lifecycle: Arc::new(LifecycleTracker::new()),
            bridge: None,
        }
    }

    pub fn model(&self) -> &Arc<DataModel> {
        &self.model
    }

    pub fn dispatcher(&self) -> &Arc<AttributeDispatcher> {
        &self.dispatcher
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleTracker> {
        &self.lifecycle
    }

    pub fn bridge(&self) -> Option<&Arc<BridgeRegistry>> {
        self.bridge.as_ref()
    }

    /// Registry wired to this node's dispatcher, ready for further setup
    /// before [`Node::attach_bridge`].
    pub fn new_bridge(&self, link: Arc<dyn RemoteLink>) -> BridgeRegistry {
        BridgeRegistry::new(self.dispatcher.clone(), link)
    }

    pub fn attach_bridge(&mut self, registry: BridgeRegistry) -> Arc<BridgeRegistry> {
        let registry = Arc::new(registry);
        self.bridge = Some(registry.clone());
        registry
    }

    /// End construction. Features can no longer be added afterwards.
    pub fn start(&self) {
        self.model.start_serving();
        let count = self.model.read(|tree| tree.endpoint_count());
        info!("[Node] Serving with {} endpoint(s)", count);
    }

    pub fn phase(&self) -> Phase {
        self.model.read(|tree| tree.phase())
    }

    pub fn dispatch_write(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
        value: AttrValue,
    ) -> Result<()> {
        self.dispatcher
            .dispatch_write(endpoint, cluster, attribute, value)
    }

    /// Identify cluster request for `endpoint`.
    pub fn identify(&self, endpoint: EndpointId, request: IdentifyRequest) -> Result<()> {
        self.dispatcher.identify(endpoint, request)
    }

    pub fn resolve(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
    ) -> Result<Attribute> {
        self.model
            .resolve(AttrPath::new(endpoint, cluster, attribute))
    }

    pub fn on_event(&self, event: LifecycleEvent) {
        self.lifecycle.on_event(event);
    }
}
