//! Attribute write dispatch.
//!
//! A write goes through, in order: path resolution, type check, the owning
//! endpoint's pre-update hook, commit, post-update hook. Everything up to and
//! including the commit is all-or-nothing; a post-update failure is reported
//! without undoing the commit.

use crate::error::{DataModelError, HookPhase, Result};
use crate::matter::clusters::identify;
use crate::matter::data_model::{
    AttrPath, AttrValue, AttributeId, ClusterId, DataModel, EndpointId,
};
use crate::matter::endpoints::handler::{AttributeHooks, IdentifyRequest, UpdateContext};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AttributeDispatcher {
    model: Arc<DataModel>,
    endpoint_hooks: RwLock<HashMap<EndpointId, Arc<dyn AttributeHooks>>>,
    /// Fallback for endpoints without their own hooks.
    node_hooks: RwLock<Option<Arc<dyn AttributeHooks>>>,
}

impl AttributeDispatcher {
    pub fn new(model: Arc<DataModel>) -> Self {
        Self {
            model,
            endpoint_hooks: RwLock::new(HashMap::new()),
            node_hooks: RwLock::new(None),
        }
    }

    pub fn model(&self) -> &Arc<DataModel> {
        &self.model
    }

    /// Register the hooks for one endpoint, replacing any previous ones.
    pub fn register_hooks(&self, endpoint: EndpointId, hooks: Arc<dyn AttributeHooks>) {
        self.endpoint_hooks.write().insert(endpoint, hooks);
    }

    pub fn unregister_hooks(&self, endpoint: EndpointId) {
        self.endpoint_hooks.write().remove(&endpoint);
    }

    /// Hooks used for every endpoint that has none of its own.
    pub fn set_node_hooks(&self, hooks: Arc<dyn AttributeHooks>) {
        *self.node_hooks.write() = Some(hooks);
    }

    fn hooks_for(&self, endpoint: EndpointId) -> Option<Arc<dyn AttributeHooks>> {
        self.endpoint_hooks
            .read()
            .get(&endpoint)
            .cloned()
            .or_else(|| self.node_hooks.read().clone())
    }

    pub fn dispatch_write(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
        value: AttrValue,
    ) -> Result<()> {
        self.write(AttrPath::new(endpoint, cluster, attribute), value)
    }

    /// Validate, run hooks around, and commit a write to `path`.
    pub fn write(&self, path: AttrPath, value: AttrValue) -> Result<()> {
        let _guard = self.model.lock_mutations();

        let driver = self.model.read(|tree| {
            tree.check_write(path, &value)?;
            Ok::<_, DataModelError>(tree.endpoint(path.endpoint).and_then(|ep| ep.driver()))
        });
        let driver = match driver {
            Ok(driver) => driver,
            Err(e) => {
                warn!("[Dispatch] Rejected write to {}: {}", path, e);
                return Err(e);
            }
        };

        let hooks = self.hooks_for(path.endpoint);
        let ctx = UpdateContext {
            path,
            value: &value,
            driver,
        };

        if let Some(hooks) = &hooks
            && let Err(e) = hooks.pre_update(&ctx)
        {
            warn!("[Dispatch] Pre-update hook vetoed {} = {}: {}", path, value, e);
            return Err(DataModelError::HookRejected {
                phase: HookPhase::Pre,
                reason: e.0,
            });
        }

        // The endpoint may have been removed by the hook itself.
        self.model.commit(path, value.clone())?;
        debug!("[Dispatch] Committed {} = {}", path, value);

        if let Some(hooks) = &hooks
            && let Err(e) = hooks.post_update(&ctx)
        {
            warn!("[Dispatch] Post-update hook failed for {}: {}", path, e);
            return Err(DataModelError::HookRejected {
                phase: HookPhase::Post,
                reason: e.0,
            });
        }
        Ok(())
    }

    /// Hand an Identify request to the endpoint's hooks, then update
    /// IdentifyTime to match.
    pub fn identify(&self, endpoint: EndpointId, request: IdentifyRequest) -> Result<()> {
        let _guard = self.model.lock_mutations();

        if self
            .model
            .read(|tree| tree.cluster(endpoint, identify::ID).is_none())
        {
            return Err(DataModelError::UnknownCluster {
                endpoint,
                cluster: identify::ID,
            });
        }
        info!("[Dispatch] Identify on endpoint {}: {:?}", endpoint, request);

        if let Some(hooks) = self.hooks_for(endpoint)
            && let Err(e) = hooks.identify(endpoint, request)
        {
            warn!("[Dispatch] Identify rejected on endpoint {}: {}", endpoint, e);
            return Err(DataModelError::HookRejected {
                phase: HookPhase::Pre,
                reason: e.0,
            });
        }

        if let Some(time) = request.identify_time() {
            self.model.commit(
                AttrPath::new(endpoint, identify::ID, identify::attributes::IDENTIFY_TIME),
                time.into(),
            )?;
        }
        Ok(())
    }
}
