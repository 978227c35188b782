//! Bridged device persistence for endpoint recovery after restart.
//!
//! Every join and leave rewrites a small JSON file listing the bridged
//! devices, their capabilities and the endpoint id they were given. On the
//! next start the registry replays that list in order, so each remote device
//! gets the same endpoint id back and controllers keep their bindings.

use super::link::RemoteId;
use crate::error::PersistError;
use crate::matter::data_model::{ClusterSpec, EndpointId};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (under the platform config dir) for persistence data
const PERSIST_DIR: &str = "bridge-light-node";
const PERSIST_FILE: &str = "bridged_devices.json";

/// One bridged device as it was last known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDevice {
    pub remote_id: RemoteId,
    /// Endpoint id held before restart; `None` for devices never bridged.
    pub endpoint_id: Option<EndpointId>,
    #[serde(default)]
    pub label: Option<String>,
    pub capabilities: Vec<ClusterSpec>,
    pub joined_at: DateTime<Utc>,
}

/// Persisted bridge state
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedDevices {
    pub devices: Vec<PersistedDevice>,
}

impl PersistedDevices {
    /// Load from file
    pub fn load(path: &Path) -> Self {
        match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<PersistedDevices>(&bytes) {
                Ok(state) => {
                    info!(
                        "[Bridge] Loaded {} persisted device(s) from {:?}",
                        state.devices.len(),
                        path
                    );
                    state
                }
                Err(e) => {
                    warn!("[Bridge] Failed to parse bridged devices file: {}", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[Bridge] No persisted bridged devices found (first run)");
                Self::default()
            }
            Err(e) => {
                error!("[Bridge] Failed to read bridged devices file: {}", e);
                Self::default()
            }
        }
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        info!(
            "[Bridge] Saved {} bridged device(s) to {:?}",
            self.devices.len(),
            path
        );
        Ok(())
    }

    /// Add or replace the record for a device, keeping join order.
    pub fn upsert(&mut self, device: PersistedDevice) {
        match self
            .devices
            .iter_mut()
            .find(|d| d.remote_id == device.remote_id)
        {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
    }

    pub fn remove(&mut self, remote_id: &RemoteId) {
        self.devices.retain(|d| &d.remote_id != remote_id);
    }
}

/// Store wrapper with auto-save
pub struct BridgeStore {
    path: PathBuf,
    state: RwLock<PersistedDevices>,
}

impl BridgeStore {
    pub fn new(path: PathBuf) -> Self {
        let state = PersistedDevices::load(&path);
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    /// `<config dir>/bridge-light-node/bridged_devices.json`, falling back to
    /// the working directory when no config dir exists.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(PERSIST_DIR)
            .join(PERSIST_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_all(&self) -> Vec<PersistedDevice> {
        self.state.read().devices.clone()
    }

    pub fn upsert(&self, device: PersistedDevice) {
        let mut state = self.state.write();
        state.upsert(device);
        if let Err(e) = state.save(&self.path) {
            error!("[Bridge] Failed to save bridged devices: {}", e);
        }
    }

    pub fn remove(&self, remote_id: &RemoteId) {
        let mut state = self.state.write();
        let before = state.devices.len();
        state.remove(remote_id);
        if state.devices.len() == before {
            return;
        }
        if let Err(e) = state.save(&self.path) {
            error!("[Bridge] Failed to save bridged devices: {}", e);
        }
    }

    /// Replace the whole list (after a resume reassigned endpoint ids).
    pub fn replace_all(&self, devices: Vec<PersistedDevice>) {
        let mut state = self.state.write();
        state.devices = devices;
        if let Err(e) = state.save(&self.path) {
            error!("[Bridge] Failed to save bridged devices: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::clusters::on_off;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bridge-light-node-test-{}-{}", std::process::id(), name))
            .join(PERSIST_FILE)
    }

    fn device(id: &str, endpoint: EndpointId) -> PersistedDevice {
        PersistedDevice {
            remote_id: RemoteId::from(id),
            endpoint_id: Some(endpoint),
            label: Some(format!("Light {}", id)),
            capabilities: vec![on_off::cluster(&on_off::Config::default())],
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_is_first_run() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        assert!(PersistedDevices::load(&path).devices.is_empty());
    }

    #[test]
    fn test_store_survives_reload() {
        let path = temp_path("reload");
        let _ = fs::remove_file(&path);

        let store = BridgeStore::new(path.clone());
        store.upsert(device("a", 3));
        store.upsert(device("b", 4));
        store.upsert(device("a", 7));
        store.remove(&RemoteId::from("b"));

        let reloaded = BridgeStore::new(path.clone());
        let devices = reloaded.get_all();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].remote_id, RemoteId::from("a"));
        assert_eq!(devices[0].endpoint_id, Some(7));
        assert_eq!(devices[0].capabilities, device("a", 7).capabilities);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();
        assert!(PersistedDevices::load(&path).devices.is_empty());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_upsert_keeps_join_order() {
        let mut state = PersistedDevices::default();
        state.upsert(device("a", 1));
        state.upsert(device("b", 2));
        state.upsert(device("a", 5));
        let ids: Vec<_> = state.devices.iter().map(|d| d.remote_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
