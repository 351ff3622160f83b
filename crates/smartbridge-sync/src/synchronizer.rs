//! Device synchronization
//!
//! Reconciles the remote device inventory with the accessories published to
//! the host: new devices are added, cached ones are restored with fresh
//! handlers, and vanished ones are removed. Passes are serialized.

use serde::Serialize;
use smartbridge_client::{ClientError, DeviceApi};
use smartbridge_core::{AccessoryCategory, DeviceId};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::accessory::PlatformAccessory;
use crate::bridge::OfflinePolicy;
use crate::controller::construct;
use crate::host::{AccessoryHost, PluginIdentity};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Device discovery failed: {0}")]
    Discovery(#[source] ClientError),
    #[error("Host rejected accessories: {0}")]
    Host(String),
}

/// A device whose controller could not be built during a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
    pub device: DeviceId,
    pub error: String,
}

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub added: Vec<DeviceId>,
    pub restored: Vec<DeviceId>,
    pub removed: Vec<DeviceId>,
    /// Devices declaring no category the bridge knows
    pub ignored: Vec<DeviceId>,
    pub failed: Vec<SyncFailure>,
}

/// Published accessories keyed by device id
#[derive(Default)]
pub struct AccessoryRegistry {
    accessories: BTreeMap<DeviceId, PlatformAccessory>,
}

impl AccessoryRegistry {
    /// Insert or replace. Accessories without a device context are refused.
    pub fn insert(&mut self, accessory: PlatformAccessory) -> bool {
        match accessory.device_id().cloned() {
            Some(id) => {
                self.accessories.insert(id, accessory);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &DeviceId) -> Option<PlatformAccessory> {
        self.accessories.remove(id)
    }

    pub fn get(&self, id: &DeviceId) -> Option<&PlatformAccessory> {
        self.accessories.get(id)
    }

    pub fn ids(&self) -> Vec<DeviceId> {
        self.accessories.keys().cloned().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &PlatformAccessory> {
        self.accessories.values()
    }
}

pub struct DeviceSynchronizer {
    api: Arc<dyn DeviceApi>,
    host: Arc<dyn AccessoryHost>,
    plugin: PluginIdentity,
    policy: OfflinePolicy,
    registry: RwLock<AccessoryRegistry>,
    pass_lock: Mutex<()>,
}

impl DeviceSynchronizer {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        host: Arc<dyn AccessoryHost>,
        plugin: PluginIdentity,
        policy: OfflinePolicy,
    ) -> Self {
        Self {
            api,
            host,
            plugin,
            policy,
            registry: RwLock::new(AccessoryRegistry::default()),
            pass_lock: Mutex::new(()),
        }
    }

    pub fn plugin(&self) -> &PluginIdentity {
        &self.plugin
    }

    /// Accept an accessory restored from the host's cache
    ///
    /// It is kept as-is until the next pass restores or removes it.
    pub async fn configure_accessory(&self, accessory: PlatformAccessory) -> bool {
        let name = accessory.display_name.clone();
        let accepted = self.registry.write().await.insert(accessory);
        if accepted {
            info!("Loading accessory from cache: {}", name);
        } else {
            debug!("Skipping cached accessory without device context: {}", name);
        }
        accepted
    }

    /// Snapshot of all published accessories, ordered by device id
    pub async fn accessories(&self) -> Vec<PlatformAccessory> {
        self.registry.read().await.values().cloned().collect()
    }

    pub async fn accessory(&self, id: &DeviceId) -> Option<PlatformAccessory> {
        self.registry.read().await.get(id).cloned()
    }

    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.registry.read().await.ids()
    }

    /// Run one synchronization pass
    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let _pass = self.pass_lock.lock().await;

        let devices = self.api.list_devices().await.map_err(SyncError::Discovery)?;
        debug!(count = devices.len(), "Discovered devices");

        let cached: BTreeMap<DeviceId, PlatformAccessory> = self
            .registry
            .read()
            .await
            .accessories
            .clone();

        let mut report = SyncReport::default();
        let mut seen = HashSet::new();
        let mut live = HashSet::new();
        let mut restored = Vec::new();
        let mut added = Vec::new();

        for device in devices {
            let id = device.id().clone();
            if !seen.insert(id.clone()) {
                debug!(device = %id, "Skipping duplicate listing of {}", device.display_name());
                continue;
            }
            if AccessoryCategory::for_device(&device).is_none() {
                debug!(
                    device = %id,
                    "No supported category for {}, ignoring",
                    device.display_name()
                );
                report.ignored.push(id);
                continue;
            }
            live.insert(id.clone());

            match cached.get(&id) {
                Some(existing) => {
                    let mut accessory = existing.clone();
                    info!(
                        device = %id,
                        "Restoring existing accessory from cache: {}",
                        accessory.display_name
                    );
                    match construct(self.api.clone(), &mut accessory, self.policy).await {
                        Ok(_) => {
                            report.restored.push(id);
                            restored.push(accessory);
                        }
                        Err(e) if e.is_permanent() => {
                            warn!(
                                device = %id,
                                error = %e,
                                "Failed to restore {}, removing it",
                                accessory.display_name
                            );
                            live.remove(&id);
                            report.failed.push(SyncFailure {
                                device: id,
                                error: e.to_string(),
                            });
                        }
                        Err(e) => {
                            warn!(
                                device = %id,
                                error = %e,
                                "Failed to restore {}, keeping cached accessory",
                                accessory.display_name
                            );
                            report.failed.push(SyncFailure {
                                device: id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                None => {
                    info!(device = %id, "Adding new accessory: {}", device.display_name());
                    let mut accessory = PlatformAccessory::for_device(device);
                    match construct(self.api.clone(), &mut accessory, self.policy).await {
                        Ok(_) => {
                            report.added.push(id);
                            added.push(accessory);
                        }
                        Err(e) => {
                            warn!(
                                device = %id,
                                error = %e,
                                "Failed to add {}",
                                accessory.display_name
                            );
                            report.failed.push(SyncFailure {
                                device: id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let removed: Vec<PlatformAccessory> = cached
            .into_iter()
            .filter(|(id, _)| !live.contains(id))
            .map(|(_, accessory)| accessory)
            .collect();

        {
            let mut registry = self.registry.write().await;
            for accessory in restored {
                registry.insert(accessory);
            }
        }

        if !added.is_empty() {
            self.host
                .register_platform_accessories(&self.plugin, &added)
                .await
                .map_err(|e| SyncError::Host(format!("{:#}", e)))?;
            let mut registry = self.registry.write().await;
            for accessory in added {
                registry.insert(accessory);
            }
        }

        if !removed.is_empty() {
            for accessory in &removed {
                info!("Removing accessory: {}", accessory.display_name);
            }
            self.host
                .unregister_platform_accessories(&self.plugin, &removed)
                .await
                .map_err(|e| SyncError::Host(format!("{:#}", e)))?;
            let mut registry = self.registry.write().await;
            for accessory in &removed {
                if let Some(id) = accessory.device_id() {
                    registry.remove(id);
                    report.removed.push(id.clone());
                }
            }
        }

        info!(
            added = report.added.len(),
            restored = report.restored.len(),
            removed = report.removed.len(),
            ignored = report.ignored.len(),
            failed = report.failed.len(),
            "Synchronization pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::ServiceKind;
    use crate::test_support::{device, FakeApi, RecordingHost};
    use smartbridge_core::{Characteristic, CharacteristicValue, Device};

    fn ids(list: &[&str]) -> Vec<DeviceId> {
        list.iter().map(|id| DeviceId::new(*id)).collect()
    }

    fn switch(id: &str) -> Device {
        device(id, &["Switch"], &["switch"])
    }

    fn setup() -> (Arc<FakeApi>, Arc<RecordingHost>, DeviceSynchronizer) {
        let api = Arc::new(FakeApi::default());
        let host = Arc::new(RecordingHost::default());
        let sync = DeviceSynchronizer::new(
            api.clone(),
            host.clone(),
            PluginIdentity::default(),
            OfflinePolicy::default(),
        );
        (api, host, sync)
    }

    #[tokio::test]
    async fn test_first_pass_adds_everything() {
        let (api, host, sync) = setup();
        api.set_devices(vec![
            switch("a"),
            device("b", &["Light"], &["switch", "switchLevel"]),
        ]);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.added, ids(&["a", "b"]));
        assert!(report.restored.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(
            host.registered(),
            vec![vec!["a label".to_string(), "b label".to_string()]]
        );
        assert!(host.unregistered().is_empty());
        assert_eq!(sync.device_ids().await, ids(&["a", "b"]));

        let b = sync.accessory(&DeviceId::new("b")).await.unwrap();
        assert_eq!(b.service().map(|s| s.kind), Some(ServiceKind::Lightbulb));
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a"), switch("b")]);
        sync.sync_once().await.unwrap();

        let report = sync.sync_once().await.unwrap();
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(report.restored, ids(&["a", "b"]));
        assert_eq!(host.registered().len(), 1);
        assert!(host.unregistered().is_empty());
    }

    #[tokio::test]
    async fn test_add_restore_remove_set_algebra() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a"), switch("b"), switch("c")]);
        sync.sync_once().await.unwrap();

        api.set_devices(vec![switch("b"), switch("c"), switch("d")]);
        let report = sync.sync_once().await.unwrap();

        assert_eq!(report.added, ids(&["d"]));
        assert_eq!(report.restored, ids(&["b", "c"]));
        assert_eq!(report.removed, ids(&["a"]));
        assert_eq!(host.registered()[1], vec!["d label".to_string()]);
        assert_eq!(host.unregistered(), vec![vec!["a label".to_string()]]);
        assert_eq!(sync.device_ids().await, ids(&["b", "c", "d"]));
    }

    #[tokio::test]
    async fn test_cached_accessories_are_restored_not_registered() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        let cached = PlatformAccessory::for_device(switch("a"));
        assert!(cached.service().is_none());
        assert!(sync.configure_accessory(cached).await);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.restored, ids(&["a"]));
        assert!(host.registered().is_empty());

        let restored = sync.accessory(&DeviceId::new("a")).await.unwrap();
        assert_eq!(restored.characteristics(), vec![Characteristic::On]);
    }

    #[tokio::test]
    async fn test_configure_rejects_accessory_without_device() {
        let (_api, _host, sync) = setup();
        let orphan =
            PlatformAccessory::new("Orphan", smartbridge_core::accessory_uuid("orphan"));
        assert!(!sync.configure_accessory(orphan).await);
        assert!(sync.accessories().await.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_registry_untouched() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        sync.sync_once().await.unwrap();

        api.fail_list(true);
        let err = sync.sync_once().await.unwrap_err();
        assert!(matches!(err, SyncError::Discovery(_)));
        assert_eq!(sync.device_ids().await, ids(&["a"]));
        assert!(host.unregistered().is_empty());
    }

    #[tokio::test]
    async fn test_category_precedence() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![device(
            "a",
            &["Fan", "Light", "Switch"],
            &["switch", "switchLevel"],
        )]);
        sync.sync_once().await.unwrap();

        let a = sync.accessory(&DeviceId::new("a")).await.unwrap();
        assert_eq!(a.service().map(|s| s.kind), Some(ServiceKind::Switch));
        assert_eq!(a.characteristics(), vec![Characteristic::On]);
    }

    #[tokio::test]
    async fn test_garage_door_is_never_added() {
        let (api, host, sync) = setup();
        api.set_devices(vec![
            device("g", &["GarageDoor"], &["doorControl"]),
            switch("a"),
        ]);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.added, ids(&["a"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].device, DeviceId::new("g"));
        assert_eq!(host.registered(), vec![vec!["a label".to_string()]]);
        assert!(!sync.device_ids().await.contains(&DeviceId::new("g")));
    }

    #[tokio::test]
    async fn test_unknown_categories_are_ignored() {
        let (api, host, sync) = setup();
        api.set_devices(vec![
            device("t", &["Thermostat"], &["thermostatMode"]),
            device("n", &[], &[]),
        ]);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.ignored, ids(&["t", "n"]));
        assert!(report.added.is_empty());
        assert!(host.registered().is_empty());
    }

    #[tokio::test]
    async fn test_device_losing_its_category_is_removed() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        sync.sync_once().await.unwrap();

        api.set_devices(vec![device("a", &["Thermostat"], &["switch"])]);
        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.ignored, ids(&["a"]));
        assert_eq!(report.removed, ids(&["a"]));
        assert!(sync.device_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_device_does_not_abort_the_pass() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![switch("a"), switch("bad"), switch("c")]);
        api.fail_device("bad");

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.added, ids(&["a", "c"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].device, DeviceId::new("bad"));
        assert_eq!(sync.device_ids().await, ids(&["a", "c"]));
    }

    #[tokio::test]
    async fn test_failed_restore_keeps_cached_entry() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        sync.sync_once().await.unwrap();

        api.fail_device("a");
        let report = sync.sync_once().await.unwrap();
        assert!(report.restored.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(report.failed[0].device, DeviceId::new("a"));

        let a = sync.accessory(&DeviceId::new("a")).await.unwrap();
        assert_eq!(a.characteristics(), vec![Characteristic::On]);
    }

    #[tokio::test]
    async fn test_duplicate_listing_is_added_once() {
        let (api, host, sync) = setup();
        let a = switch("a");
        api.set_devices(vec![a.clone(), a, switch("b")]);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.added, ids(&["a", "b"]));
        assert!(report.failed.is_empty());
        assert_eq!(
            host.registered(),
            vec![vec!["a label".to_string(), "b label".to_string()]]
        );
        assert_eq!(sync.device_ids().await, ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_device_turning_unsupported_is_removed() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        sync.sync_once().await.unwrap();

        api.set_devices(vec![device("a", &["GarageDoor"], &["doorControl", "switch"])]);
        let report = sync.sync_once().await.unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(report.removed, ids(&["a"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].device, DeviceId::new("a"));
        assert_eq!(host.unregistered(), vec![vec!["a label".to_string()]]);
        assert!(sync.accessory(&DeviceId::new("a")).await.is_none());
        assert!(api.commands().is_empty());

        let report = sync.sync_once().await.unwrap();
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(host.unregistered().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_capabilities_expose_only_on() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![device("l", &["Light"], &[])]);
        sync.sync_once().await.unwrap();

        let l = sync.accessory(&DeviceId::new("l")).await.unwrap();
        assert_eq!(l.characteristics(), vec![Characteristic::On]);
    }

    #[tokio::test]
    async fn test_host_failure_is_retried_next_pass() {
        let (api, host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        host.fail(true);

        let err = sync.sync_once().await.unwrap_err();
        assert!(matches!(err, SyncError::Host(_)));
        assert!(sync.device_ids().await.is_empty());

        host.fail(false);
        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.added, ids(&["a"]));
    }

    #[tokio::test]
    async fn test_published_accessory_drives_device() {
        let (api, _host, sync) = setup();
        api.set_devices(vec![switch("a")]);
        sync.sync_once().await.unwrap();

        let a = sync.accessory(&DeviceId::new("a")).await.unwrap();
        a.write(Characteristic::On, CharacteristicValue::Bool(true))
            .await
            .unwrap();
        let commands = api.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, DeviceId::new("a"));
        assert_eq!(commands[0].1.command, "on");
    }
}
