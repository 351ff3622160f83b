//! In-memory device API and host used by the unit tests

use async_trait::async_trait;
use serde_json::json;
use smartbridge_client::{ClientError, CommandAck, DeviceApi};
use smartbridge_core::{
    Device, DeviceCommand, DeviceHealth, DeviceId, DeviceStatus, HealthState,
};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::accessory::PlatformAccessory;
use crate::host::{AccessoryHost, PluginIdentity};

/// Device with one `main` component declaring the given categories and capabilities
pub fn device(id: &str, categories: &[&str], capabilities: &[&str]) -> Device {
    let categories: Vec<_> = categories.iter().map(|n| json!({"name": n})).collect();
    let capabilities: Vec<_> = capabilities.iter().map(|c| json!({"id": c})).collect();
    serde_json::from_value(json!({
        "deviceId": id,
        "name": format!("{}-name", id),
        "label": format!("{} label", id),
        "manufacturerName": "Acme",
        "components": [{
            "id": "main",
            "capabilities": capabilities,
            "categories": categories,
        }]
    }))
    .unwrap()
}

fn unavailable(what: &str) -> ClientError {
    ClientError::Status {
        status: 503,
        body: format!("{} unavailable", what),
    }
}

fn not_found(id: &DeviceId) -> ClientError {
    ClientError::Status {
        status: 404,
        body: format!("device {} not found", id),
    }
}

#[derive(Default)]
struct FakeState {
    devices: Vec<Device>,
    health: HashMap<DeviceId, HealthState>,
    status: HashMap<DeviceId, DeviceStatus>,
    fail_list: bool,
    fail_device: Vec<DeviceId>,
    fail_health: bool,
    fail_status: bool,
    fail_commands: bool,
    commands: Vec<(DeviceId, DeviceCommand)>,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn add_device(&self, device: Device, health: HealthState, status: DeviceStatus) {
        let mut state = self.state.lock().unwrap();
        let id = device.id().clone();
        state.devices.retain(|d| d.id() != &id);
        state.devices.push(device);
        state.health.insert(id.clone(), health);
        state.status.insert(id, status);
    }

    /// Replace the device inventory, keeping online health and empty status
    /// for devices not seen before
    pub fn set_devices(&self, devices: Vec<Device>) {
        let mut state = self.state.lock().unwrap();
        for device in &devices {
            state
                .health
                .entry(device.id().clone())
                .or_insert(HealthState::Online);
            state.status.entry(device.id().clone()).or_default();
        }
        state.devices = devices;
    }

    pub fn set_health(&self, id: &str, health: HealthState) {
        self.state
            .lock()
            .unwrap()
            .health
            .insert(DeviceId::new(id), health);
    }

    pub fn set_status(&self, id: &str, status: DeviceStatus) {
        self.state
            .lock()
            .unwrap()
            .status
            .insert(DeviceId::new(id), status);
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    /// Make `get_device` fail for one id
    pub fn fail_device(&self, id: &str) {
        self.state.lock().unwrap().fail_device.push(DeviceId::new(id));
    }

    pub fn fail_health(&self, fail: bool) {
        self.state.lock().unwrap().fail_health = fail;
    }

    pub fn fail_status(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    pub fn fail_commands(&self, fail: bool) {
        self.state.lock().unwrap().fail_commands = fail;
    }

    pub fn commands(&self) -> Vec<(DeviceId, DeviceCommand)> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == name)
            .count()
    }
}

#[async_trait]
impl DeviceApi for FakeApi {
    async fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_devices");
        if state.fail_list {
            return Err(unavailable("list"));
        }
        Ok(state.devices.clone())
    }

    async fn get_device(&self, id: &DeviceId) -> Result<Device, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get_device");
        if state.fail_device.contains(id) {
            return Err(unavailable("device"));
        }
        state
            .devices
            .iter()
            .find(|d| d.id() == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_health(&self, id: &DeviceId) -> Result<DeviceHealth, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get_health");
        if state.fail_health {
            return Err(unavailable("health"));
        }
        state
            .health
            .get(id)
            .map(|h| DeviceHealth::new(*h))
            .ok_or_else(|| not_found(id))
    }

    async fn get_status(&self, id: &DeviceId) -> Result<DeviceStatus, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get_status");
        if state.fail_status {
            return Err(unavailable("status"));
        }
        state.status.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn execute_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<CommandAck, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("execute_command");
        if state.fail_commands {
            return Err(unavailable("commands"));
        }
        state.commands.push((id.clone(), command));
        Ok(CommandAck::default())
    }
}

/// Host that records every batch it is handed
#[derive(Default)]
pub struct RecordingHost {
    registered: Mutex<Vec<Vec<String>>>,
    unregistered: Mutex<Vec<Vec<String>>>,
    fail: Mutex<bool>,
}

impl RecordingHost {
    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Display names per register batch
    pub fn registered(&self) -> Vec<Vec<String>> {
        self.registered.lock().unwrap().clone()
    }

    /// Display names per unregister batch
    pub fn unregistered(&self) -> Vec<Vec<String>> {
        self.unregistered.lock().unwrap().clone()
    }

    fn record(
        &self,
        batches: &Mutex<Vec<Vec<String>>>,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("host rejected batch");
        }
        batches
            .lock()
            .unwrap()
            .push(accessories.iter().map(|a| a.display_name.clone()).collect());
        Ok(())
    }
}

#[async_trait]
impl AccessoryHost for RecordingHost {
    async fn register_platform_accessories(
        &self,
        _plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()> {
        self.record(&self.registered, accessories)
    }

    async fn unregister_platform_accessories(
        &self,
        _plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()> {
        self.record(&self.unregistered, accessories)
    }
}
