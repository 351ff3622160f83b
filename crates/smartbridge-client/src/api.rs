//! Remote device-management API surface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartbridge_core::{Device, DeviceCommand, DeviceHealth, DeviceId, DeviceStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Client setup failed: {0}")]
    Setup(String),
}

/// Per-command outcome reported by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Acknowledgement of an executed command batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub results: Vec<CommandResult>,
}

/// Device-management operations the bridge consumes
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Full device inventory for the account
    async fn list_devices(&self) -> Result<Vec<Device>, ClientError>;

    async fn get_device(&self, id: &DeviceId) -> Result<Device, ClientError>;

    async fn get_health(&self, id: &DeviceId) -> Result<DeviceHealth, ClientError>;

    async fn get_status(&self, id: &DeviceId) -> Result<DeviceStatus, ClientError>;

    async fn execute_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<CommandAck, ClientError>;
}
