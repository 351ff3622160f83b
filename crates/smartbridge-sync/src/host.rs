//! Accessory host boundary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::accessory::PlatformAccessory;

/// Identity under which accessories are published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub plugin_name: String,
    pub platform_name: String,
}

impl Default for PluginIdentity {
    fn default() -> Self {
        Self {
            plugin_name: "homebridge-smartthings".to_string(),
            platform_name: "SmartThings".to_string(),
        }
    }
}

/// Host that publishes accessories to end users and caches them across
/// restarts
///
/// Batches are all-or-nothing: an `Err` means none of the accessories were
/// accepted.
#[async_trait]
pub trait AccessoryHost: Send + Sync {
    async fn register_platform_accessories(
        &self,
        plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()>;

    async fn unregister_platform_accessories(
        &self,
        plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()>;
}
