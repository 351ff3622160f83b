//! Application state management

use anyhow::{Context, Result};
use chrono::Utc;
use smartbridge_client::{DeviceApi, SmartThingsClient};
use smartbridge_sync::{AccessoryHost, DeviceSynchronizer, PlatformAccessory};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::host::LocalHost;

/// Shared application state
pub struct AppState {
    /// Accessory host and cache
    pub host: Arc<LocalHost>,
    /// Device synchronizer owning the accessory registry
    pub synchronizer: Arc<DeviceSynchronizer>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create state backed by the SmartThings API
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let token = config.smartthings.token()?;
        let client = SmartThingsClient::new(
            &config.smartthings.api_url,
            &token,
            config.smartthings.timeout_secs,
        )
        .context("Failed to create SmartThings client")?;
        Self::with_api(config, Arc::new(client)).await
    }

    /// Create state backed by any device API
    pub async fn with_api(config: Config, api: Arc<dyn DeviceApi>) -> Result<Arc<Self>> {
        let (host, cached) = LocalHost::open(&config.daemon.cache_path).with_context(|| {
            format!("Failed to open accessory cache {}", config.daemon.cache_path)
        })?;
        let host = Arc::new(host);

        let synchronizer = Arc::new(DeviceSynchronizer::new(
            api,
            host.clone(),
            config.bridge.plugin(),
            config.bridge.offline_policy,
        ));
        for accessory in cached {
            synchronizer.configure_accessory(accessory).await;
        }

        Ok(Arc::new(Self {
            host,
            synchronizer,
            config,
        }))
    }

    /// Published accessories with no backing device
    pub async fn test_accessories(&self) -> Vec<PlatformAccessory> {
        self.host
            .published()
            .await
            .into_iter()
            .filter(|a| a.device().is_none())
            .collect()
    }

    /// Publish an ad-hoc accessory named after the current time
    pub async fn add_test_accessory(&self) -> Result<PlatformAccessory> {
        let name = Utc::now().to_rfc3339();
        let accessory = PlatformAccessory::new(name, Uuid::new_v4());
        info!("Adding test accessory: {}", accessory.display_name);
        self.host
            .register_platform_accessories(
                self.synchronizer.plugin(),
                std::slice::from_ref(&accessory),
            )
            .await?;
        Ok(accessory)
    }

    /// Unpublish every ad-hoc accessory, returning how many were removed
    pub async fn remove_test_accessories(&self) -> Result<usize> {
        let accessories = self.test_accessories().await;
        if accessories.is_empty() {
            return Ok(0);
        }
        info!(count = accessories.len(), "Removing test accessories");
        self.host
            .unregister_platform_accessories(self.synchronizer.plugin(), &accessories)
            .await?;
        Ok(accessories.len())
    }
}
