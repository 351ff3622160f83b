//! Local accessory host with a JSON accessory cache
//!
//! Keeps the set of published accessories in memory and mirrors it to a
//! cache file so accessories survive a restart. Handlers are never cached;
//! the synchronizer reattaches them on its next pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartbridge_core::AccessoryRecord;
use smartbridge_sync::{AccessoryHost, PlatformAccessory, PluginIdentity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum HostCacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// On-disk accessory cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryCache {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub plugin: Option<PluginIdentity>,
    #[serde(default)]
    pub accessories: Vec<AccessoryRecord>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for AccessoryCache {
    fn default() -> Self {
        Self {
            version: default_version(),
            plugin: None,
            accessories: Vec::new(),
        }
    }
}

impl AccessoryCache {
    pub fn from_file(path: &Path) -> Result<Self, HostCacheError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the cache or start empty if the file doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, HostCacheError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), HostCacheError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// In-process accessory host
pub struct LocalHost {
    cache_path: PathBuf,
    published: RwLock<BTreeMap<Uuid, PlatformAccessory>>,
}

impl LocalHost {
    /// Open the host, returning the cached accessories it restored
    pub fn open(
        cache_path: impl Into<PathBuf>,
    ) -> Result<(Self, Vec<PlatformAccessory>), HostCacheError> {
        let cache_path = cache_path.into();
        let cache = AccessoryCache::load_or_create(&cache_path)?;

        let restored: Vec<PlatformAccessory> = cache
            .accessories
            .into_iter()
            .map(PlatformAccessory::from_record)
            .collect();
        info!(
            path = %cache_path.display(),
            count = restored.len(),
            "Loaded accessory cache"
        );

        let published = restored
            .iter()
            .map(|a| (a.uuid, a.clone()))
            .collect();

        Ok((
            Self {
                cache_path,
                published: RwLock::new(published),
            },
            restored,
        ))
    }

    pub async fn published(&self) -> Vec<PlatformAccessory> {
        self.published.read().await.values().cloned().collect()
    }

    fn persist(
        &self,
        plugin: &PluginIdentity,
        published: &BTreeMap<Uuid, PlatformAccessory>,
    ) -> Result<(), HostCacheError> {
        let cache = AccessoryCache {
            version: default_version(),
            plugin: Some(plugin.clone()),
            accessories: published.values().map(|a| a.to_record()).collect(),
        };
        cache.save(&self.cache_path)?;
        debug!(
            path = %self.cache_path.display(),
            count = published.len(),
            "Saved accessory cache"
        );
        Ok(())
    }
}

#[async_trait]
impl AccessoryHost for LocalHost {
    async fn register_platform_accessories(
        &self,
        plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()> {
        let mut published = self.published.write().await;
        let mut next = published.clone();
        for accessory in accessories {
            next.insert(accessory.uuid, accessory.clone());
        }
        self.persist(plugin, &next)?;
        *published = next;
        info!(
            plugin = %plugin.plugin_name,
            platform = %plugin.platform_name,
            count = accessories.len(),
            "Registered accessories"
        );
        Ok(())
    }

    async fn unregister_platform_accessories(
        &self,
        plugin: &PluginIdentity,
        accessories: &[PlatformAccessory],
    ) -> anyhow::Result<()> {
        let mut published = self.published.write().await;
        let mut next = published.clone();
        for accessory in accessories {
            next.remove(&accessory.uuid);
        }
        self.persist(plugin, &next)?;
        *published = next;
        info!(
            plugin = %plugin.plugin_name,
            platform = %plugin.platform_name,
            count = accessories.len(),
            "Unregistered accessories"
        );
        Ok(())
    }
}
