//! Configuration loading

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use smartbridge_client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use smartbridge_sync::{OfflinePolicy, PluginIdentity};
use std::path::Path;
use tracing::info;

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV: &str = "SMARTTHINGS_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub smartthings: SmartThingsConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the HTTP endpoint
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Where published accessories are cached between restarts
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache_path: default_cache_path(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:18081".to_string()
}

fn default_cache_path() -> String {
    "./accessories.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartThingsConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmartThingsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SmartThingsConfig {
    /// Configured token, falling back to the environment
    pub fn token(&self) -> Result<String> {
        resolve_token(self.token.as_deref(), std::env::var(TOKEN_ENV).ok())
    }
}

fn resolve_token(configured: Option<&str>, env: Option<String>) -> Result<String> {
    match configured.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Ok(token.to_string()),
        None => match env.filter(|t| !t.trim().is_empty()) {
            Some(token) => Ok(token.trim().to_string()),
            None => bail!(
                "No SmartThings token: set smartthings.token or the {} environment variable",
                TOKEN_ENV
            ),
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Behaviour when a device reports offline before a read or write
    #[serde(default)]
    pub offline_policy: OfflinePolicy,
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            offline_policy: OfflinePolicy::default(),
            plugin_name: default_plugin_name(),
            platform_name: default_platform_name(),
        }
    }
}

fn default_plugin_name() -> String {
    PluginIdentity::default().plugin_name
}

fn default_platform_name() -> String {
    PluginIdentity::default().platform_name
}

impl BridgeConfig {
    pub fn plugin(&self) -> PluginIdentity {
        PluginIdentity {
            plugin_name: self.plugin_name.clone(),
            platform_name: self.platform_name.clone(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
