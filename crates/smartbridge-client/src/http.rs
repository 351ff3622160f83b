//! HTTP implementation of the device API against the SmartThings REST endpoints

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smartbridge_core::{Device, DeviceCommand, DeviceHealth, DeviceId, DeviceStatus};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::api::{ClientError, CommandAck, DeviceApi};

/// Public SmartThings API root
pub const DEFAULT_API_URL: &str = "https://api.smartthings.com/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One page of `GET /devices`
#[derive(Debug, Deserialize)]
struct DevicePage {
    #[serde(default)]
    items: Vec<Device>,
    #[serde(default, rename = "_links")]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

impl DevicePage {
    fn next_href(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_ref())
            .map(|n| n.href.as_str())
    }
}

/// Walks `_links.next.href`, never fetching the same page twice
struct PageCursor {
    next: Option<String>,
    visited: HashSet<String>,
}

impl PageCursor {
    fn new(first: String) -> Self {
        Self {
            next: Some(first),
            visited: HashSet::new(),
        }
    }

    fn next_url(&mut self) -> Option<String> {
        let url = self.next.take()?;
        self.visited.insert(url.clone());
        Some(url)
    }

    fn advance(&mut self, href: Option<&str>) {
        self.next = match href {
            Some(href) if self.visited.contains(href) => {
                warn!(url = %href, "Device listing links back to a fetched page, stopping");
                None
            }
            href => href.map(str::to_string),
        };
    }
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    commands: [&'a DeviceCommand; 1],
}

/// SmartThings API client authenticated with a bearer token
pub struct SmartThingsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SmartThingsClient {
    pub fn new(base_url: &str, token: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn devices_url(&self) -> String {
        format!("{}/devices", self.base_url)
    }

    fn device_url(&self, id: &DeviceId, suffix: &str) -> String {
        format!("{}/devices/{}{}", self.base_url, id, suffix)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        trace!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }
}

/// Reject non-2xx responses with their body, decode the rest
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl DeviceApi for SmartThingsClient {
    async fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        let mut devices = Vec::new();
        let mut cursor = PageCursor::new(self.devices_url());

        while let Some(url) = cursor.next_url() {
            let page: DevicePage = self.get_json(&url).await?;
            cursor.advance(page.next_href());
            devices.extend(page.items);
        }

        debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    async fn get_device(&self, id: &DeviceId) -> Result<Device, ClientError> {
        self.get_json(&self.device_url(id, "")).await
    }

    async fn get_health(&self, id: &DeviceId) -> Result<DeviceHealth, ClientError> {
        self.get_json(&self.device_url(id, "/health")).await
    }

    async fn get_status(&self, id: &DeviceId) -> Result<DeviceStatus, ClientError> {
        self.get_json(&self.device_url(id, "/status")).await
    }

    async fn execute_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<CommandAck, ClientError> {
        let url = self.device_url(id, "/commands");
        trace!(
            url = %url,
            capability = %command.capability,
            command = %command.command,
            "POST"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&CommandRequest {
                commands: [&command],
            })
            .send()
            .await?;
        decode(response).await
    }
}
