//! Command/status bridge: translates characteristic reads and writes into
//! remote status queries and commands for one device
//!
//! Every access runs the health gate, then at most one remote call. Remote
//! failures and unpopulated values are normalized to
//! [`HapStatusError::ServiceCommunicationFailure`]; the cause is only logged.

use serde::{Deserialize, Serialize};
use smartbridge_client::DeviceApi;
use smartbridge_core::{CharacteristicBinding, CharacteristicValue, DeviceId};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::accessory::HapStatusError;
use crate::health::HealthGate;

/// What to do when the health gate reports a device offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflinePolicy {
    /// Fail immediately without issuing the remote call
    #[default]
    ShortCircuit,
    /// Log and attempt the remote call anyway; its outcome decides
    Advisory,
}

pub struct CommandBridge {
    api: Arc<dyn DeviceApi>,
    gate: HealthGate,
    device_id: DeviceId,
    name: String,
    policy: OfflinePolicy,
}

impl CommandBridge {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        device_id: DeviceId,
        name: impl Into<String>,
        policy: OfflinePolicy,
    ) -> Self {
        Self {
            gate: HealthGate::new(api.clone(), device_id.clone()),
            api,
            device_id,
            name: name.into(),
            policy,
        }
    }

    async fn preflight(&self) -> Result<(), HapStatusError> {
        if self.gate.is_online().await {
            return Ok(());
        }

        debug!(device = %self.device_id, "{} is offline", self.name);
        match self.policy {
            OfflinePolicy::ShortCircuit => Err(HapStatusError::ServiceCommunicationFailure),
            OfflinePolicy::Advisory => Ok(()),
        }
    }

    /// Write a characteristic value as a single remote command
    pub async fn set(
        &self,
        binding: &CharacteristicBinding,
        value: CharacteristicValue,
    ) -> Result<(), HapStatusError> {
        let characteristic = binding.characteristic;
        debug!(
            device = %self.device_id,
            "Received set{}({}) event for {}",
            characteristic,
            value,
            self.name
        );

        let command = (binding.write)(&value).map_err(|e| {
            warn!(
                device = %self.device_id,
                error = %e,
                "set{} rejected for {}",
                characteristic,
                self.name
            );
            HapStatusError::InvalidValueInRequest
        })?;

        self.preflight().await?;

        match self.api.execute_command(&self.device_id, command).await {
            Ok(_) => {
                debug!(
                    device = %self.device_id,
                    "set{}({}) successful for {}",
                    characteristic,
                    value,
                    self.name
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    device = %self.device_id,
                    error = %e,
                    "set{} failed for {}. [Communication Error]",
                    characteristic,
                    self.name
                );
                Err(HapStatusError::ServiceCommunicationFailure)
            }
        }
    }

    /// Read a characteristic from a single remote status query
    pub async fn get(
        &self,
        binding: &CharacteristicBinding,
    ) -> Result<CharacteristicValue, HapStatusError> {
        let characteristic = binding.characteristic;
        debug!(
            device = %self.device_id,
            "Received get{}() event for {}",
            characteristic,
            self.name
        );

        self.preflight().await?;

        let status = self.api.get_status(&self.device_id).await.map_err(|e| {
            debug!(
                device = %self.device_id,
                error = %e,
                "get{}() failed for {}. [Communication Error]",
                characteristic,
                self.name
            );
            HapStatusError::ServiceCommunicationFailure
        })?;

        match (binding.read)(&status) {
            Some(value) => {
                debug!(
                    device = %self.device_id,
                    "get{}() successful for {}. Value: '{}'",
                    characteristic,
                    self.name,
                    value
                );
                Ok(value)
            }
            None => {
                debug!(
                    device = %self.device_id,
                    "get{}() failed for {}. [Undefined Value]",
                    characteristic,
                    self.name
                );
                Err(HapStatusError::ServiceCommunicationFailure)
            }
        }
    }
}
