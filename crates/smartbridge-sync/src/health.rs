//! Online pre-check consulted before every remote interaction

use smartbridge_client::DeviceApi;
use smartbridge_core::{DeviceId, HealthState};
use std::sync::Arc;
use tracing::{debug, trace};

/// Health gate for one device
///
/// Advisory only: a device reported online can still fail the call that
/// follows, so callers keep their own error handling.
#[derive(Clone)]
pub struct HealthGate {
    api: Arc<dyn DeviceApi>,
    device_id: DeviceId,
}

impl HealthGate {
    pub fn new(api: Arc<dyn DeviceApi>, device_id: DeviceId) -> Self {
        Self { api, device_id }
    }

    /// True iff the remote reports `ONLINE`. Query failures count as offline.
    pub async fn is_online(&self) -> bool {
        match self.api.get_health(&self.device_id).await {
            Ok(health) => {
                trace!(device = %self.device_id, state = ?health.state, "Health check");
                health.state == HealthState::Online
            }
            Err(e) => {
                debug!(
                    device = %self.device_id,
                    error = %e,
                    "Health query failed, treating as offline"
                );
                false
            }
        }
    }
}
