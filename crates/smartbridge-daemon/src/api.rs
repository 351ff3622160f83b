//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use smartbridge_core::{Characteristic, CharacteristicValue, DeviceId};
use smartbridge_sync::{
    AccessoryInformation, HapStatusError, PlatformAccessory, ServiceKind, SyncError,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<i32>,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: None,
        }
    }

    fn response(code: StatusCode, msg: impl Into<String>) -> Response {
        (code, Json(Self::new(msg))).into_response()
    }
}

impl From<HapStatusError> for ApiError {
    fn from(e: HapStatusError) -> Self {
        Self {
            error: e.to_string(),
            status: Some(e.code()),
        }
    }
}

fn hap_error_response(e: HapStatusError) -> Response {
    let code = match e {
        HapStatusError::ServiceCommunicationFailure => StatusCode::SERVICE_UNAVAILABLE,
        HapStatusError::InvalidValueInRequest => StatusCode::BAD_REQUEST,
        HapStatusError::ResourceDoesNotExist => StatusCode::NOT_FOUND,
    };
    (code, Json(ApiError::from(e))).into_response()
}

/// Published accessory as returned by the API
#[derive(Serialize)]
pub struct AccessoryView {
    uuid: Uuid,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<DeviceId>,
    information: AccessoryInformation,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<ServiceKind>,
    characteristics: Vec<Characteristic>,
}

impl From<&PlatformAccessory> for AccessoryView {
    fn from(accessory: &PlatformAccessory) -> Self {
        Self {
            uuid: accessory.uuid,
            display_name: accessory.display_name.clone(),
            device_id: accessory.device_id().cloned(),
            information: accessory.information.clone(),
            service: accessory.service().map(|s| s.kind),
            characteristics: accessory.characteristics(),
        }
    }
}

async fn find_accessory(state: &AppState, id: &str) -> Result<PlatformAccessory, Response> {
    state
        .synchronizer
        .accessory(&DeviceId::new(id))
        .await
        .ok_or_else(|| ApiError::response(StatusCode::NOT_FOUND, "Accessory not found"))
}

fn parse_characteristic(name: &str) -> Result<Characteristic, Response> {
    name.parse::<Characteristic>()
        .map_err(|e| ApiError::response(StatusCode::NOT_FOUND, e.to_string()))
}

/// List all published accessories
pub async fn list_accessories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut views: Vec<AccessoryView> = state
        .synchronizer
        .accessories()
        .await
        .iter()
        .map(AccessoryView::from)
        .collect();
    views.extend(state.test_accessories().await.iter().map(AccessoryView::from));
    Json(views)
}

/// Get one accessory by device id
pub async fn get_accessory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match find_accessory(&state, &id).await {
        Ok(accessory) => Json(AccessoryView::from(&accessory)).into_response(),
        Err(response) => response,
    }
}

#[derive(Serialize)]
struct CharacteristicReading {
    characteristic: Characteristic,
    value: CharacteristicValue,
}

/// Deliver a host read event
pub async fn read_characteristic(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> Response {
    let characteristic = match parse_characteristic(&name) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let accessory = match find_accessory(&state, &id).await {
        Ok(a) => a,
        Err(response) => return response,
    };

    match accessory.read(characteristic).await {
        Ok(value) => Json(CharacteristicReading {
            characteristic,
            value,
        })
        .into_response(),
        Err(e) => hap_error_response(e),
    }
}

/// Write request body
#[derive(Deserialize)]
pub struct WriteRequest {
    value: CharacteristicValue,
}

/// Deliver a host write event
pub async fn write_characteristic(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    Json(req): Json<WriteRequest>,
) -> Response {
    let characteristic = match parse_characteristic(&name) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let accessory = match find_accessory(&state, &id).await {
        Ok(a) => a,
        Err(response) => return response,
    };

    match accessory.write(characteristic, req.value).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => hap_error_response(e),
    }
}

/// Trigger a synchronization pass
pub async fn trigger_sync(State(state): State<Arc<AppState>>) -> Response {
    info!("Manual synchronization requested");
    match state.synchronizer.sync_once().await {
        Ok(report) => Json(report).into_response(),
        Err(e @ SyncError::Discovery(_)) => {
            error!(error = %e, "Synchronization failed");
            ApiError::response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e @ SyncError::Host(_)) => {
            error!(error = %e, "Synchronization failed");
            ApiError::response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Publish an ad-hoc test accessory
pub async fn add_test_accessory(State(state): State<Arc<AppState>>) -> Response {
    match state.add_test_accessory().await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to add accessory: {:#}", e),
        ),
    }
}

/// Unpublish all ad-hoc test accessories
pub async fn remove_test_accessories(State(state): State<Arc<AppState>>) -> Response {
    match state.remove_test_accessories().await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to remove accessories: {:#}", e),
        ),
    }
}
