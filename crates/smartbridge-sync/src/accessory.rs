//! Host-side accessory placeholder and its characteristic handlers

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use smartbridge_core::{
    AccessoryContext, AccessoryRecord, Characteristic, CharacteristicValue, Device, DeviceId,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Status delivered to the host when a characteristic operation fails
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HapStatusError {
    #[error("service communication failure")]
    ServiceCommunicationFailure,
    #[error("resource does not exist")]
    ResourceDoesNotExist,
    #[error("invalid value in request")]
    InvalidValueInRequest,
}

impl HapStatusError {
    /// HAP status code
    pub fn code(&self) -> i32 {
        match self {
            HapStatusError::ServiceCommunicationFailure => -70402,
            HapStatusError::ResourceDoesNotExist => -70409,
            HapStatusError::InvalidValueInRequest => -70410,
        }
    }
}

pub type GetHandler = Arc<
    dyn Fn() -> BoxFuture<'static, Result<CharacteristicValue, HapStatusError>> + Send + Sync,
>;
pub type SetHandler = Arc<
    dyn Fn(CharacteristicValue) -> BoxFuture<'static, Result<(), HapStatusError>> + Send + Sync,
>;

/// Read/write handlers attached to one characteristic
#[derive(Clone, Default)]
pub struct CharacteristicHandlers {
    get: Option<GetHandler>,
    set: Option<SetHandler>,
}

impl CharacteristicHandlers {
    pub fn on_get<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CharacteristicValue, HapStatusError>> + Send + 'static,
    {
        self.get = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn on_set<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(CharacteristicValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HapStatusError>> + Send + 'static,
    {
        self.set = Some(Arc::new(move |value| handler(value).boxed()));
        self
    }
}

/// Host service types the controllers publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    Switch,
    Lightbulb,
    Outlet,
    Fan,
}

#[derive(Clone)]
pub struct Service {
    pub kind: ServiceKind,
    pub name: String,
    characteristics: BTreeMap<Characteristic, CharacteristicHandlers>,
}

impl Service {
    pub fn new(kind: ServiceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            characteristics: BTreeMap::new(),
        }
    }

    /// Handlers for a characteristic, adding it to the service if needed
    pub fn characteristic(
        &mut self,
        characteristic: Characteristic,
    ) -> &mut CharacteristicHandlers {
        self.characteristics.entry(characteristic).or_default()
    }

    pub fn characteristics(&self) -> impl Iterator<Item = Characteristic> + '_ {
        self.characteristics.keys().copied()
    }

    fn handlers(&self, characteristic: Characteristic) -> Option<&CharacteristicHandlers> {
        self.characteristics.get(&characteristic)
    }
}

/// Manufacturer/model/serial triple shown by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

impl Default for AccessoryInformation {
    fn default() -> Self {
        Self {
            manufacturer: "Default-Manufacturer".to_string(),
            model: "Default-Model".to_string(),
            serial_number: "Default-Serial".to_string(),
        }
    }
}

/// An accessory as the host sees it: identity, cached device context,
/// descriptive metadata, and at most one controllable service
#[derive(Clone)]
pub struct PlatformAccessory {
    pub uuid: Uuid,
    pub display_name: String,
    pub context: AccessoryContext,
    pub information: AccessoryInformation,
    service: Option<Service>,
}

impl PlatformAccessory {
    pub fn new(display_name: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            context: AccessoryContext { device: None },
            information: AccessoryInformation::default(),
            service: None,
        }
    }

    /// Fresh placeholder keyed by the device id, carrying the device as context
    pub fn for_device(device: Device) -> Self {
        Self::from_record(AccessoryRecord::for_device(device))
    }

    /// Rebuild a placeholder from the host's cache. Handlers are not cached.
    pub fn from_record(record: AccessoryRecord) -> Self {
        Self {
            uuid: record.uuid,
            display_name: record.display_name,
            context: record.context,
            information: AccessoryInformation::default(),
            service: None,
        }
    }

    pub fn to_record(&self) -> AccessoryRecord {
        AccessoryRecord {
            uuid: self.uuid,
            display_name: self.display_name.clone(),
            context: self.context.clone(),
        }
    }

    pub fn device(&self) -> Option<&Device> {
        self.context.device.as_ref()
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device().map(|d| d.id())
    }

    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    /// The service of the given kind, replacing any service of another kind
    pub fn service_mut(&mut self, kind: ServiceKind, name: &str) -> &mut Service {
        if !matches!(self.service, Some(ref s) if s.kind == kind) {
            self.service = Some(Service::new(kind, name));
        }
        let service = self.service.get_or_insert_with(|| Service::new(kind, name));
        service.name = name.to_string();
        service
    }

    /// Drop the service and all its handlers
    pub fn remove_service(&mut self) {
        self.service = None;
    }

    pub fn characteristics(&self) -> Vec<Characteristic> {
        self.service
            .as_ref()
            .map(|s| s.characteristics().collect())
            .unwrap_or_default()
    }

    fn handlers(&self, characteristic: Characteristic) -> Option<&CharacteristicHandlers> {
        self.service.as_ref()?.handlers(characteristic)
    }

    /// Deliver a host read event
    pub async fn read(
        &self,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, HapStatusError> {
        let handler = self
            .handlers(characteristic)
            .and_then(|h| h.get.clone())
            .ok_or(HapStatusError::ResourceDoesNotExist)?;
        handler().await
    }

    /// Deliver a host write event
    pub async fn write(
        &self,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), HapStatusError> {
        let handler = self
            .handlers(characteristic)
            .and_then(|h| h.set.clone())
            .ok_or(HapStatusError::ResourceDoesNotExist)?;
        handler(value).await
    }
}

impl std::fmt::Debug for PlatformAccessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformAccessory")
            .field("uuid", &self.uuid)
            .field("display_name", &self.display_name)
            .field("device_id", &self.device_id())
            .field("service", &self.service.as_ref().map(|s| s.kind))
            .field("characteristics", &self.characteristics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartbridge_core::accessory_uuid;

    #[tokio::test]
    async fn test_read_write_dispatch() {
        let mut accessory = PlatformAccessory::new("Test Light", accessory_uuid("test"));
        accessory
            .service_mut(ServiceKind::Lightbulb, "Test Light")
            .characteristic(Characteristic::On)
            .on_get(|| async { Ok(CharacteristicValue::Int(1)) })
            .on_set(|value| async move {
                if value.as_bool() {
                    Ok(())
                } else {
                    Err(HapStatusError::ServiceCommunicationFailure)
                }
            });

        assert_eq!(
            accessory.read(Characteristic::On).await,
            Ok(CharacteristicValue::Int(1))
        );
        assert_eq!(
            accessory
                .write(Characteristic::On, CharacteristicValue::Bool(true))
                .await,
            Ok(())
        );
        assert_eq!(
            accessory
                .write(Characteristic::On, CharacteristicValue::Bool(false))
                .await,
            Err(HapStatusError::ServiceCommunicationFailure)
        );
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let mut accessory = PlatformAccessory::new("Plain", accessory_uuid("plain"));
        assert_eq!(
            accessory.read(Characteristic::On).await,
            Err(HapStatusError::ResourceDoesNotExist)
        );

        accessory
            .service_mut(ServiceKind::Switch, "Plain")
            .characteristic(Characteristic::On)
            .on_get(|| async { Ok(CharacteristicValue::Int(0)) });
        assert_eq!(
            accessory
                .write(Characteristic::On, CharacteristicValue::Bool(true))
                .await,
            Err(HapStatusError::ResourceDoesNotExist)
        );
        assert_eq!(
            accessory.read(Characteristic::Hue).await,
            Err(HapStatusError::ResourceDoesNotExist)
        );
    }

    #[test]
    fn test_service_replaced_on_kind_change() {
        let mut accessory = PlatformAccessory::new("Thing", accessory_uuid("thing"));
        accessory
            .service_mut(ServiceKind::Switch, "Thing")
            .characteristic(Characteristic::On);
        accessory.service_mut(ServiceKind::Fan, "Thing");
        assert_eq!(accessory.service().map(|s| s.kind), Some(ServiceKind::Fan));
        assert!(accessory.characteristics().is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HapStatusError::ServiceCommunicationFailure.code(), -70402);
        assert_eq!(HapStatusError::InvalidValueInRequest.code(), -70410);
    }
}
