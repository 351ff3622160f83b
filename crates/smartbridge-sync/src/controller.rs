//! Per-category accessory controllers
//!
//! A controller is built once per accessory per synchronization pass. It
//! fetches a fresh device description, health and status, then attaches one
//! service with handlers for every characteristic the device supports.

use smartbridge_client::{ClientError, DeviceApi};
use smartbridge_core::{supported_bindings, AccessoryCategory, Device, DeviceId};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::accessory::{AccessoryInformation, PlatformAccessory, ServiceKind};
use crate::bridge::{CommandBridge, OfflinePolicy};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Accessory {name} has no device context")]
    MissingContext { name: String },
    #[error("Failed to fetch {what} for {device}: {source}")]
    Fetch {
        device: DeviceId,
        what: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("Device {device} declares no supported category")]
    NoCategory { device: DeviceId },
    #[error("Device {device} has unsupported category {category}")]
    UnsupportedCategory {
        device: DeviceId,
        category: AccessoryCategory,
    },
}

impl ControllerError {
    /// Only fetch failures can clear up on a later pass without the device
    /// description changing
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ControllerError::Fetch { .. })
    }
}

/// Behaviour shared by every category controller
pub trait AccessoryController: Send + Sync {
    fn category(&self) -> AccessoryCategory;

    /// Information service contents
    fn metadata(&self) -> &AccessoryInformation;

    /// Attach the category's service and its characteristic handlers
    fn register_handlers(&self, accessory: &mut PlatformAccessory);
}

/// Inputs handed to a controller factory
pub struct ControllerContext {
    pub device: Device,
    pub bridge: Arc<CommandBridge>,
}

pub type ControllerFactory = fn(ControllerContext) -> Box<dyn AccessoryController>;

/// Controller factory for a category. `None` when the category is recognized
/// but has no controller.
pub fn controller_for(category: AccessoryCategory) -> Option<ControllerFactory> {
    let factory: ControllerFactory = match category {
        AccessoryCategory::Switch => |ctx| Box::new(SwitchController::new(ctx)),
        AccessoryCategory::Light => |ctx| Box::new(LightbulbController::new(ctx)),
        AccessoryCategory::SmartPlug => |ctx| Box::new(OutletController::new(ctx)),
        AccessoryCategory::Fan => |ctx| Box::new(FanController::new(ctx)),
        AccessoryCategory::GarageDoor => return None,
    };
    Some(factory)
}

struct ControllerBase {
    device: Device,
    bridge: Arc<CommandBridge>,
    information: AccessoryInformation,
}

impl ControllerBase {
    fn new(ctx: ControllerContext) -> Self {
        let information = AccessoryInformation {
            manufacturer: ctx.device.manufacturer().to_string(),
            ..AccessoryInformation::default()
        };
        Self {
            device: ctx.device,
            bridge: ctx.bridge,
            information,
        }
    }

    fn register(
        &self,
        accessory: &mut PlatformAccessory,
        category: AccessoryCategory,
        kind: ServiceKind,
    ) {
        let service = accessory.service_mut(kind, self.device.display_name());

        for binding in supported_bindings(category, &self.device.capabilities()) {
            let get_bridge = self.bridge.clone();
            let set_bridge = self.bridge.clone();
            service
                .characteristic(binding.characteristic)
                .on_get(move || {
                    let bridge = get_bridge.clone();
                    async move { bridge.get(binding).await }
                })
                .on_set(move |value| {
                    let bridge = set_bridge.clone();
                    async move { bridge.set(binding, value).await }
                });
        }
    }
}

macro_rules! category_controller {
    ($(#[$meta:meta])* $name:ident, $category:expr, $kind:expr) => {
        $(#[$meta])*
        pub struct $name(ControllerBase);

        impl $name {
            pub fn new(ctx: ControllerContext) -> Self {
                Self(ControllerBase::new(ctx))
            }
        }

        impl AccessoryController for $name {
            fn category(&self) -> AccessoryCategory {
                $category
            }

            fn metadata(&self) -> &AccessoryInformation {
                &self.0.information
            }

            fn register_handlers(&self, accessory: &mut PlatformAccessory) {
                self.0.register(accessory, $category, $kind);
            }
        }
    };
}

category_controller!(
    /// Plain on/off switch
    SwitchController,
    AccessoryCategory::Switch,
    ServiceKind::Switch
);
category_controller!(
    /// Dimmable, color and white-spectrum lights
    LightbulbController,
    AccessoryCategory::Light,
    ServiceKind::Lightbulb
);
category_controller!(OutletController, AccessoryCategory::SmartPlug, ServiceKind::Outlet);
category_controller!(
    /// Fans, with speed driven through `switchLevel`
    FanController,
    AccessoryCategory::Fan,
    ServiceKind::Fan
);

/// Build the controller for an accessory and wire its handlers
///
/// The device, health and status are fetched in that order before anything
/// on the accessory changes. On error the accessory is left as it was.
pub async fn construct(
    api: Arc<dyn DeviceApi>,
    accessory: &mut PlatformAccessory,
    policy: OfflinePolicy,
) -> Result<Box<dyn AccessoryController>, ControllerError> {
    let id = accessory
        .device_id()
        .cloned()
        .ok_or_else(|| ControllerError::MissingContext {
            name: accessory.display_name.clone(),
        })?;

    let fetch = |what: &'static str| {
        let device = id.clone();
        move |source| ControllerError::Fetch { device, what, source }
    };

    let device = api.get_device(&id).await.map_err(fetch("device"))?;
    let health = api.get_health(&id).await.map_err(fetch("health"))?;
    debug!(device = %id, state = ?health.state, "Device health");
    let status = api.get_status(&id).await.map_err(fetch("status"))?;
    debug!(device = %id, components = status.components.len(), "Device status");

    let category = AccessoryCategory::for_device(&device)
        .ok_or_else(|| ControllerError::NoCategory { device: id.clone() })?;
    let factory =
        controller_for(category).ok_or_else(|| ControllerError::UnsupportedCategory {
            device: id.clone(),
            category,
        })?;

    let bridge = Arc::new(CommandBridge::new(
        api,
        id.clone(),
        device.display_name(),
        policy,
    ));

    accessory.context.device = Some(device.clone());
    accessory.remove_service();

    let controller = factory(ControllerContext { device, bridge });
    accessory.information = controller.metadata().clone();
    controller.register_handlers(accessory);

    debug!(
        device = %id,
        category = %controller.category(),
        characteristics = ?accessory.characteristics(),
        "Controller ready"
    );
    Ok(controller)
}
