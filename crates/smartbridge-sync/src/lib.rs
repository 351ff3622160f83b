//! SmartBridge Sync - device synchronization and characteristic bridging
//!
//! This crate provides:
//! - The host-side accessory model and the host boundary trait
//! - A health gate and command/status bridge per device
//! - Category controllers that wire characteristic handlers
//! - The synchronizer that reconciles remote devices with published accessories

pub mod accessory;
pub mod bridge;
pub mod controller;
pub mod health;
pub mod host;
pub mod synchronizer;

#[cfg(test)]
mod test_support;

pub use accessory::{
    AccessoryInformation, CharacteristicHandlers, HapStatusError, PlatformAccessory, Service,
    ServiceKind,
};
pub use bridge::{CommandBridge, OfflinePolicy};
pub use controller::{
    construct, controller_for, AccessoryController, ControllerContext, ControllerError,
    ControllerFactory,
};
pub use health::HealthGate;
pub use host::{AccessoryHost, PluginIdentity};
pub use synchronizer::{AccessoryRegistry, DeviceSynchronizer, SyncError, SyncFailure, SyncReport};
