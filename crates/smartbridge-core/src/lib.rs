//! SmartBridge Core - Core types, capability table, and unit conversions
//!
//! This crate provides the foundational types for the SmartBridge system:
//! - Remote device model (devices, components, capabilities, health, status)
//! - Accessory categories, characteristics, and the cached accessory record
//! - The capability table mapping characteristics onto remote capabilities
//! - Unit conversions between the accessory and remote value domains

pub mod accessory;
pub mod capability;
pub mod command;
pub mod convert;
pub mod device;

pub use accessory::{
    accessory_uuid, AccessoryCategory, AccessoryContext, AccessoryRecord, Characteristic,
    CharacteristicValue, UnknownCharacteristic,
};
pub use capability::{bindings, supported_bindings, CharacteristicBinding, InvalidValue};
pub use command::DeviceCommand;
pub use device::{
    AttributeState, Capability, CapabilitySet, Component, Device, DeviceHealth, DeviceId,
    DeviceStatus, HealthState, MAIN_COMPONENT,
};
