//! Accessory-side types: categories, characteristics, and the cached record

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::device::{Device, DeviceId};

/// Device categories the bridge knows how to map to an accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessoryCategory {
    Switch,
    Light,
    SmartPlug,
    Fan,
    GarageDoor,
}

impl AccessoryCategory {
    /// Precedence order used when a device declares several categories
    pub const ALL: [AccessoryCategory; 5] = [
        AccessoryCategory::Switch,
        AccessoryCategory::Light,
        AccessoryCategory::SmartPlug,
        AccessoryCategory::Fan,
        AccessoryCategory::GarageDoor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AccessoryCategory::Switch => "Switch",
            AccessoryCategory::Light => "Light",
            AccessoryCategory::SmartPlug => "SmartPlug",
            AccessoryCategory::Fan => "Fan",
            AccessoryCategory::GarageDoor => "GarageDoor",
        }
    }

    /// First supported category, in precedence order, declared by the
    /// device's primary component
    pub fn for_device(device: &Device) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| device.category_names().any(|n| n == category.name()))
    }
}

impl std::fmt::Display for AccessoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A controllable or readable property exposed to the end user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Characteristic {
    On,
    Brightness,
    Hue,
    Saturation,
    ColorTemperature,
    RotationSpeed,
}

impl Characteristic {
    pub fn name(&self) -> &'static str {
        match self {
            Characteristic::On => "On",
            Characteristic::Brightness => "Brightness",
            Characteristic::Hue => "Hue",
            Characteristic::Saturation => "Saturation",
            Characteristic::ColorTemperature => "ColorTemperature",
            Characteristic::RotationSpeed => "RotationSpeed",
        }
    }
}

impl std::fmt::Display for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown characteristic: {0}")]
pub struct UnknownCharacteristic(pub String);

impl FromStr for Characteristic {
    type Err = UnknownCharacteristic;

    /// Accepts the display name in any case, plus the kebab/snake forms used in URLs
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "on" => Ok(Characteristic::On),
            "brightness" => Ok(Characteristic::Brightness),
            "hue" => Ok(Characteristic::Hue),
            "saturation" => Ok(Characteristic::Saturation),
            "colortemperature" => Ok(Characteristic::ColorTemperature),
            "rotationspeed" => Ok(Characteristic::RotationSpeed),
            _ => Err(UnknownCharacteristic(s.to_string())),
        }
    }
}

/// Value carried by a characteristic read or write
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CharacteristicValue {
    /// Truthiness the way the accessory host treats On writes (1/0 or bool)
    pub fn as_bool(&self) -> bool {
        match *self {
            CharacteristicValue::Bool(b) => b,
            CharacteristicValue::Int(n) => n != 0,
            CharacteristicValue::Float(f) => f != 0.0,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            CharacteristicValue::Bool(_) => None,
            CharacteristicValue::Int(n) => Some(n as f64),
            CharacteristicValue::Float(f) => Some(f),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            CharacteristicValue::Bool(_) => None,
            CharacteristicValue::Int(n) => Some(n),
            CharacteristicValue::Float(f) => Some(f.round() as i64),
        }
    }
}

impl std::fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharacteristicValue::Bool(b) => write!(f, "{}", b),
            CharacteristicValue::Int(n) => write!(f, "{}", n),
            CharacteristicValue::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(b: bool) -> Self {
        CharacteristicValue::Bool(b)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(n: i64) -> Self {
        CharacteristicValue::Int(n)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(x: f64) -> Self {
        CharacteristicValue::Float(x)
    }
}

/// Namespace for accessory UUIDs, so the same device always maps to the same accessory
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1f_2a4e_9c3b_4d0e_8b7a_5e2c_1d3f_4a6b);

/// Stable accessory UUID for a device id
pub fn accessory_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, id.as_bytes())
}

/// Denormalized device copy kept on the accessory so the controller can be
/// rebuilt after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
}

/// Cached representation of one accessory, keyed by device id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryRecord {
    pub uuid: Uuid,
    pub display_name: String,
    pub context: AccessoryContext,
}

impl AccessoryRecord {
    pub fn for_device(device: Device) -> Self {
        Self {
            uuid: accessory_uuid(device.id().as_str()),
            display_name: device.display_name().to_string(),
            context: AccessoryContext {
                device: Some(device),
            },
        }
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.context.device.as_ref().map(|d| d.id())
    }
}
