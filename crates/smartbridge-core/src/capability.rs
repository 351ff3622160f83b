//! Capability table: which characteristics each accessory category exposes,
//! and how each one maps onto remote status attributes and commands.
//!
//! The table is static data. Filtering against a device's capability set is
//! the only operation; an empty binding list means the category has no
//! controller.

use std::ops::RangeInclusive;
use thiserror::Error;

use crate::accessory::{AccessoryCategory, Characteristic, CharacteristicValue};
use crate::command::DeviceCommand;
use crate::convert;
use crate::device::{Capability, CapabilitySet, DeviceStatus};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value {value} for {characteristic}")]
pub struct InvalidValue {
    pub characteristic: Characteristic,
    pub value: CharacteristicValue,
}

/// Brightness, saturation and fan speed, in percent
const PERCENT_RANGE: RangeInclusive<f64> = 0.0..=100.0;
/// Hue in degrees, upper bound exclusive
const HUE_MAX_DEGREES: f64 = 360.0;
/// Color temperature accepted from the host, in mireds
const MIREDS_RANGE: RangeInclusive<f64> = 140.0..=500.0;

pub type ReadFn = fn(&DeviceStatus) -> Option<CharacteristicValue>;
pub type WriteFn = fn(&CharacteristicValue) -> Result<DeviceCommand, InvalidValue>;

/// A characteristic backed by one remote capability
#[derive(Clone)]
pub struct CharacteristicBinding {
    pub characteristic: Characteristic,
    pub capability: Capability,
    /// Registered regardless of the device's declared capabilities
    pub mandatory: bool,
    /// Extracts and converts the current value; `None` when not populated
    pub read: ReadFn,
    /// Builds the remote command for a new value
    pub write: WriteFn,
}

impl std::fmt::Debug for CharacteristicBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacteristicBinding")
            .field("characteristic", &self.characteristic)
            .field("capability", &self.capability)
            .field("mandatory", &self.mandatory)
            .finish_non_exhaustive()
    }
}

impl CharacteristicBinding {
    pub fn is_supported_by(&self, capabilities: &CapabilitySet) -> bool {
        self.mandatory || capabilities.contains(&self.capability)
    }
}

const ON: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::On,
    capability: Capability::Switch,
    mandatory: true,
    read: read_on,
    write: write_on,
};

const BRIGHTNESS: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::Brightness,
    capability: Capability::SwitchLevel,
    mandatory: false,
    read: read_level,
    write: write_brightness,
};

const HUE: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::Hue,
    capability: Capability::ColorControl,
    mandatory: false,
    read: read_hue,
    write: write_hue,
};

const SATURATION: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::Saturation,
    capability: Capability::ColorControl,
    mandatory: false,
    read: read_saturation,
    write: write_saturation,
};

const COLOR_TEMPERATURE: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::ColorTemperature,
    capability: Capability::ColorTemperature,
    mandatory: false,
    read: read_color_temperature,
    write: write_color_temperature,
};

const ROTATION_SPEED: CharacteristicBinding = CharacteristicBinding {
    characteristic: Characteristic::RotationSpeed,
    capability: Capability::SwitchLevel,
    mandatory: false,
    read: read_level,
    write: write_rotation_speed,
};

static SWITCH_BINDINGS: [CharacteristicBinding; 1] = [ON];
static LIGHT_BINDINGS: [CharacteristicBinding; 5] =
    [ON, BRIGHTNESS, HUE, SATURATION, COLOR_TEMPERATURE];
static PLUG_BINDINGS: [CharacteristicBinding; 1] = [ON];
static FAN_BINDINGS: [CharacteristicBinding; 2] = [ON, ROTATION_SPEED];

/// Ordered bindings to attempt for a category
pub fn bindings(category: AccessoryCategory) -> &'static [CharacteristicBinding] {
    match category {
        AccessoryCategory::Switch => &SWITCH_BINDINGS,
        AccessoryCategory::Light => &LIGHT_BINDINGS,
        AccessoryCategory::SmartPlug => &PLUG_BINDINGS,
        AccessoryCategory::Fan => &FAN_BINDINGS,
        AccessoryCategory::GarageDoor => &[],
    }
}

/// Bindings for a category whose capability the device declares
pub fn supported_bindings(
    category: AccessoryCategory,
    capabilities: &CapabilitySet,
) -> Vec<&'static CharacteristicBinding> {
    bindings(category)
        .iter()
        .filter(|b| b.is_supported_by(capabilities))
        .collect()
}

fn read_on(status: &DeviceStatus) -> Option<CharacteristicValue> {
    status
        .main_value("switch", "switch")
        .map(|v| CharacteristicValue::Int(convert::switch_value_to_on(v)))
}

fn write_on(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    Ok(DeviceCommand::new(
        &Capability::Switch,
        convert::on_command(value.as_bool()),
    ))
}

fn read_level(status: &DeviceStatus) -> Option<CharacteristicValue> {
    status
        .main_value("switchLevel", "level")
        .and_then(convert::value_as_i64)
        .map(CharacteristicValue::Int)
}

fn invalid(characteristic: Characteristic, value: &CharacteristicValue) -> InvalidValue {
    InvalidValue {
        characteristic,
        value: *value,
    }
}

/// Numeric value of a write, rejected unless `accept` holds for it
fn numeric(
    characteristic: Characteristic,
    value: &CharacteristicValue,
    accept: impl Fn(f64) -> bool,
) -> Result<f64, InvalidValue> {
    value
        .as_f64()
        .filter(|v| accept(*v))
        .ok_or_else(|| invalid(characteristic, value))
}

fn set_level(
    characteristic: Characteristic,
    value: &CharacteristicValue,
) -> Result<DeviceCommand, InvalidValue> {
    numeric(characteristic, value, |v| PERCENT_RANGE.contains(&v))?;
    let level = value
        .as_i64()
        .ok_or_else(|| invalid(characteristic, value))?;
    Ok(DeviceCommand::new(&Capability::SwitchLevel, "setLevel").with_argument(level))
}

fn write_brightness(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    set_level(Characteristic::Brightness, value)
}

fn write_rotation_speed(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    set_level(Characteristic::RotationSpeed, value)
}

fn read_hue(status: &DeviceStatus) -> Option<CharacteristicValue> {
    status
        .main_value("colorControl", "hue")
        .and_then(|v| v.as_f64())
        .map(|p| CharacteristicValue::Float(convert::hue_percent_to_degrees(p)))
}

fn write_hue(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    let degrees = numeric(Characteristic::Hue, value, |v| {
        (0.0..HUE_MAX_DEGREES).contains(&v)
    })?;
    Ok(DeviceCommand::new(&Capability::ColorControl, "setHue")
        .with_argument(convert::hue_degrees_to_percent(degrees)))
}

fn read_saturation(status: &DeviceStatus) -> Option<CharacteristicValue> {
    status
        .main_value("colorControl", "saturation")
        .and_then(|v| v.as_f64())
        .map(CharacteristicValue::Float)
}

fn write_saturation(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    let saturation = numeric(Characteristic::Saturation, value, |v| {
        PERCENT_RANGE.contains(&v)
    })?;
    Ok(DeviceCommand::new(&Capability::ColorControl, "setSaturation").with_argument(saturation))
}

fn read_color_temperature(status: &DeviceStatus) -> Option<CharacteristicValue> {
    status
        .main_value("colorTemperature", "colorTemperature")
        .and_then(|v| v.as_f64())
        .and_then(convert::kelvin_to_mireds)
        .map(CharacteristicValue::Int)
}

fn write_color_temperature(value: &CharacteristicValue) -> Result<DeviceCommand, InvalidValue> {
    let mireds = numeric(Characteristic::ColorTemperature, value, |v| {
        MIREDS_RANGE.contains(&v)
    })?;
    let kelvin = convert::mireds_to_kelvin(mireds)
        .ok_or_else(|| invalid(Characteristic::ColorTemperature, value))?;
    Ok(DeviceCommand::new(&Capability::ColorTemperature, "setColorTemperature")
        .with_argument(kelvin))
}
