//! Remote device types as reported by the SmartThings API

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Component every status path and command targets
pub const MAIN_COMPONENT: &str = "main";

/// Remote-assigned device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of remote-controllable functionality
///
/// Identifiers outside the known set are kept as `Unknown` so they survive a
/// round trip through the accessory cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    Switch,
    SwitchLevel,
    ColorControl,
    ColorTemperature,
    Unknown(String),
}

impl Capability {
    pub fn as_str(&self) -> &str {
        match self {
            Capability::Switch => "switch",
            Capability::SwitchLevel => "switchLevel",
            Capability::ColorControl => "colorControl",
            Capability::ColorTemperature => "colorTemperature",
            Capability::Unknown(id) => id,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Capability::Unknown(_))
    }
}

impl From<&str> for Capability {
    fn from(id: &str) -> Self {
        match id {
            "switch" => Capability::Switch,
            "switchLevel" => Capability::SwitchLevel,
            "colorControl" => Capability::ColorControl,
            "colorTemperature" => Capability::ColorTemperature,
            other => Capability::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Capability {
    fn from(id: String) -> Self {
        Capability::from(id.as_str())
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.as_str().to_string()
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of capabilities declared by a component. Membership is the only query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(HashSet<Capability>);

impl CapabilitySet {
    pub fn contains(&self, capability: &Capability) -> bool {
        self.0.contains(capability)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityReference {
    pub id: Capability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_type: Option<String>,
}

/// A functional part of a device. The first component is the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityReference>,
    #[serde(default)]
    pub categories: Vec<CategoryReference>,
}

/// A remote device. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Device {
    pub fn id(&self) -> &DeviceId {
        &self.device_id
    }

    /// User-facing name: label, then name, then the raw id
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(self.device_id.as_str())
    }

    pub fn manufacturer(&self) -> &str {
        self.manufacturer_name.as_deref().unwrap_or("Unknown")
    }

    pub fn primary_component(&self) -> Option<&Component> {
        self.components.first()
    }

    /// Capabilities of the primary component
    pub fn capabilities(&self) -> CapabilitySet {
        self.primary_component()
            .map(|c| c.capabilities.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Category names of the primary component, in declared order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.primary_component()
            .into_iter()
            .flat_map(|c| c.categories.iter().map(|cat| cat.name.as_str()))
    }
}

/// Reachability as reported by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    Online,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(default)]
    pub state: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date: Option<String>,
}

impl DeviceHealth {
    pub fn new(state: HealthState) -> Self {
        Self {
            device_id: None,
            state,
            last_updated_date: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state == HealthState::Online
    }
}

/// Current value of one attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeState {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

pub type CapabilityStatus = HashMap<String, AttributeState>;
pub type ComponentStatus = HashMap<String, CapabilityStatus>;

/// component -> capability -> attribute -> state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default)]
    pub components: HashMap<String, ComponentStatus>,
}

impl DeviceStatus {
    /// Look up a populated attribute value. `null` counts as absent.
    pub fn value(
        &self,
        component: &str,
        capability: &str,
        attribute: &str,
    ) -> Option<&serde_json::Value> {
        self.components
            .get(component)?
            .get(capability)?
            .get(attribute)?
            .value
            .as_ref()
            .filter(|v| !v.is_null())
    }

    /// Attribute value on the main component
    pub fn main_value(&self, capability: &str, attribute: &str) -> Option<&serde_json::Value> {
        self.value(MAIN_COMPONENT, capability, attribute)
    }

    pub fn set_value(
        &mut self,
        component: &str,
        capability: &str,
        attribute: &str,
        value: serde_json::Value,
    ) {
        self.components
            .entry(component.to_string())
            .or_default()
            .entry(capability.to_string())
            .or_default()
            .insert(
                attribute.to_string(),
                AttributeState {
                    value: Some(value),
                    ..Default::default()
                },
            );
    }

    /// Builder form of [`DeviceStatus::set_value`] on the main component
    pub fn with_main(
        mut self,
        capability: &str,
        attribute: &str,
        value: serde_json::Value,
    ) -> Self {
        self.set_value(MAIN_COMPONENT, capability, attribute, value);
        self
    }
}
