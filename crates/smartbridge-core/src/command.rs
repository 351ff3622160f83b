//! Remote command payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::{Capability, MAIN_COMPONENT};

/// One capability-scoped command, as sent in a `POST /devices/{id}/commands` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub component: String,
    pub capability: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
}

impl DeviceCommand {
    /// Command against the main component
    pub fn new(capability: &Capability, command: impl Into<String>) -> Self {
        Self {
            component: MAIN_COMPONENT.to_string(),
            capability: capability.as_str().to_string(),
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }
}
