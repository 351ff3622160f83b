//! SmartBridge Client - SmartThings device API access
//!
//! This crate defines the device-management operations the bridge depends on
//! and an HTTP client implementing them.

pub mod api;
pub mod http;

pub use api::{ClientError, CommandAck, CommandResult, DeviceApi};
pub use http::{SmartThingsClient, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
