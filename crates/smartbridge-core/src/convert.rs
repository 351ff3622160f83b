//! Unit conversions between accessory and remote value domains

use serde_json::Value;

/// `true` -> "on", `false` -> "off"
pub fn on_command(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Remote switch value to the accessory's 1/0. Anything other than "on" is off.
pub fn switch_value_to_on(value: &Value) -> i64 {
    if value.as_str() == Some("on") {
        1
    } else {
        0
    }
}

/// Hue in degrees [0, 360) to the remote percent domain [0, 100)
pub fn hue_degrees_to_percent(degrees: f64) -> f64 {
    degrees / 360.0 * 100.0
}

/// Remote hue percent [0, 100) to degrees [0, 360)
pub fn hue_percent_to_degrees(percent: f64) -> f64 {
    percent / 100.0 * 360.0
}

/// round(1_000_000 / x). The formula is its own inverse, so it converts
/// mireds to Kelvin and Kelvin to mireds alike. `None` for non-positive input.
fn reciprocal_mega(x: f64) -> Option<i64> {
    if x.is_finite() && x > 0.0 {
        Some((1_000_000.0 / x).round() as i64)
    } else {
        None
    }
}

pub fn mireds_to_kelvin(mireds: f64) -> Option<i64> {
    reciprocal_mega(mireds)
}

pub fn kelvin_to_mireds(kelvin: f64) -> Option<i64> {
    reciprocal_mega(kelvin)
}

/// Numeric status value as an integer, rounding fractional values
pub fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}
