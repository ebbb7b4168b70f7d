// Thermostat setpoint encoding.
//
// The gateway speaks half-degree units: 16 means 8.0 °C, 56 means 28.0 °C.
// Two out-of-range values are sentinels for "valve closed" and "valve open".

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

pub use fritzly_api::{HKR_OFF as OFF, HKR_ON as ON};

pub const MIN_CELSIUS: f64 = 8.0;
pub const MAX_CELSIUS: f64 = 28.0;

/// Reported target when the valve is closed.
pub const OFF_DISPLAY_CELSIUS: f64 = 0.0;
/// Reported target when the valve is fully open.
pub const ON_DISPLAY_CELSIUS: f64 = 60.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationMode {
    Auto,
    Manual,
    On,
    Off,
    Unknown,
}

impl OperationMode {
    /// Modes a caller may request through `set_operation_mode`.
    pub const SETTABLE: [Self; 3] = [Self::Auto, Self::On, Self::Off];
}

/// Convert a wire setpoint to °C for display.
pub fn display_celsius(half_degrees: u32) -> f64 {
    match half_degrees {
        v if v == u32::from(OFF) => OFF_DISPLAY_CELSIUS,
        v if v == u32::from(ON) => ON_DISPLAY_CELSIUS,
        v => f64::from(v) / 2.0,
    }
}

/// Convert a requested target in °C to the wire value.
///
/// Rejects anything outside 8.0..=28.0 °C, including NaN.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn half_degrees(celsius: f64) -> Result<u8, CoreError> {
    if !(MIN_CELSIUS..=MAX_CELSIUS).contains(&celsius) {
        return Err(CoreError::Validation {
            message: format!(
                "target temperature {celsius} °C outside {MIN_CELSIUS}..={MAX_CELSIUS} °C"
            ),
        });
    }
    Ok((celsius * 2.0).round() as u8)
}
