// ── Domain model ──
//
// Typed device records produced by the validator, plus the capability
// bitmask and thermostat setpoint encoding they are built on.

pub mod ain;
pub mod device;
pub mod function;
pub mod thermostat;

pub use ain::Ain;
pub use device::{
    DeviceKind, DeviceRecord, NextChange, PowerMeter, SwitchState, Temperature, ThermostatState,
};
pub use function::{DeviceCategory, FunctionMask};
pub use thermostat::OperationMode;
