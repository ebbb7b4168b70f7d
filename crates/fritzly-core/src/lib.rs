// fritzly-core: Device registry, poll loop and command facade between fritzly-api and hosts.

pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod hooks;
pub mod model;
pub mod store;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{GatewayConfig, TlsVerification, gateway_url};
pub use controller::{ConnectionState, Controller, login_backoff};
pub use device::{SwitchActor, Switchable, Thermostat, ThermostatActor};
pub use error::CoreError;
pub use hooks::{DeviceHandler, DiscoveryHook, NoopDiscovery};
pub use store::{CycleReport, Registry, RegistryEntry, reconcile};
pub use validate::{ValidationError, classify, parse_record, validate};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Ain, DeviceCategory, DeviceKind, DeviceRecord, FunctionMask, NextChange, OperationMode,
    PowerMeter, SwitchState, Temperature, ThermostatState,
};
