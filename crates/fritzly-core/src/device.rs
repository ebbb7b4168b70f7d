// ── Capability actors ──
//
// Thin handles over the controller that expose one device through a
// capability trait. Reads come from the registry cache and never hit the
// network; writes go through `Controller::execute`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{Command, CommandResult};
use crate::controller::Controller;
use crate::error::CoreError;
use crate::model::thermostat::{MAX_CELSIUS, MIN_CELSIUS};
use crate::model::{Ain, DeviceRecord, OperationMode};

/// A device that can be switched on and off.
#[async_trait]
pub trait Switchable: Send + Sync {
    fn ain(&self) -> &Ain;

    fn is_on(&self) -> Option<bool>;

    /// Current draw in watts.
    fn current_power_w(&self) -> Option<f64>;

    /// Energy counter in kilowatt-hours.
    fn total_energy_kwh(&self) -> Option<f64>;

    async fn turn_on(&self) -> Result<(), CoreError>;

    async fn turn_off(&self) -> Result<(), CoreError>;

    /// Flip the switch and return the state the gateway reports.
    async fn toggle(&self) -> Result<bool, CoreError>;
}

/// A radiator controller.
#[async_trait]
pub trait Thermostat: Send + Sync {
    fn ain(&self) -> &Ain;

    fn current_operation(&self) -> OperationMode;

    fn target_temperature(&self) -> Option<f64>;

    fn current_temperature(&self) -> Option<f64>;

    fn comfort_temperature(&self) -> Option<f64>;

    fn economy_temperature(&self) -> Option<f64>;

    fn min_temp(&self) -> f64 {
        MIN_CELSIUS
    }

    fn max_temp(&self) -> f64 {
        MAX_CELSIUS
    }

    fn operation_list(&self) -> &'static [OperationMode] {
        &OperationMode::SETTABLE
    }

    async fn set_target_temperature(&self, celsius: f64) -> Result<(), CoreError>;

    async fn set_operation_mode(&self, mode: OperationMode) -> Result<(), CoreError>;
}

// ── Shared actor plumbing ────────────────────────────────────────

#[derive(Clone)]
struct Actor {
    controller: Controller,
    ain: Ain,
}

impl Actor {
    fn record(&self) -> Option<Arc<DeviceRecord>> {
        self.controller.registry().record(self.ain.as_str())
    }

    fn available(&self) -> bool {
        self.record().is_some_and(|r| r.present)
    }

    fn attributes(&self) -> BTreeMap<&'static str, String> {
        self.record().map(|r| r.attributes()).unwrap_or_default()
    }
}

// ── SwitchActor ──────────────────────────────────────────────────

/// [`Switchable`] handle for one outlet.
#[derive(Clone)]
pub struct SwitchActor(Actor);

impl SwitchActor {
    pub(crate) fn new(controller: Controller, ain: Ain) -> Self {
        Self(Actor { controller, ain })
    }

    pub fn name(&self) -> Option<String> {
        self.0.record().map(|r| r.name.clone())
    }

    pub fn available(&self) -> bool {
        self.0.available()
    }

    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        self.0.attributes()
    }
}

#[async_trait]
impl Switchable for SwitchActor {
    fn ain(&self) -> &Ain {
        &self.0.ain
    }

    fn is_on(&self) -> Option<bool> {
        self.0.record().and_then(|r| r.is_on())
    }

    fn current_power_w(&self) -> Option<f64> {
        self.0
            .record()
            .and_then(|r| r.power_meter().and_then(|p| p.current_power_w()))
    }

    fn total_energy_kwh(&self) -> Option<f64> {
        self.0
            .record()
            .and_then(|r| r.power_meter().and_then(|p| p.total_energy_kwh()))
    }

    async fn turn_on(&self) -> Result<(), CoreError> {
        self.0
            .controller
            .execute(Command::TurnOn {
                ain: self.0.ain.clone(),
            })
            .await
            .map(drop)
    }

    async fn turn_off(&self) -> Result<(), CoreError> {
        self.0
            .controller
            .execute(Command::TurnOff {
                ain: self.0.ain.clone(),
            })
            .await
            .map(drop)
    }

    async fn toggle(&self) -> Result<bool, CoreError> {
        let result = self
            .0
            .controller
            .execute(Command::Toggle {
                ain: self.0.ain.clone(),
            })
            .await?;
        match result {
            CommandResult::Switched(on) => Ok(on),
            other => Err(CoreError::Internal(format!(
                "toggle returned unexpected result {other:?}"
            ))),
        }
    }
}

// ── ThermostatActor ──────────────────────────────────────────────

/// [`Thermostat`] handle for one radiator controller.
#[derive(Clone)]
pub struct ThermostatActor(Actor);

impl ThermostatActor {
    pub(crate) fn new(controller: Controller, ain: Ain) -> Self {
        Self(Actor { controller, ain })
    }

    pub fn name(&self) -> Option<String> {
        self.0.record().map(|r| r.name.clone())
    }

    pub fn available(&self) -> bool {
        self.0.available()
    }

    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        self.0.attributes()
    }
}

#[async_trait]
impl Thermostat for ThermostatActor {
    fn ain(&self) -> &Ain {
        &self.0.ain
    }

    fn current_operation(&self) -> OperationMode {
        self.0
            .record()
            .and_then(|r| r.current_operation())
            .unwrap_or(OperationMode::Unknown)
    }

    fn target_temperature(&self) -> Option<f64> {
        self.0
            .record()
            .and_then(|r| r.hkr().and_then(|h| h.target_temperature()))
    }

    fn current_temperature(&self) -> Option<f64> {
        self.0.record().and_then(|r| r.current_temperature())
    }

    fn comfort_temperature(&self) -> Option<f64> {
        self.0
            .record()
            .and_then(|r| r.hkr().and_then(|h| h.comfort_temperature()))
    }

    fn economy_temperature(&self) -> Option<f64> {
        self.0
            .record()
            .and_then(|r| r.hkr().and_then(|h| h.economy_temperature()))
    }

    async fn set_target_temperature(&self, celsius: f64) -> Result<(), CoreError> {
        self.0
            .controller
            .execute(Command::SetTargetTemperature {
                ain: self.0.ain.clone(),
                celsius,
            })
            .await
            .map(drop)
    }

    async fn set_operation_mode(&self, mode: OperationMode) -> Result<(), CoreError> {
        self.0
            .controller
            .execute(Command::SetOperationMode {
                ain: self.0.ain.clone(),
                mode,
            })
            .await
            .map(drop)
    }
}
