// ── Device domain types ──
//
// A validated, typed snapshot of one `<device>` element. Records are
// produced only by the validator; the reconciler replaces them wholesale
// on every poll, and the command facade patches single fields after a
// successful write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ain::Ain;
use super::function::{DeviceCategory, FunctionMask};
use super::thermostat::{self, OperationMode};

/// One device as last seen by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ain: Ain,
    pub id: u32,
    pub function_mask: FunctionMask,
    pub fw_version: String,
    pub manufacturer: String,
    pub product_name: String,
    pub present: bool,
    pub name: String,
    #[serde(flatten)]
    pub kind: DeviceKind,
}

/// Shape of a device, decided once at discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceKind {
    Generic {
        temperature: Option<Temperature>,
    },
    Switch {
        switch: SwitchState,
        power_meter: PowerMeter,
        temperature: Option<Temperature>,
    },
    Thermostat {
        temperature: Temperature,
        hkr: ThermostatState,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    pub state: Option<bool>,
    pub mode: Option<String>,
    pub lock: Option<bool>,
    pub device_lock: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerMeter {
    /// Current draw in milliwatts.
    pub power_mw: Option<u32>,
    /// Energy since the counter was last reset, in watt-hours.
    pub energy_wh: Option<u32>,
}

/// Temperature sensor reading in tenths of a degree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperature {
    pub celsius_tenths: Option<i32>,
    pub offset_tenths: Option<i32>,
}

/// Radiator controller state. Setpoints are in half-degree units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatState {
    pub tist: Option<u32>,
    pub tsoll: Option<u32>,
    pub absenk: Option<u32>,
    pub komfort: Option<u32>,
    pub lock: Option<u32>,
    pub device_lock: Option<u32>,
    pub error_code: Option<u32>,
    pub battery_low: Option<u32>,
    pub next_change: Option<NextChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextChange {
    /// Unix timestamp of the next scheduled setpoint change.
    pub end_period: Option<u64>,
    /// Setpoint after that change, in half-degree units.
    pub tchange: Option<u32>,
}

impl Temperature {
    pub fn celsius(&self) -> Option<f64> {
        self.celsius_tenths.map(|t| f64::from(t) / 10.0)
    }
}

impl PowerMeter {
    pub fn current_power_w(&self) -> Option<f64> {
        self.power_mw.map(|mw| f64::from(mw) / 1000.0)
    }

    pub fn total_energy_kwh(&self) -> Option<f64> {
        self.energy_wh.map(|wh| f64::from(wh) / 1000.0)
    }
}

impl ThermostatState {
    /// Operation mode derived from the setpoint and the device's presence.
    ///
    /// The off/on sentinels are checked before the schedule comparison, so
    /// a device whose comfort setpoint happens to be 253 still reads `off`.
    pub fn current_operation(&self, present: bool) -> OperationMode {
        if !present {
            return OperationMode::Unknown;
        }
        let Some(tsoll) = self.tsoll else {
            return OperationMode::Unknown;
        };
        match tsoll {
            t if t == u32::from(thermostat::OFF) => OperationMode::Off,
            t if t == u32::from(thermostat::ON) => OperationMode::On,
            t if Some(t) == self.komfort || Some(t) == self.absenk => OperationMode::Auto,
            _ => OperationMode::Manual,
        }
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.tsoll.map(thermostat::display_celsius)
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.tist.map(thermostat::display_celsius)
    }

    pub fn comfort_temperature(&self) -> Option<f64> {
        self.komfort.map(thermostat::display_celsius)
    }

    pub fn economy_temperature(&self) -> Option<f64> {
        self.absenk.map(thermostat::display_celsius)
    }
}

impl DeviceRecord {
    pub fn category(&self) -> DeviceCategory {
        match self.kind {
            DeviceKind::Generic { .. } => DeviceCategory::Generic,
            DeviceKind::Switch { .. } => DeviceCategory::Switch,
            DeviceKind::Thermostat { .. } => DeviceCategory::Thermostat,
        }
    }

    pub fn temperature(&self) -> Option<&Temperature> {
        match &self.kind {
            DeviceKind::Generic { temperature } | DeviceKind::Switch { temperature, .. } => {
                temperature.as_ref()
            }
            DeviceKind::Thermostat { temperature, .. } => Some(temperature),
        }
    }

    pub fn switch(&self) -> Option<&SwitchState> {
        match &self.kind {
            DeviceKind::Switch { switch, .. } => Some(switch),
            _ => None,
        }
    }

    pub fn switch_mut(&mut self) -> Option<&mut SwitchState> {
        match &mut self.kind {
            DeviceKind::Switch { switch, .. } => Some(switch),
            _ => None,
        }
    }

    pub fn power_meter(&self) -> Option<&PowerMeter> {
        match &self.kind {
            DeviceKind::Switch { power_meter, .. } => Some(power_meter),
            _ => None,
        }
    }

    pub fn hkr(&self) -> Option<&ThermostatState> {
        match &self.kind {
            DeviceKind::Thermostat { hkr, .. } => Some(hkr),
            _ => None,
        }
    }

    pub fn hkr_mut(&mut self) -> Option<&mut ThermostatState> {
        match &mut self.kind {
            DeviceKind::Thermostat { hkr, .. } => Some(hkr),
            _ => None,
        }
    }

    // ── Derived state ────────────────────────────────────────────────

    pub fn is_on(&self) -> Option<bool> {
        self.switch().and_then(|s| s.state)
    }

    /// Room temperature: the radiator's own reading for thermostats, the
    /// built-in sensor for everything else.
    pub fn current_temperature(&self) -> Option<f64> {
        match &self.kind {
            DeviceKind::Thermostat { hkr, .. } => hkr.current_temperature(),
            _ => self.temperature().and_then(Temperature::celsius),
        }
    }

    pub fn current_operation(&self) -> Option<OperationMode> {
        self.hkr().map(|hkr| hkr.current_operation(self.present))
    }

    /// Extra state attributes for display, keyed by a stable name.
    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        let mut attrs = BTreeMap::new();
        match &self.kind {
            DeviceKind::Switch {
                switch,
                power_meter,
                ..
            } => {
                insert_opt(&mut attrs, "mode", switch.mode.clone());
                insert_opt(&mut attrs, "lock", switch.lock.map(|b| b.to_string()));
                insert_opt(
                    &mut attrs,
                    "device_lock",
                    switch.device_lock.map(|b| b.to_string()),
                );
                insert_opt(
                    &mut attrs,
                    "current_power_w",
                    power_meter.current_power_w().map(|w| format!("{w:.3}")),
                );
                insert_opt(
                    &mut attrs,
                    "total_energy_kwh",
                    power_meter.total_energy_kwh().map(|k| format!("{k:.3}")),
                );
            }
            DeviceKind::Thermostat { hkr, .. } => {
                insert_opt(&mut attrs, "lock", hkr.lock.map(|v| (v != 0).to_string()));
                insert_opt(
                    &mut attrs,
                    "device_lock",
                    hkr.device_lock.map(|v| (v != 0).to_string()),
                );
                insert_opt(
                    &mut attrs,
                    "error_code",
                    hkr.error_code.map(|v| v.to_string()),
                );
                insert_opt(
                    &mut attrs,
                    "battery_low",
                    hkr.battery_low.map(|v| (v != 0).to_string()),
                );
                if let Some(next) = &hkr.next_change {
                    insert_opt(
                        &mut attrs,
                        "next_change_at",
                        next.end_period.map(|t| t.to_string()),
                    );
                    insert_opt(
                        &mut attrs,
                        "next_change_temperature",
                        next.tchange.map(|t| thermostat::display_celsius(t).to_string()),
                    );
                }
            }
            DeviceKind::Generic { .. } => {}
        }
        attrs
    }
}

fn insert_opt(attrs: &mut BTreeMap<&'static str, String>, key: &'static str, value: Option<String>) {
    if let Some(value) = value {
        attrs.insert(key, value);
    }
}
