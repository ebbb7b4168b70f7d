// ── Capability bitmask ──
//
// Each `<device>` advertises its capabilities through the
// `functionbitmask` attribute. Only a handful of bits matter for
// classification; the rest are carried along for display.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The `functionbitmask` attribute of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionMask(u32);

impl FunctionMask {
    pub const THERMOSTAT: u32 = 1 << 6;
    pub const POWER_METER: u32 = 1 << 7;
    pub const TEMPERATURE_SENSOR: u32 = 1 << 8;
    pub const SWITCH: u32 = 1 << 9;
    pub const REPEATER: u32 = 1 << 10;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub const fn is_switch(self) -> bool {
        self.has(Self::SWITCH)
    }

    pub const fn is_thermostat(self) -> bool {
        self.has(Self::THERMOSTAT)
    }

    /// Decide which actor family a device belongs to.
    ///
    /// The switch bit wins over the thermostat bit; a device carrying
    /// neither is [`DeviceCategory::Generic`] and never gets an actor.
    pub const fn category(self) -> DeviceCategory {
        if self.is_switch() {
            DeviceCategory::Switch
        } else if self.is_thermostat() {
            DeviceCategory::Thermostat
        } else {
            DeviceCategory::Generic
        }
    }

    /// Human-readable names of the known capability bits.
    pub fn capabilities(self) -> Vec<&'static str> {
        [
            (Self::THERMOSTAT, "thermostat"),
            (Self::POWER_METER, "power_meter"),
            (Self::TEMPERATURE_SENSOR, "temperature_sensor"),
            (Self::SWITCH, "switch"),
            (Self::REPEATER, "repeater"),
        ]
        .into_iter()
        .filter(|(bit, _)| self.has(*bit))
        .map(|(_, name)| name)
        .collect()
    }
}

impl fmt::Display for FunctionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Actor family a device is bound to for its whole lifetime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCategory {
    Switch,
    Thermostat,
    Generic,
}

impl DeviceCategory {
    /// Whether devices of this category get a capability actor.
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::Generic)
    }
}
