// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// controller routes each variant to the matching `homeautoswitch.lua`
// call and patches the cached record on success.

use crate::model::{Ain, OperationMode};

/// All possible write operations against a gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Switch operations ────────────────────────────────────────────
    TurnOn {
        ain: Ain,
    },
    TurnOff {
        ain: Ain,
    },
    Toggle {
        ain: Ain,
    },

    // ── Thermostat operations ────────────────────────────────────────
    SetTargetTemperature {
        ain: Ain,
        celsius: f64,
    },
    SetOperationMode {
        ain: Ain,
        mode: OperationMode,
    },
}

impl Command {
    /// The device this command targets.
    pub fn ain(&self) -> &Ain {
        match self {
            Self::TurnOn { ain }
            | Self::TurnOff { ain }
            | Self::Toggle { ain }
            | Self::SetTargetTemperature { ain, .. }
            | Self::SetOperationMode { ain, .. } => ain,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn { .. } => "turn_on",
            Self::TurnOff { .. } => "turn_off",
            Self::Toggle { .. } => "toggle",
            Self::SetTargetTemperature { .. } => "set_target_temperature",
            Self::SetOperationMode { .. } => "set_operation_mode",
        }
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// Switch state reported back by the gateway.
    Switched(bool),
    /// Setpoint written, in half-degree units or a sentinel.
    Setpoint(u8),
}
