// Actuator commands on `homeautoswitch.lua`.

use tracing::debug;

use crate::client::{Params, SessionClient};
use crate::error::Error;

/// Thermostat setpoint sentinel: valve permanently closed.
pub const HKR_OFF: u8 = 253;

/// Thermostat setpoint sentinel: valve permanently open.
pub const HKR_ON: u8 = 254;

impl SessionClient {
    /// Switch an outlet on.
    pub async fn set_switch_on(&self, ain: &str) -> Result<(), Error> {
        debug!(ain, "setswitchon");
        self.send_command(Params::command("setswitchon"), Some(ain))
            .await
            .map(drop)
    }

    /// Switch an outlet off.
    pub async fn set_switch_off(&self, ain: &str) -> Result<(), Error> {
        debug!(ain, "setswitchoff");
        self.send_command(Params::command("setswitchoff"), Some(ain))
            .await
            .map(drop)
    }

    /// Toggle an outlet and return the state the gateway reports back.
    pub async fn set_switch_toggle(&self, ain: &str) -> Result<bool, Error> {
        debug!(ain, "setswitchtoggle");
        let body = self
            .send_command(Params::command("setswitchtoggle"), Some(ain))
            .await?;
        match body.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(Error::UnexpectedResponse(format!(
                "setswitchtoggle returned {other:?}"
            ))),
        }
    }

    /// Set a thermostat setpoint in half-degree units (or a sentinel).
    pub async fn set_hkr_tsoll(&self, ain: &str, half_degrees: u8) -> Result<(), Error> {
        debug!(ain, half_degrees, "sethkrtsoll");
        self.send_command(
            Params::command("sethkrtsoll").with("param", half_degrees.to_string()),
            Some(ain),
        )
        .await
        .map(drop)
    }
}
