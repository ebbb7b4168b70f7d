//! Thermostat command handlers.

use fritzly_core::{Controller, CoreError, OperationMode, Thermostat};

use crate::cli::{ThermostatArgs, ThermostatCommand};
use crate::commands::devices::state_summary;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ThermostatArgs, session: &Session) -> Result<(), CliError> {
    let record = match args.command {
        ThermostatCommand::Set { ain, celsius } => {
            // Reject out-of-range targets before logging in.
            fritzly_core::model::thermostat::half_degrees(celsius)?;
            Controller::oneshot(session.gateway.clone(), |c| async move {
                c.thermostat(&ain)?.set_target_temperature(celsius).await?;
                c.device(&ain).ok_or(CoreError::DeviceNotFound { ain })
            })
            .await?
        }
        ThermostatCommand::Mode { ain, mode } => {
            let mode = OperationMode::from(mode);
            Controller::oneshot(session.gateway.clone(), |c| async move {
                c.thermostat(&ain)?.set_operation_mode(mode).await?;
                c.device(&ain).ok_or(CoreError::DeviceNotFound { ain })
            })
            .await?
        }
    };

    let color = session.color;
    let out = output::render_single(
        session.format,
        &record,
        |d| format!("{} ({}): {}", d.name, d.ain, state_summary(d, color)),
        |d| {
            d.current_operation()
                .unwrap_or(OperationMode::Unknown)
                .to_string()
        },
    )?;
    output::print_output(&out, session.quiet);
    Ok(())
}
