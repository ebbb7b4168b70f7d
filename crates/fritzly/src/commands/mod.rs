//! Command dispatch: bridges CLI args -> core commands -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod switch;
pub mod thermostat;
pub mod watch;

use crate::cli::Command;
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(args, session).await,
        Command::Switch(args) => switch::handle(args, session).await,
        Command::Thermostat(args) => thermostat::handle(args, session).await,
        Command::Watch(args) => watch::handle(args, session).await,
        // Config is handled before a session exists.
        Command::Config(_) => Err(CliError::Internal {
            message: "config commands do not need a gateway session".into(),
        }),
    }
}
