//! Outlet command handlers.

use fritzly_core::{Controller, CoreError, Switchable};

use crate::cli::{SwitchArgs, SwitchCommand};
use crate::commands::devices::state_summary;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: SwitchArgs, session: &Session) -> Result<(), CliError> {
    let (SwitchCommand::On { ain } | SwitchCommand::Off { ain } | SwitchCommand::Toggle { ain }) =
        &args.command;
    let ain = ain.clone();
    tracing::debug!(%ain, command = ?args.command, "switch command");

    let record = Controller::oneshot(session.gateway.clone(), |c| async move {
        let outlet = c.switch(&ain)?;
        match args.command {
            SwitchCommand::On { .. } => outlet.turn_on().await?,
            SwitchCommand::Off { .. } => outlet.turn_off().await?,
            SwitchCommand::Toggle { .. } => {
                outlet.toggle().await?;
            }
        }
        c.device(&ain).ok_or(CoreError::DeviceNotFound { ain })
    })
    .await?;

    let color = session.color;
    let out = output::render_single(
        session.format,
        &record,
        |d| format!("{} ({}): {}", d.name, d.ain, state_summary(d, color)),
        |d| match d.is_on() {
            Some(true) => "on".into(),
            Some(false) => "off".into(),
            None => "unknown".into(),
        },
    )?;
    output::print_output(&out, session.quiet);
    Ok(())
}
