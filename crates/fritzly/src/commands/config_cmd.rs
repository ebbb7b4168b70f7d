//! Config command handlers. None of these talk to the gateway.

use std::io::BufRead;

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let shown = cfg.redacted();
            let out = match global.output {
                None | Some(OutputFormat::Table | OutputFormat::Plain) => {
                    shown.to_toml()?
                }
                Some(format) => {
                    output::render_single(format, &shown, |_| String::new(), |_| String::new())?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "empty input on stdin".into(),
                });
            }
            fritzly_config::store_password(&cfg.host, &SecretString::from(password.to_owned()))?;
            tracing::info!(host = %cfg.host, "password stored in keyring");
            output::print_output(&format!("password stored for {}", cfg.host), global.quiet);
            Ok(())
        }
    }
}
