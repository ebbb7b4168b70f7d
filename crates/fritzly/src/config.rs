//! CLI configuration: thin wrapper around `fritzly_config`.
//!
//! Loads the shared config and layers the `GlobalOpts` flag overrides
//! (--host, --username, --timeout) on top.

use std::path::PathBuf;

use fritzly_core::GatewayConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use fritzly_config::Config;

/// The config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fritzly_config::config_path)
}

/// Load the config file and apply flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = fritzly_config::load_config_from(&config_file(global))?;
    if let Some(ref host) = global.host {
        config.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        config.username.clone_from(username);
    }
    if let Some(timeout) = global.timeout {
        config.timeout = timeout;
    }
    Ok(config)
}

/// Build the gateway config, resolving the password on the way.
pub fn gateway_config(config: &Config) -> Result<GatewayConfig, CliError> {
    Ok(fritzly_config::to_gateway_config(config)?)
}

/// Output format: flag, then `[defaults] output`, then table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        match config.defaults.output.as_str() {
            "json" => OutputFormat::Json,
            "json-compact" => OutputFormat::JsonCompact,
            "yaml" => OutputFormat::Yaml,
            "plain" => OutputFormat::Plain,
            _ => OutputFormat::Table,
        }
    })
}

/// Color mode: flag, then `[defaults] color`, then auto.
pub fn color_mode(global: &GlobalOpts, config: &Config) -> ColorMode {
    global.color.unwrap_or_else(|| match config.defaults.color.as_str() {
        "always" => ColorMode::Always,
        "never" => ColorMode::Never,
        _ => ColorMode::Auto,
    })
}

/// Everything a gateway command needs to run and print.
pub struct Session {
    pub gateway: GatewayConfig,
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Session {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load(global)?;
        Ok(Self {
            gateway: gateway_config(&config)?,
            format: output_format(global, &config),
            color: crate::output::should_color(color_mode(global, &config)),
            quiet: global.quiet,
        })
    }
}
