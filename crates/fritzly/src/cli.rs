//! Clap derive structures for the `fritzly` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fritzly_core::{DeviceCategory, OperationMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fritzly -- control FRITZ!Box smart-home devices
#[derive(Debug, Parser)]
#[command(
    name = "fritzly",
    version,
    about = "Control FRITZ!Box smart-home devices from the command line",
    long_about = "Lists and controls the DECT outlets and radiator thermostats paired\n\
        with a FRITZ!Box through its home-automation HTTP interface.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to read instead of the platform default
    #[arg(long, env = "FRITZLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Gateway host name, IP address or URL (overrides config)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Login user (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect paired devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Switch DECT outlets
    #[command(alias = "sw")]
    Switch(SwitchArgs),

    /// Drive radiator thermostats
    #[command(alias = "hkr")]
    Thermostat(ThermostatArgs),

    /// Poll the gateway and log every device change until Ctrl-C
    Watch(WatchArgs),

    /// Inspect configuration and store credentials
    Config(ConfigArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: Option<DevicesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices (default)
    #[command(alias = "ls")]
    List {
        /// Only show devices of this kind
        #[arg(long, short = 'k')]
        kind: Option<KindFilter>,
    },

    /// Show one device in detail
    Get {
        /// Device AIN, e.g. "08761 0000434"
        ain: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    Switch,
    Thermostat,
    Generic,
}

impl From<KindFilter> for DeviceCategory {
    fn from(kind: KindFilter) -> Self {
        match kind {
            KindFilter::Switch => Self::Switch,
            KindFilter::Thermostat => Self::Thermostat,
            KindFilter::Generic => Self::Generic,
        }
    }
}

// ── Switch ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwitchArgs {
    #[command(subcommand)]
    pub command: SwitchCommand,
}

#[derive(Debug, Subcommand)]
pub enum SwitchCommand {
    /// Turn an outlet on
    On { ain: String },
    /// Turn an outlet off
    Off { ain: String },
    /// Flip an outlet and report the new state
    Toggle { ain: String },
}

// ── Thermostat ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ThermostatArgs {
    #[command(subcommand)]
    pub command: ThermostatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThermostatCommand {
    /// Set the target temperature (8.0 to 28.0 °C, half-degree steps)
    Set {
        ain: String,
        #[arg(allow_negative_numbers = true)]
        celsius: f64,
    },

    /// Switch the valve closed, fully open, or back to the schedule
    Mode { ain: String, mode: ModeArg },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Follow the comfort setpoint
    Auto,
    /// Valve fully open
    On,
    /// Valve closed
    Off,
}

impl From<ModeArg> for OperationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => Self::Auto,
            ModeArg::On => Self::On,
            ModeArg::Off => Self::Off,
        }
    }
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between polls (overrides scan_interval)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (password masked)
    Show,

    /// Read a password from stdin and store it in the system keyring
    SetPassword,
}
