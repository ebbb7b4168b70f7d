//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fritzly_config::ConfigError;
use fritzly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {url}")]
    #[diagnostic(
        code(fritzly::connection_failed),
        help(
            "Check that the FRITZ!Box is reachable.\n\
             Reason: {reason}\n\
             Try: fritzly --host 192.168.178.1 devices"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(fritzly::auth_failed),
        help(
            "{message}\n\
             Verify the user and password. Store a new password with: fritzly config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Gateway refuses logins for another {seconds}s")]
    #[diagnostic(
        code(fritzly::blocked),
        help("Too many failed logins. Wait for the block to expire before retrying.")
    )]
    Blocked { seconds: u64 },

    #[error("No password configured for gateway '{host}'")]
    #[diagnostic(
        code(fritzly::no_credentials),
        help(
            "Store one with: fritzly config set-password\n\
             Or set the FRITZLY_PASSWORD environment variable."
        )
    )]
    NoCredentials { host: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{ain}' not found")]
    #[diagnostic(
        code(fritzly::not_found),
        help("Run: fritzly devices to see the paired devices")
    )]
    NotFound { ain: String },

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(fritzly::unsupported), help("This command requires {required}."))]
    Unsupported { operation: String, required: String },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Gateway error: {message}")]
    #[diagnostic(code(fritzly::api_error))]
    Api { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(fritzly::timeout),
        help("Increase the timeout with --timeout or check the gateway's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fritzly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(fritzly::config),
        help("Inspect the effective settings with: fritzly config show")
    )]
    Config { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(code(fritzly::keyring))]
    Keyring { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(fritzly::render))]
    Render { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(fritzly::internal))]
    Internal { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::Blocked { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Blocked {
                retry_after_secs: 0,
            } => CliError::AuthFailed {
                message: "The gateway rejected the user or password.".into(),
            },

            CoreError::Blocked { retry_after_secs } => CliError::Blocked {
                seconds: retry_after_secs,
            },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "the gateway session was closed".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { ain } => CliError::NotFound { ain },

            CoreError::Unsupported {
                operation,
                required,
            } => CliError::Unsupported {
                operation,
                required,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::Api {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { host } => CliError::NoCredentials { host },
            ConfigError::Keyring(message) => CliError::Keyring { message },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
