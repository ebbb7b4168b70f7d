//! Configuration for the fritzly CLI.
//!
//! TOML file plus `FRITZLY_*` environment overrides, credential
//! resolution (env + keyring + plaintext), and translation to
//! `fritzly_core::GatewayConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fritzly_core::config::DEFAULT_HOST;
use fritzly_core::{GatewayConfig, TlsVerification, gateway_url};

/// Keyring service name; the account is the gateway host.
pub const KEYRING_SERVICE: &str = "fritzly";
/// Environment variable that beats every other password source.
pub const PASSWORD_ENV: &str = "FRITZLY_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for gateway '{host}'")]
    NoCredentials { host: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Gateway host name, IP address or full URL.
    #[serde(default = "default_host")]
    pub host: String,

    /// Login user. Empty for password-only gateways.
    #[serde(default)]
    pub username: String,

    /// Plaintext password (prefer the keyring or `FRITZLY_PASSWORD`).
    pub password: Option<String>,

    /// Seconds between poll cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between login attempts when the gateway reports no block time.
    #[serde(default = "default_login_retry")]
    pub login_retry: u64,

    /// Verify the gateway certificate against the system store.
    #[serde(default)]
    pub verify_tls: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// CLI presentation defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: String::new(),
            password: None,
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            login_retry: default_login_retry(),
            verify_tls: false,
            ca_cert: None,
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_scan_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    10
}
fn default_login_retry() -> u64 {
    60
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

impl Config {
    /// A copy safe to print: the plaintext password is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "********".into()),
            ..self.clone()
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fritzly", "fritzly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fritzly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file is fine.
///
/// Nested keys use a double underscore: `FRITZLY_DEFAULTS__OUTPUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FRITZLY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the gateway password: env var, then keyring, then plaintext.
pub fn resolve_password(config: &Config) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &config.host) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = config.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        host: config.host.clone(),
    })
}

/// Store a password in the system keyring for `host`.
pub fn store_password(host: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, host)
        .and_then(|entry| entry.set_password(password.expose_secret()))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation ─────────────────────────────────────────────────────

/// Check the numeric settings without touching credentials.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.scan_interval < 1 {
        return Err(ConfigError::Validation {
            field: "scan_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    if config.timeout < 1 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    gateway_url(&config.host).map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: format!("{}: {e}", config.host),
    })?;
    Ok(())
}

/// Build a `GatewayConfig`, resolving the password on the way.
pub fn to_gateway_config(config: &Config) -> Result<GatewayConfig, ConfigError> {
    validate(config)?;
    let password = resolve_password(config)?;
    gateway_config_with_password(config, password)
}

/// Build a `GatewayConfig` with an already resolved password.
pub fn gateway_config_with_password(
    config: &Config,
    password: SecretString,
) -> Result<GatewayConfig, ConfigError> {
    validate(config)?;
    let url = gateway_url(&config.host).map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: format!("{}: {e}", config.host),
    })?;

    let tls = if let Some(ref ca_path) = config.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if config.verify_tls {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    };

    let mut gateway = GatewayConfig::new(url, config.username.clone(), password);
    gateway.tls = tls;
    gateway.timeout = Duration::from_secs(config.timeout);
    gateway.poll_interval = Duration::from_secs(config.scan_interval);
    gateway.login_retry = Duration::from_secs(config.login_retry);
    Ok(gateway)
}
