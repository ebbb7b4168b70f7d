// ── Runtime connection configuration ──
//
// These types describe *how* to talk to a gateway. They carry credentials
// and tuning, but never touch disk. The CLI builds a `GatewayConfig` and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "fritz.box";
/// Seconds between two poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Upper bound for every gateway request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Wait between failed logins when the gateway reports no block time.
pub const DEFAULT_LOGIN_RETRY: Duration = Duration::from_secs(60);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Gateways ship with a self-signed certificate.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one gateway connection.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL, e.g. `http://fritz.box/`.
    pub url: Url,
    /// Empty for gateways configured for password-only login.
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Time between poll cycles. Zero disables the background poll task.
    pub poll_interval: Duration,
    /// Minimum wait between login attempts.
    pub login_retry: Duration,
}

impl GatewayConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            login_retry: DEFAULT_LOGIN_RETRY,
        }
    }
}

/// Turn a configured host into a base URL.
///
/// Bare hosts get `http://`; anything with a scheme is taken as is.
pub fn gateway_url(host: &str) -> Result<Url, url::ParseError> {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        Url::parse(host)
    } else {
        Url::parse(&format!("http://{host}"))
    }
}
