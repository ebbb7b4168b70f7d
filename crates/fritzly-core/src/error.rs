// ── Core error types ──
//
// User-facing errors from fritzly-core. Consumers never see raw HTTP
// status codes or XML decoding failures; the `From<fritzly_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Gateway blocks logins for another {retry_after_secs}s")]
    Blocked { retry_after_secs: u64 },

    #[error("Not connected to the gateway")]
    Disconnected,

    #[error("Gateway request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {ain}")]
    DeviceNotFound { ain: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Gateway error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::Blocked { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fritzly_api::Error> for CoreError {
    fn from(err: fritzly_api::Error) -> Self {
        match err {
            fritzly_api::Error::Blocked { blocked_for_secs } => CoreError::Blocked {
                retry_after_secs: blocked_for_secs,
            },
            fritzly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            fritzly_api::Error::NotAuthenticated => CoreError::Disconnected,
            fritzly_api::Error::Forbidden => CoreError::AuthenticationFailed {
                message: "Gateway rejected the session and re-login did not help".into(),
            },
            fritzly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            fritzly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fritzly_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            fritzly_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            fritzly_api::Error::BadRequest => CoreError::Api {
                message: "Gateway rejected the request".into(),
                status: Some(400),
            },
            fritzly_api::Error::ServerError => CoreError::Api {
                message: "Gateway internal server error".into(),
                status: Some(500),
            },
            fritzly_api::Error::UnknownStatus(status) => CoreError::Api {
                message: format!("Unexpected HTTP status {status}"),
                status: Some(status),
            },
            fritzly_api::Error::Xml { message, .. } => CoreError::Api {
                message: format!("Malformed gateway response: {message}"),
                status: None,
            },
            fritzly_api::Error::UnexpectedResponse(message) => CoreError::Api {
                message,
                status: None,
            },
        }
    }
}
