use thiserror::Error;

/// Top-level error type for the `fritzly-api` crate.
///
/// Covers every failure mode of the AHA HTTP interface: session login,
/// transport, gateway status codes and XML decoding.
/// `fritzly-core` maps these into domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected; the gateway refuses further attempts for a while.
    #[error("Login rejected -- gateway blocks new attempts for {blocked_for_secs}s")]
    Blocked { blocked_for_secs: u64 },

    /// Login response could not be used (missing SID or challenge, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A command was sent before a session was established.
    #[error("No active session -- login required")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Gateway status ──────────────────────────────────────────────
    /// HTTP 400.
    #[error("Bad request (HTTP 400)")]
    BadRequest,

    /// HTTP 403 that survived one re-login.
    #[error("Forbidden (HTTP 403) -- session could not be renewed")]
    Forbidden,

    /// HTTP 500.
    #[error("Gateway internal server error (HTTP 500)")]
    ServerError,

    /// Any other non-200 status.
    #[error("Unexpected HTTP status {0}")]
    UnknownStatus(u16),

    // ── Data ────────────────────────────────────────────────────────
    /// XML decoding failed, with the raw body for debugging.
    #[error("XML decoding error: {message}")]
    Xml { message: String, body: String },

    /// A response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::ServerError | Self::Blocked { .. } => true,
            _ => false,
        }
    }

    /// Seconds the gateway asked us to wait before the next login, if any.
    pub fn blocked_for(&self) -> Option<u64> {
        match self {
            Self::Blocked { blocked_for_secs } => Some(*blocked_for_secs),
            _ => None,
        }
    }

    pub(crate) fn xml(err: &quick_xml::DeError, body: &str) -> Self {
        let preview = body.char_indices().nth(200).map_or(body, |(i, _)| &body[..i]);
        Self::Xml {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}
