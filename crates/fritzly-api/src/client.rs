// AHA HTTP session client
//
// Wraps `reqwest::Client` with FRITZ!Box-specific URL construction,
// status-code mapping and transparent session renewal on HTTP 403.
// Login/logout live in `login.rs`, the device list in `devicelist.rs`,
// both as inherent methods to keep this module focused on transport.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::{Credentials, Session, SessionState};
use crate::error::Error;
use crate::transport::{DEFAULT_TIMEOUT, TransportConfig};

/// Session login endpoint.
pub const LOGIN_PATH: &str = "/login_sid.lua";

/// Home automation command endpoint.
pub const SWITCH_PATH: &str = "/webservices/homeautoswitch.lua";

// ── Query parameters ─────────────────────────────────────────────

/// Ordered query parameters for a gateway request.
///
/// Setting an existing key replaces its value, so the session id can be
/// swapped in place when a request is retried after re-login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Params::new().with("switchcmd", cmd)`.
    pub fn command(cmd: &str) -> Self {
        Self::new().with("switchcmd", cmd)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_owned(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.set(&k.into(), v);
        }
        params
    }
}

/// Outcome of a single GET that did not fail outright.
pub(crate) enum Fetched {
    Body(String),
    Forbidden,
}

// ── SessionClient ────────────────────────────────────────────────

/// Authenticated HTTP client for the gateway's AHA interface.
///
/// Shared between the poll loop and command callers. Re-login is single
/// flight: concurrent callers that hit HTTP 403 queue on `login_lock` and
/// reuse the session the first caller obtained.
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    timeout: Duration,
    session: RwLock<Session>,
    state: watch::Sender<SessionState>,
    pub(crate) login_lock: Mutex<()>,
}

impl SessionClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the gateway root, e.g. `http://fritz.box`.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials).with_timeout(transport.timeout))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            http,
            base_url,
            credentials,
            timeout: DEFAULT_TIMEOUT,
            session: RwLock::new(Session::default()),
            state,
            login_lock: Mutex::new(()),
        }
    }

    /// Override the per-request bound (10 s by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // ── Session state ─────────────────────────────────────────────

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.read_session().clone()
    }

    /// The active session id, if any.
    pub fn sid(&self) -> Option<String> {
        self.read_session().sid.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_session().is_active()
    }

    /// Current position in the session state machine.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    pub(crate) fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Requests ──────────────────────────────────────────────────

    /// Send a command to `homeautoswitch.lua`.
    ///
    /// Requires an active session. Injects `sid` and, when given, the
    /// device `ain` into `params`.
    pub async fn send_command(&self, params: Params, ain: Option<&str>) -> Result<String, Error> {
        let sid = self.sid().ok_or(Error::NotAuthenticated)?;
        let mut params = params;
        params.set("sid", sid);
        if let Some(ain) = ain {
            params.set("ain", ain);
        }
        self.execute(SWITCH_PATH, params).await
    }

    /// GET `path` with `params` and return the trimmed body.
    ///
    /// On HTTP 403 the session is renewed once and the request retried with
    /// the fresh session id. A second 403 surfaces [`Error::Forbidden`].
    pub async fn execute(&self, path: &str, params: Params) -> Result<String, Error> {
        let url = self.endpoint(path)?;

        match self.fetch(&url, &params).await? {
            Fetched::Body(body) => Ok(body),
            Fetched::Forbidden => {
                debug!(path, "forbidden, renewing session");
                let stale = params.get("sid").map(str::to_owned);
                let sid = match self.renew_session(stale.as_deref()).await {
                    Ok(sid) => sid,
                    Err(e) => {
                        warn!(error = %e, "session renewal failed");
                        return Err(Error::Forbidden);
                    }
                };

                let mut retry = params;
                if retry.contains("sid") {
                    retry.set("sid", sid);
                }
                match self.fetch(&url, &retry).await? {
                    Fetched::Body(body) => Ok(body),
                    Fetched::Forbidden => Err(Error::Forbidden),
                }
            }
        }
    }

    /// Single GET without any re-login handling; 403 becomes an error.
    pub(crate) async fn fetch_body(&self, url: &Url, params: &Params) -> Result<String, Error> {
        match self.fetch(url, params).await? {
            Fetched::Body(body) => Ok(body),
            Fetched::Forbidden => Err(Error::Forbidden),
        }
    }

    /// Single bounded GET with status-code mapping.
    pub(crate) async fn fetch(&self, url: &Url, params: &Params) -> Result<Fetched, Error> {
        debug!(path = url.path(), "GET");

        let request = async {
            let resp = self
                .http
                .get(url.clone())
                .query(params.as_slice())
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = if status == 200 {
                Some(resp.text().await?)
            } else {
                None
            };
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| self.transport_error(e))?;

        match (status, body) {
            (200, Some(body)) => Ok(Fetched::Body(body.trim().to_owned())),
            (400, _) => {
                error!(path = url.path(), "bad request (HTTP 400)");
                Err(Error::BadRequest)
            }
            (403, _) => Ok(Fetched::Forbidden),
            (500, _) => {
                debug!(path = url.path(), "internal server error (HTTP 500)");
                Err(Error::ServerError)
            }
            (other, _) => {
                error!(path = url.path(), status = other, "unexpected status");
                Err(Error::UnknownStatus(other))
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_secs: self.timeout.as_secs(),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            Error::Transport(err)
        }
    }
}
