use std::collections::BTreeMap;
use std::time::Duration;

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};

/// Session id the gateway hands out when nobody is logged in.
pub const UNAUTHENTICATED_SID: &str = "0000000000000000";

/// Username/password pair for the session login.
///
/// The FRITZ!Box accepts an empty username when it is configured for
/// password-only login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Observable state of the session state machine.
///
/// `Unauthenticated -> Authenticating -> Authenticated`, and on HTTP 403
/// back through `Authenticating` to either `Authenticated` or `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// Login refused; the caller must wait `retry_after` before trying again.
    Blocked { retry_after: Duration },
}

/// Session data captured from the last login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Active session id. `None` until the first successful login.
    pub sid: Option<String>,
    /// Granted rights: right name -> access level (1 = read, 2 = write).
    pub rights: BTreeMap<String, u8>,
    /// Seconds until the next login attempt is permitted.
    pub block_time: u64,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.sid.is_some()
    }

    /// Whether the session was granted `right` at any access level.
    pub fn has_right(&self, right: &str) -> bool {
        self.rights.get(right).is_some_and(|level| *level > 0)
    }
}

/// Compute the login response for a challenge.
///
/// `challenge + "-" + md5hex`, where the digest runs over the UTF-16LE
/// encoding of `challenge`, `"-"` and `password`, in that order.
pub fn challenge_response(challenge: &str, password: &SecretString) -> String {
    let mut hasher = Md5::new();
    for part in [challenge, "-", password.expose_secret()] {
        for unit in part.encode_utf16() {
            hasher.update(unit.to_le_bytes());
        }
    }
    format!("{challenge}-{}", hex::encode(hasher.finalize()))
}
