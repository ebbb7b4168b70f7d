// Session login / logout
//
// Two-step challenge-response against `login_sid.lua`: fetch a challenge,
// answer it with the MD5 response, read back the session id and rights.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::{Session, SessionState, UNAUTHENTICATED_SID, challenge_response};
use crate::client::{LOGIN_PATH, Params, SessionClient};
use crate::error::Error;
use crate::models::SessionInfo;

/// Parse a `login_sid.lua` response body.
pub fn parse_session_info(body: &str) -> Result<SessionInfo, Error> {
    quick_xml::de::from_str(body).map_err(|e| Error::xml(&e, body))
}

impl SessionClient {
    /// Log into the gateway.
    ///
    /// Serialized with any in-flight re-login. On success the session id
    /// and granted rights are stored; if the gateway keeps answering with
    /// the unauthenticated sentinel the call fails with [`Error::Blocked`].
    pub async fn login(&self) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    /// Renew the session after a 403, at most once per stale session id.
    ///
    /// If another caller already replaced `stale_sid` while we waited for
    /// the login lock, its session is reused instead of logging in again.
    pub(crate) async fn renew_session(&self, stale_sid: Option<&str>) -> Result<String, Error> {
        let _guard = self.login_lock.lock().await;

        if let (Some(stale), Some(current)) = (stale_sid, self.sid()) {
            if stale != current {
                debug!("session already renewed by a concurrent caller");
                return Ok(current);
            }
        }

        self.login_locked().await?;
        self.sid().ok_or(Error::NotAuthenticated)
    }

    /// End the current session.
    ///
    /// No-op without an active session. Logout failures are logged; the
    /// local session is cleared either way.
    pub async fn close(&self) {
        let session = std::mem::take(&mut *self.write_session());
        let Some(sid) = session.sid else {
            return;
        };

        let result = async {
            let url = self.endpoint(LOGIN_PATH)?;
            let params = Params::new().with("logout", "1").with("sid", sid);
            self.fetch_body(&url, &params).await
        }
        .await;

        match result {
            Ok(_) => debug!("logout complete"),
            Err(e) => warn!(error = %e, "logout failed (non-fatal)"),
        }
        self.set_state(SessionState::Unauthenticated);
    }

    async fn login_locked(&self) -> Result<(), Error> {
        self.set_state(SessionState::Authenticating);

        match self.challenge_login().await {
            Ok(session) => {
                info!(rights = session.rights.len(), "session established");
                *self.write_session() = session;
                self.set_state(SessionState::Authenticated);
                Ok(())
            }
            Err(e) => {
                let next = match &e {
                    Error::Blocked { blocked_for_secs } => {
                        self.write_session().block_time = *blocked_for_secs;
                        SessionState::Blocked {
                            retry_after: Duration::from_secs(*blocked_for_secs),
                        }
                    }
                    _ => SessionState::Unauthenticated,
                };
                self.set_state(next);
                Err(e)
            }
        }
    }

    async fn challenge_login(&self) -> Result<Session, Error> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!(%url, "requesting login challenge");

        let mut info = parse_session_info(&self.fetch_body(&url, &Params::new()).await?)?;

        if info.sid == UNAUTHENTICATED_SID {
            if info.challenge.is_empty() {
                return Err(Error::Authentication {
                    message: "login response carried no challenge".into(),
                });
            }
            let credentials = self.credentials();
            let response = challenge_response(&info.challenge, &credentials.password);
            let params = Params::new()
                .with("username", credentials.username.as_str())
                .with("response", response);
            info = parse_session_info(&self.fetch_body(&url, &params).await?)?;
        }

        if info.sid == UNAUTHENTICATED_SID {
            return Err(Error::Blocked {
                blocked_for_secs: info.block_time,
            });
        }

        Ok(Session {
            sid: Some(info.sid),
            rights: info.rights.to_map(),
            block_time: info.block_time,
        })
    }
}
