use anyhow::Result;
use log::{info, warn};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::auth::session_file::{self, SessionFile};
use crate::auth::{SessionToken, login, session_store};
use crate::config::Config;

#[derive(Clone)]
pub struct SessionManager {
    pub backend_url: String,
    pub callback_uri: String,
    pub login_timeout: Duration,
}

impl SessionManager {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            backend_url: cfg.backend_url.clone(),
            callback_uri: cfg.callback_uri(),
            login_timeout: Duration::from_secs(cfg.login_timeout_secs()),
        }
    }

    /// Returns a session token; runs the browser login if none is stored.
    pub fn get_session(&self) -> Result<SessionToken> {
        match session_store::load_session(&self.backend_url) {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => info!("no stored session for {}", self.backend_url),
            Err(e) => warn!("could not read session from keyring: {e}"),
        }
        self.login()
    }

    /// Always runs the browser login and stores the new token.
    pub fn login(&self) -> Result<SessionToken> {
        let token = login::perform_login(&self.backend_url, &self.callback_uri, self.login_timeout)?;

        // best-effort: the token is still usable for this run
        if let Err(e) = session_store::save_session(&self.backend_url, &token) {
            warn!("couldn't save session to keyring: {e}");
        }

        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        let meta = SessionFile {
            backend_url: self.backend_url.clone(),
            logged_in_at_epoch: now,
        };
        if let Err(e) = session_file::save_session_meta(&meta) {
            warn!("couldn't save session metadata: {e}");
        }

        Ok(token)
    }

    pub fn logout(&self) -> Result<()> {
        session_store::clear_session(&self.backend_url)?;
        session_file::clear_session_meta()?;
        info!("session for {} cleared", self.backend_url);
        Ok(())
    }

    pub fn status(&self) -> Result<Option<SessionFile>> {
        let meta = session_file::load_session_meta()?;
        Ok(meta.filter(|m| m.backend_url == self.backend_url))
    }
}
