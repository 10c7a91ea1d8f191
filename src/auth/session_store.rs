use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::auth::SessionToken;

const SERVICE: &str = "inbox_digest";

/// Save the session token into the OS keyring, keyed by backend URL
pub fn save_session(backend_url: &str, token: &SessionToken) -> Result<()> {
    let entry = Entry::new(SERVICE, backend_url);
    entry?
        .set_password(token.as_str())
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the session token for a backend, if one was stored
pub fn load_session(backend_url: &str) -> Result<Option<SessionToken>> {
    let entry = Entry::new(SERVICE, backend_url);
    match entry?.get_password() {
        Ok(v) => Ok(Some(SessionToken::new(v))),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Forget the session token; a missing entry is not an error
pub fn clear_session(backend_url: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, backend_url);
    match entry?.delete_credential() {
        Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
