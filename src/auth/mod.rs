pub mod login;
pub mod session_file;
pub mod session_manager;
pub mod session_store;

use std::fmt;

/// Opaque session token issued by the backend after login. It travels as the
/// `state` query parameter on every mailbox call.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}
