//! Authentication of sync requests.
//!
//! The server only needs to know whether a bearer token is valid. How
//! tokens are minted (password login, bootstrap) is up to the caller;
//! [`SessionAuthenticator::issue`] covers the common case of random
//! session tokens stored alongside the files.

use crate::error::ServerResult;
use ledgersync_storage::SessionStore;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Decides whether a bearer token may sync.
pub trait Authenticator: Send + Sync {
    /// Returns true if `token` is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    fn authenticate(&self, token: &str) -> ServerResult<bool>;
}

/// Accepts tokens recorded in a [`SessionStore`].
#[derive(Debug)]
pub struct SessionAuthenticator<S> {
    sessions: Arc<S>,
}

impl<S: SessionStore> SessionAuthenticator<S> {
    /// Creates an authenticator over `sessions`.
    pub fn new(sessions: Arc<S>) -> Self {
        Self { sessions }
    }

    /// Mints and stores a new random session token.
    pub fn issue(&self) -> ServerResult<String> {
        let token = Uuid::new_v4().to_string();
        self.sessions.add_session(&token)?;
        debug!("issued session token");
        Ok(token)
    }
}

impl<S: SessionStore> Authenticator for SessionAuthenticator<S> {
    fn authenticate(&self, token: &str) -> ServerResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        Ok(self.sessions.has_session(token)?)
    }
}
