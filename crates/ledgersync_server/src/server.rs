//! Sync server implementation.

use crate::auth::{Authenticator, SessionAuthenticator};
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::SyncHandler;
use crate::outcome::{Rejection, SyncOutcome};
use crate::protocol::SyncRequest;
use crate::stats::{StatsCounters, SyncStats};
use ledgersync_storage::{FileRegistry, GroupStore, Storage};
use std::sync::Arc;
use tracing::{debug, info};

/// The sync server.
///
/// Handles sync rounds from any number of threads. Rounds on the same file
/// are serialized by storage; rounds on different files run in parallel.
pub struct SyncServer<S = Storage> {
    handler: SyncHandler<S>,
    auth: Box<dyn Authenticator>,
    stats: Arc<StatsCounters>,
}

impl SyncServer<Storage> {
    /// Opens the configured storage and authenticates against its sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be opened.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let storage = Arc::new(Storage::open(&config.storage)?);
        info!(storage = ?config.storage, "opened sync server storage");
        let auth = SessionAuthenticator::new(Arc::clone(&storage));
        Ok(Self::with_parts(config, storage, auth))
    }
}

impl<S: GroupStore + FileRegistry> SyncServer<S> {
    /// Creates a server over existing storage and an authenticator.
    ///
    /// `config.storage` is ignored; `storage` is used as given.
    pub fn with_parts(
        config: ServerConfig,
        storage: Arc<S>,
        auth: impl Authenticator + 'static,
    ) -> Self {
        let stats = Arc::new(StatsCounters::default());
        Self {
            handler: SyncHandler::new(storage, config, Arc::clone(&stats)),
            auth: Box::new(auth),
            stats,
        }
    }

    /// Returns the server's storage.
    pub fn storage(&self) -> &Arc<S> {
        self.handler.storage()
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    /// Runs one sync round for the holder of `token`.
    ///
    /// Gate failures are returned as [`SyncOutcome::Rejected`] and leave
    /// storage untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, a change timestamp is
    /// malformed, or storage fails. Nothing from the round is stored then.
    pub fn sync(&self, token: &str, request: &SyncRequest) -> ServerResult<SyncOutcome> {
        if !self.auth.authenticate(token)? {
            self.stats.record_rejection();
            debug!(file_id = %request.file_id, "sync round rejected: unauthorized");
            return Ok(SyncOutcome::Rejected(Rejection::Unauthorized));
        }
        self.handler.handle(request)
    }

    /// Returns a snapshot of the server's counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }
}

impl<S> std::fmt::Debug for SyncServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
