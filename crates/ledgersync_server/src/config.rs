//! Server configuration.

use ledgersync_storage::StorageConfig;

/// Version of the sync message format.
///
/// Files uploaded with an older format must be reset before they can sync.
/// Bumping this forces every client to reset.
pub const SYNC_FORMAT_VERSION: i16 = 2;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage backend.
    pub storage: StorageConfig,
    /// Oldest file format version accepted.
    pub min_sync_version: i16,
    /// Largest accepted batch of incoming changes, if limited.
    pub max_batch_size: Option<usize>,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            min_sync_version: SYNC_FORMAT_VERSION,
            max_batch_size: None,
        }
    }

    /// Sets the oldest accepted file format version.
    pub fn with_min_sync_version(mut self, version: i16) -> Self {
        self.min_sync_version = version;
        self
    }

    /// Limits the number of changes accepted in one round.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(StorageConfig::Memory)
    }
}
