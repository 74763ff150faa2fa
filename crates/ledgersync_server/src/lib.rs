//! # Ledgersync Server
//!
//! The sync transaction protocol of the ledgersync server.
//!
//! This crate provides:
//! - `SyncServer`, which authenticates and runs sync rounds
//! - The gates that refuse rounds against stale or re-keyed files
//! - Request and response bodies with the client's wire names
//! - Offline digest inspection and verification
//!
//! # Sync rounds
//!
//! A client sends the changes it has not yet uploaded together with the
//! timestamp of its last sync. Inside one storage transaction the server
//! collects the changes the client is missing, stores the new ones, folds
//! their hashes into the group's digest and prunes it. The client compares
//! the returned digest with its own to find where the replicas diverge.
//!
//! ```rust
//! use ledgersync_server::{ChangeEnvelope, ServerConfig, SyncRequest, SyncServer};
//! use ledgersync_storage::{FileRegistry, NewFile, SessionStore};
//!
//! let server = SyncServer::open(ServerConfig::default()).unwrap();
//! server.storage().add(NewFile::new("budget", "g1", 2)).unwrap();
//! server.storage().add_session("token").unwrap();
//!
//! let request = SyncRequest::new("budget", "g1", "1970-01-01T00:00:00.000Z-0000-0000000000000000")
//!     .with_changes(vec![ChangeEnvelope::encrypted(
//!         "2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF",
//!         vec![1, 2, 3],
//!     )]);
//! let response = server.sync("token", &request).unwrap().into_response().unwrap();
//!
//! assert!(response.changes.is_empty());
//! assert!(response.digest.contains("\"hash\":1983295247"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod maintenance;
mod outcome;
mod protocol;
mod server;
mod stats;

pub use auth::{Authenticator, SessionAuthenticator};
pub use config::{ServerConfig, SYNC_FORMAT_VERSION};
pub use error::{ServerError, ServerResult};
pub use maintenance::{load_digest, rebuild_digest, verify_digest, DigestReport};
pub use outcome::{Rejection, SyncOutcome};
pub use protocol::{ChangeEnvelope, SyncRequest, SyncResponse};
pub use server::SyncServer;
pub use stats::SyncStats;
