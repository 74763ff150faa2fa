//! # Ledgersync Storage
//!
//! Storage for the sync server.
//!
//! This crate provides:
//! - `ChangeLog` and `DigestStore`, the per-file group storage
//! - `GroupStore`, which runs both inside one transaction
//! - `FileRegistry` and `SessionStore`, the account database
//! - `InMemoryStorage` for tests and `SqliteStorage` for production
//! - `StorageConfig`/`Storage`, which pick a backend at startup
//!
//! Storage never interprets change payloads or digests; it stores the
//! strings and bytes the server hands it.
//!
//! # Transactions
//!
//! Writes to a file's change log and digest happen inside
//! [`GroupStore::transaction`]. The closure's writes are committed together
//! if it returns `Ok` and discarded otherwise:
//!
//! ```rust
//! use ledgersync_storage::{
//!     ChangeLog, ChangeRecord, DigestStore, GroupStore, Storage, StorageConfig, StorageError,
//! };
//!
//! let storage = Storage::open(&StorageConfig::Memory).unwrap();
//! let result = storage.transaction("f1", |txn| -> Result<(), StorageError> {
//!     txn.add(&ChangeRecord::new("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF", true, vec![]))?;
//!     txn.upsert("g1", "{}")?;
//!     Err(StorageError::Corrupted("abort".into()))
//! });
//! assert!(result.is_err());
//!
//! let changes = storage
//!     .transaction("f1", |txn| -> Result<_, StorageError> { txn.since("") })
//!     .unwrap();
//! assert!(changes.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod memory;
mod model;
mod sqlite;
mod traits;

pub use config::{Storage, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use model::{validate_file_id, ChangeRecord, FileRecord, NewFile};
pub use sqlite::{SqliteStorage, ACCOUNT_DB};
pub use traits::{ChangeLog, DigestStore, FileRegistry, GroupStore, GroupTransaction, SessionStore};
