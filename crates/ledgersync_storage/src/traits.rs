//! Storage interfaces consumed by the sync server.

use crate::error::{StorageError, StorageResult};
use crate::model::{ChangeRecord, FileRecord, NewFile};

/// The append-only change log of one file.
///
/// # Invariants
///
/// - `add` never overwrites: a second record with the same timestamp is
///   ignored and reported as not inserted
/// - `since` returns records in ascending timestamp order
pub trait ChangeLog {
    /// Inserts a change unless one with the same timestamp exists.
    ///
    /// Returns `true` if the record was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn add(&mut self, record: &ChangeRecord) -> StorageResult<bool>;

    /// Returns every change with a timestamp strictly greater than
    /// `timestamp`, ordered ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn since(&self, timestamp: &str) -> StorageResult<Vec<ChangeRecord>>;
}

/// The current digest of each replication group of one file.
pub trait DigestStore {
    /// Returns the stored digest JSON for `group_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn for_group(&self, group_id: &str) -> StorageResult<Option<String>>;

    /// Stores `digest` as the current digest of `group_id`, replacing any
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn upsert(&mut self, group_id: &str, digest: &str) -> StorageResult<()>;
}

/// Change log and digest operations inside one atomic unit.
pub trait GroupTransaction: ChangeLog + DigestStore {}

impl<T: ChangeLog + DigestStore> GroupTransaction for T {}

/// Transactional access to each file's group storage.
///
/// Transactions on the same file are serialized. Transactions on
/// different files never wait on each other.
pub trait GroupStore: Send + Sync {
    /// Runs `f` inside a transaction on the storage of `file_id`.
    ///
    /// Everything `f` writes is committed if it returns `Ok` and discarded
    /// if it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a storage error converted into `E` if
    /// the transaction cannot be opened or committed.
    fn transaction<T, E, F>(&self, file_id: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>;
}

/// Registered files.
///
/// Mutations return [`StorageError::NotFound`] if no file has the given id.
pub trait FileRegistry: Send + Sync {
    /// Returns the file with `file_id`, deleted or not.
    fn file(&self, file_id: &str) -> StorageResult<Option<FileRecord>>;

    /// Returns the file with `file_id` if its deleted flag equals `deleted`.
    fn file_with_deleted(&self, file_id: &str, deleted: bool)
        -> StorageResult<Option<FileRecord>>;

    /// Returns every registered file.
    fn all(&self) -> StorageResult<Vec<FileRecord>>;

    /// Returns the number of registered files.
    fn count(&self) -> StorageResult<usize>;

    /// Registers a new file.
    fn add(&self, file: NewFile) -> StorageResult<()>;

    /// Updates a file after a new upload.
    fn update(
        &self,
        file_id: &str,
        sync_version: i16,
        encrypt_meta: Option<&str>,
        name: &str,
    ) -> StorageResult<()>;

    /// Clears the replication group, marking the file as awaiting upload.
    fn clear_group(&self, file_id: &str) -> StorageResult<()>;

    /// Sets the replication group.
    fn update_group(&self, file_id: &str, group_id: &str) -> StorageResult<()>;

    /// Renames a file.
    fn update_name(&self, file_id: &str, name: &str) -> StorageResult<()>;

    /// Records a new encryption key.
    fn update_encryption(
        &self,
        file_id: &str,
        salt: &str,
        key_id: &str,
        test: &str,
    ) -> StorageResult<()>;

    /// Soft-deletes a file.
    fn delete(&self, file_id: &str) -> StorageResult<()>;
}

/// Issued session tokens.
pub trait SessionStore: Send + Sync {
    /// Stores a token.
    fn add_session(&self, token: &str) -> StorageResult<()>;

    /// Returns true if `token` was issued.
    fn has_session(&self, token: &str) -> StorageResult<bool>;

    /// Returns the first issued token, if any.
    fn first_session(&self) -> StorageResult<Option<String>>;
}
