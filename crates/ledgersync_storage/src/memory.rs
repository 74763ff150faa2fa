//! In-memory storage backend for testing.

use crate::error::{StorageError, StorageResult};
use crate::model::{validate_file_id, ChangeRecord, FileRecord, NewFile};
use crate::traits::{
    ChangeLog, DigestStore, FileRegistry, GroupStore, GroupTransaction, SessionStore,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// An in-memory storage backend.
///
/// This backend keeps everything in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral servers that don't need persistence
///
/// # Thread Safety
///
/// Each file's group storage has its own lock, so transactions on
/// different files run in parallel.
///
/// # Example
///
/// ```rust
/// use ledgersync_storage::{ChangeLog, ChangeRecord, GroupStore, InMemoryStorage, StorageError};
///
/// let storage = InMemoryStorage::new();
/// let inserted = storage
///     .transaction("f1", |txn| -> Result<bool, StorageError> {
///         txn.add(&ChangeRecord::new("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF", true, vec![1]))
///     })
///     .unwrap();
/// assert!(inserted);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    groups: Mutex<HashMap<String, Arc<Mutex<GroupData>>>>,
    files: RwLock<BTreeMap<String, FileRecord>>,
    sessions: RwLock<Vec<String>>,
}

#[derive(Debug, Default)]
struct GroupData {
    changes: BTreeMap<String, ChangeRecord>,
    digests: HashMap<String, String>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of changes stored for `file_id`.
    ///
    /// Useful for testing.
    #[must_use]
    pub fn change_count(&self, file_id: &str) -> usize {
        self.groups
            .lock()
            .get(file_id)
            .map_or(0, |group| group.lock().changes.len())
    }

    fn group(&self, file_id: &str) -> StorageResult<Arc<Mutex<GroupData>>> {
        validate_file_id(file_id)?;
        let mut groups = self.groups.lock();
        Ok(Arc::clone(groups.entry(file_id.to_string()).or_default()))
    }

    fn modify(&self, file_id: &str, f: impl FnOnce(&mut FileRecord)) -> StorageResult<()> {
        let mut files = self.files.write();
        let file = files
            .get_mut(file_id)
            .ok_or_else(|| StorageError::not_found(format!("file {file_id}")))?;
        f(file);
        Ok(())
    }
}

/// Writes staged on top of a locked group until commit.
struct MemoryGroupTxn<'a> {
    base: &'a GroupData,
    changes: BTreeMap<String, ChangeRecord>,
    digests: HashMap<String, String>,
}

impl ChangeLog for MemoryGroupTxn<'_> {
    fn add(&mut self, record: &ChangeRecord) -> StorageResult<bool> {
        if self.base.changes.contains_key(&record.timestamp)
            || self.changes.contains_key(&record.timestamp)
        {
            return Ok(false);
        }
        self.changes.insert(record.timestamp.clone(), record.clone());
        Ok(true)
    }

    fn since(&self, timestamp: &str) -> StorageResult<Vec<ChangeRecord>> {
        let range = (Bound::Excluded(timestamp), Bound::Unbounded);
        let mut records: Vec<ChangeRecord> = self
            .base
            .changes
            .range::<str, _>(range)
            .chain(self.changes.range::<str, _>(range))
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }
}

impl DigestStore for MemoryGroupTxn<'_> {
    fn for_group(&self, group_id: &str) -> StorageResult<Option<String>> {
        Ok(self
            .digests
            .get(group_id)
            .or_else(|| self.base.digests.get(group_id))
            .cloned())
    }

    fn upsert(&mut self, group_id: &str, digest: &str) -> StorageResult<()> {
        self.digests.insert(group_id.to_string(), digest.to_string());
        Ok(())
    }
}

impl GroupStore for InMemoryStorage {
    fn transaction<T, E, F>(&self, file_id: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
    {
        let group = self.group(file_id)?;
        let mut data = group.lock();

        let mut txn = MemoryGroupTxn {
            base: &data,
            changes: BTreeMap::new(),
            digests: HashMap::new(),
        };
        let value = f(&mut txn)?;

        let MemoryGroupTxn { changes, digests, .. } = txn;
        data.changes.extend(changes);
        data.digests.extend(digests);
        Ok(value)
    }
}

impl FileRegistry for InMemoryStorage {
    fn file(&self, file_id: &str) -> StorageResult<Option<FileRecord>> {
        Ok(self.files.read().get(file_id).cloned())
    }

    fn file_with_deleted(
        &self,
        file_id: &str,
        deleted: bool,
    ) -> StorageResult<Option<FileRecord>> {
        Ok(self
            .files
            .read()
            .get(file_id)
            .filter(|file| file.deleted == deleted)
            .cloned())
    }

    fn all(&self) -> StorageResult<Vec<FileRecord>> {
        Ok(self.files.read().values().cloned().collect())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.files.read().len())
    }

    fn add(&self, file: NewFile) -> StorageResult<()> {
        validate_file_id(&file.file_id)?;
        let mut files = self.files.write();
        if files.contains_key(&file.file_id) {
            return Err(StorageError::AlreadyExists {
                what: format!("file {}", file.file_id),
            });
        }
        files.insert(file.file_id.clone(), file.into());
        Ok(())
    }

    fn update(
        &self,
        file_id: &str,
        sync_version: i16,
        encrypt_meta: Option<&str>,
        name: &str,
    ) -> StorageResult<()> {
        self.modify(file_id, |file| {
            file.sync_version = sync_version;
            file.encrypt_meta = encrypt_meta.map(str::to_string);
            file.name = name.to_string();
        })
    }

    fn clear_group(&self, file_id: &str) -> StorageResult<()> {
        self.modify(file_id, |file| file.group_id = None)
    }

    fn update_group(&self, file_id: &str, group_id: &str) -> StorageResult<()> {
        self.modify(file_id, |file| file.group_id = Some(group_id.to_string()))
    }

    fn update_name(&self, file_id: &str, name: &str) -> StorageResult<()> {
        self.modify(file_id, |file| file.name = name.to_string())
    }

    fn update_encryption(
        &self,
        file_id: &str,
        salt: &str,
        key_id: &str,
        test: &str,
    ) -> StorageResult<()> {
        self.modify(file_id, |file| {
            file.encrypt_salt = Some(salt.to_string());
            file.encrypt_key_id = Some(key_id.to_string());
            file.encrypt_test = Some(test.to_string());
        })
    }

    fn delete(&self, file_id: &str) -> StorageResult<()> {
        self.modify(file_id, |file| file.deleted = true)
    }
}

impl SessionStore for InMemoryStorage {
    fn add_session(&self, token: &str) -> StorageResult<()> {
        let mut sessions = self.sessions.write();
        if !sessions.iter().any(|t| t == token) {
            sessions.push(token.to_string());
        }
        Ok(())
    }

    fn has_session(&self, token: &str) -> StorageResult<bool> {
        Ok(self.sessions.read().iter().any(|t| t == token))
    }

    fn first_session(&self) -> StorageResult<Option<String>> {
        Ok(self.sessions.read().first().cloned())
    }
}
