//! Storage configuration and backend selection.

use crate::error::{StorageError, StorageResult};
use crate::memory::InMemoryStorage;
use crate::model::{FileRecord, NewFile};
use crate::sqlite::SqliteStorage;
use crate::traits::{FileRegistry, GroupStore, GroupTransaction, SessionStore};
use std::path::{Path, PathBuf};

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Keep everything in memory.
    Memory,
    /// Persist to SQLite files.
    Sqlite {
        /// Directory for the account database.
        server_files: PathBuf,
        /// Directory for per-file group databases.
        user_files: PathBuf,
    },
}

impl StorageConfig {
    /// SQLite storage under `data_dir/server-files` and `data_dir/user-files`.
    pub fn sqlite_in(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self::Sqlite {
            server_files: data_dir.join("server-files"),
            user_files: data_dir.join("user-files"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// An opened storage backend.
#[derive(Debug)]
pub enum Storage {
    /// In-memory backend.
    Memory(InMemoryStorage),
    /// SQLite backend.
    Sqlite(SqliteStorage),
}

impl Storage {
    /// Opens the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQLite directories or account database
    /// cannot be created.
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        match config {
            StorageConfig::Memory => Ok(Self::Memory(InMemoryStorage::new())),
            StorageConfig::Sqlite {
                server_files,
                user_files,
            } => Ok(Self::Sqlite(SqliteStorage::open(server_files, user_files)?)),
        }
    }
}

impl GroupStore for Storage {
    fn transaction<T, E, F>(&self, file_id: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
    {
        match self {
            Self::Memory(storage) => storage.transaction(file_id, f),
            Self::Sqlite(storage) => storage.transaction(file_id, f),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $storage:ident => $call:expr) => {
        match $self {
            Self::Memory($storage) => $call,
            Self::Sqlite($storage) => $call,
        }
    };
}

impl FileRegistry for Storage {
    fn file(&self, file_id: &str) -> StorageResult<Option<FileRecord>> {
        dispatch!(self, s => s.file(file_id))
    }

    fn file_with_deleted(
        &self,
        file_id: &str,
        deleted: bool,
    ) -> StorageResult<Option<FileRecord>> {
        dispatch!(self, s => s.file_with_deleted(file_id, deleted))
    }

    fn all(&self) -> StorageResult<Vec<FileRecord>> {
        dispatch!(self, s => s.all())
    }

    fn count(&self) -> StorageResult<usize> {
        dispatch!(self, s => s.count())
    }

    fn add(&self, file: NewFile) -> StorageResult<()> {
        dispatch!(self, s => s.add(file))
    }

    fn update(
        &self,
        file_id: &str,
        sync_version: i16,
        encrypt_meta: Option<&str>,
        name: &str,
    ) -> StorageResult<()> {
        dispatch!(self, s => s.update(file_id, sync_version, encrypt_meta, name))
    }

    fn clear_group(&self, file_id: &str) -> StorageResult<()> {
        dispatch!(self, s => s.clear_group(file_id))
    }

    fn update_group(&self, file_id: &str, group_id: &str) -> StorageResult<()> {
        dispatch!(self, s => s.update_group(file_id, group_id))
    }

    fn update_name(&self, file_id: &str, name: &str) -> StorageResult<()> {
        dispatch!(self, s => s.update_name(file_id, name))
    }

    fn update_encryption(
        &self,
        file_id: &str,
        salt: &str,
        key_id: &str,
        test: &str,
    ) -> StorageResult<()> {
        dispatch!(self, s => s.update_encryption(file_id, salt, key_id, test))
    }

    fn delete(&self, file_id: &str) -> StorageResult<()> {
        dispatch!(self, s => s.delete(file_id))
    }
}

impl SessionStore for Storage {
    fn add_session(&self, token: &str) -> StorageResult<()> {
        dispatch!(self, s => s.add_session(token))
    }

    fn has_session(&self, token: &str) -> StorageResult<bool> {
        dispatch!(self, s => s.has_session(token))
    }

    fn first_session(&self) -> StorageResult<Option<String>> {
        dispatch!(self, s => s.first_session())
    }
}
