//! SQLite storage backend.
//!
//! Layout on disk:
//!
//! ```text
//! <server_files>/account.sqlite      files, sessions
//! <user_files>/<file_id>.sqlite      messages_binary, messages_merkles
//! ```
//!
//! Each file's group database is opened once and kept behind its own lock,
//! which also serializes transactions on that file.

mod connection;
mod group;
mod registry;

use crate::error::StorageResult;
use crate::model::validate_file_id;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Name of the account database inside the server files directory.
pub const ACCOUNT_DB: &str = "account.sqlite";

/// A storage backend persisting to SQLite files.
#[derive(Debug)]
pub struct SqliteStorage {
    server_files: PathBuf,
    user_files: PathBuf,
    account: Mutex<Connection>,
    groups: Mutex<HashMap<String, Arc<Mutex<Connection>>>>,
}

impl SqliteStorage {
    /// Opens (or creates) storage under the given directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or the account
    /// database cannot be opened.
    pub fn open(
        server_files: impl Into<PathBuf>,
        user_files: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let server_files = server_files.into();
        let user_files = user_files.into();
        connection::ensure_dir(&server_files)?;
        connection::ensure_dir(&user_files)?;

        let account = connection::open_account(&server_files.join(ACCOUNT_DB))?;
        debug!(
            server_files = %server_files.display(),
            user_files = %user_files.display(),
            "opened sqlite storage"
        );

        Ok(Self {
            server_files,
            user_files,
            account: Mutex::new(account),
            groups: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the account database.
    pub fn server_files(&self) -> &Path {
        &self.server_files
    }

    /// Directory holding one group database per file.
    pub fn user_files(&self) -> &Path {
        &self.user_files
    }

    /// Path of the group database for `file_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFileId`](crate::StorageError::InvalidFileId)
    /// if `file_id` is not a safe file name.
    pub fn group_path(&self, file_id: &str) -> StorageResult<PathBuf> {
        validate_file_id(file_id)?;
        Ok(self.user_files.join(format!("{file_id}.sqlite")))
    }

    fn group(&self, file_id: &str) -> StorageResult<Arc<Mutex<Connection>>> {
        let path = self.group_path(file_id)?;
        let mut groups = self.groups.lock();
        if let Some(conn) = groups.get(file_id) {
            return Ok(Arc::clone(conn));
        }

        let conn = Arc::new(Mutex::new(connection::open_group(&path)?));
        debug!(file_id, path = %path.display(), "opened group database");
        groups.insert(file_id.to_string(), Arc::clone(&conn));
        Ok(conn)
    }
}
