//! Opening and initializing SQLite databases.

use crate::error::{StorageError, StorageResult};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT_MS: u64 = 5_000;

const ACCOUNT_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
      id TEXT PRIMARY KEY,
      group_id TEXT,
      sync_version SMALLINT,
      encrypt_meta TEXT,
      encrypt_keyid TEXT,
      encrypt_salt TEXT,
      encrypt_test TEXT,
      deleted BOOLEAN NOT NULL DEFAULT FALSE,
      name TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS sessions (
      token TEXT PRIMARY KEY
    );";

const GROUP_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages_binary (
      timestamp TEXT PRIMARY KEY,
      is_encrypted BOOLEAN NOT NULL,
      content BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages_merkles (
      id TEXT PRIMARY KEY,
      merkle TEXT NOT NULL
    );";

/// Opens the account database holding files and sessions.
pub(crate) fn open_account(path: &Path) -> StorageResult<Connection> {
    let conn = open_connection(path)?;
    conn.execute_batch(ACCOUNT_SCHEMA)?;
    Ok(conn)
}

/// Opens one file's group database.
pub(crate) fn open_group(path: &Path) -> StorageResult<Connection> {
    let conn = open_connection(path)?;
    conn.execute_batch(GROUP_SCHEMA)?;
    Ok(conn)
}

/// Creates `dir` and its parents if needed.
pub(crate) fn ensure_dir(dir: &Path) -> StorageResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| StorageError::io(dir, source))
}

fn open_connection(path: &Path) -> StorageResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

/// Returns true if `table` exists.
#[cfg(test)]
pub(crate) fn table_exists(conn: &Connection, table: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
