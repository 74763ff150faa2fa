//! Per-file change log and digest tables.

use super::SqliteStorage;
use crate::error::{StorageError, StorageResult};
use crate::model::ChangeRecord;
use crate::traits::{ChangeLog, DigestStore, GroupStore, GroupTransaction};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

/// Statements run inside an open transaction.
struct SqliteGroupTxn<'a> {
    conn: &'a Connection,
}

impl ChangeLog for SqliteGroupTxn<'_> {
    fn add(&mut self, record: &ChangeRecord) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO messages_binary (timestamp, is_encrypted, content) \
             VALUES (?1, ?2, ?3)",
            params![record.timestamp, record.is_encrypted, record.content],
        )?;
        Ok(inserted > 0)
    }

    fn since(&self, timestamp: &str) -> StorageResult<Vec<ChangeRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT timestamp, is_encrypted, content FROM messages_binary \
             WHERE timestamp > ?1 ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![timestamp], |row| {
            Ok(ChangeRecord {
                timestamp: row.get(0)?,
                is_encrypted: row.get(1)?,
                content: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl DigestStore for SqliteGroupTxn<'_> {
    fn for_group(&self, group_id: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT merkle FROM messages_merkles WHERE id = ?1",
                params![group_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn upsert(&mut self, group_id: &str, digest: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO messages_merkles (id, merkle) VALUES (?1, ?2) \
             ON CONFLICT (id) DO UPDATE SET merkle = excluded.merkle",
            params![group_id, digest],
        )?;
        Ok(())
    }
}

impl GroupStore for SqliteStorage {
    fn transaction<T, E, F>(&self, file_id: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
    {
        let handle = self.group(file_id)?;
        let mut conn = handle.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        // Dropping `tx` without committing rolls back.
        let value = f(&mut SqliteGroupTxn { conn: &tx })?;
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }
}
