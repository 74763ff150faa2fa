//! The `files` and `sessions` tables of the account database.

use super::SqliteStorage;
use crate::error::{StorageError, StorageResult};
use crate::model::{validate_file_id, FileRecord, NewFile};
use crate::traits::{FileRegistry, SessionStore};
use rusqlite::{params, ErrorCode, OptionalExtension, Row, ToSql};

const FILE_COLUMNS: &str = "id, group_id, sync_version, encrypt_meta, encrypt_keyid, \
                            encrypt_salt, encrypt_test, deleted, name";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        file_id: row.get(0)?,
        group_id: row.get(1)?,
        sync_version: row.get::<_, Option<i16>>(2)?.unwrap_or(0),
        encrypt_meta: row.get(3)?,
        encrypt_key_id: row.get(4)?,
        encrypt_salt: row.get(5)?,
        encrypt_test: row.get(6)?,
        deleted: row.get(7)?,
        name: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
    })
}

fn expect_updated(rows: usize, file_id: &str) -> StorageResult<()> {
    if rows == 0 {
        Err(StorageError::not_found(format!("file {file_id}")))
    } else {
        Ok(())
    }
}

impl SqliteStorage {
    fn mutate_file(&self, sql: &str, params: &[&dyn ToSql], file_id: &str) -> StorageResult<()> {
        let rows = self.account.lock().execute(sql, params)?;
        expect_updated(rows, file_id)
    }
}

impl FileRegistry for SqliteStorage {
    fn file(&self, file_id: &str) -> StorageResult<Option<FileRecord>> {
        let conn = self.account.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                params![file_id],
                file_from_row,
            )
            .optional()?)
    }

    fn file_with_deleted(
        &self,
        file_id: &str,
        deleted: bool,
    ) -> StorageResult<Option<FileRecord>> {
        let conn = self.account.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1 AND deleted = ?2"),
                params![file_id, deleted],
                file_from_row,
            )
            .optional()?)
    }

    fn all(&self) -> StorageResult<Vec<FileRecord>> {
        let conn = self.account.lock();
        let mut stmt = conn.prepare(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY id"))?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .account
            .lock()
            .query_row("SELECT count(*) FROM files", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| StorageError::Corrupted(format!("negative file count {count}")))
    }

    fn add(&self, file: NewFile) -> StorageResult<()> {
        validate_file_id(&file.file_id)?;
        let result = self.account.lock().execute(
            "INSERT INTO files (id, group_id, sync_version, name, encrypt_meta) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file.file_id,
                file.group_id,
                file.sync_version,
                file.name,
                file.encrypt_meta
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::AlreadyExists {
                    what: format!("file {}", file.file_id),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update(
        &self,
        file_id: &str,
        sync_version: i16,
        encrypt_meta: Option<&str>,
        name: &str,
    ) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET sync_version = ?1, encrypt_meta = ?2, name = ?3 WHERE id = ?4",
            params![sync_version, encrypt_meta, name, file_id],
            file_id,
        )
    }

    fn clear_group(&self, file_id: &str) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET group_id = NULL WHERE id = ?1",
            params![file_id],
            file_id,
        )
    }

    fn update_group(&self, file_id: &str, group_id: &str) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET group_id = ?1 WHERE id = ?2",
            params![group_id, file_id],
            file_id,
        )
    }

    fn update_name(&self, file_id: &str, name: &str) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET name = ?1 WHERE id = ?2",
            params![name, file_id],
            file_id,
        )
    }

    fn update_encryption(
        &self,
        file_id: &str,
        salt: &str,
        key_id: &str,
        test: &str,
    ) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET encrypt_salt = ?1, encrypt_keyid = ?2, encrypt_test = ?3 \
             WHERE id = ?4",
            params![salt, key_id, test, file_id],
            file_id,
        )
    }

    fn delete(&self, file_id: &str) -> StorageResult<()> {
        self.mutate_file(
            "UPDATE files SET deleted = TRUE WHERE id = ?1",
            params![file_id],
            file_id,
        )
    }
}

impl SessionStore for SqliteStorage {
    fn add_session(&self, token: &str) -> StorageResult<()> {
        self.account.lock().execute(
            "INSERT OR IGNORE INTO sessions (token) VALUES (?1)",
            params![token],
        )?;
        Ok(())
    }

    fn has_session(&self, token: &str) -> StorageResult<bool> {
        let count: i64 = self.account.lock().query_row(
            "SELECT count(*) FROM sessions WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn first_session(&self) -> StorageResult<Option<String>> {
        Ok(self
            .account
            .lock()
            .query_row("SELECT token FROM sessions ORDER BY rowid LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?)
    }
}
