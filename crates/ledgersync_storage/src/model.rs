//! Stored record types.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// One encrypted change, keyed by its canonical timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Canonical timestamp string; unique within a file.
    pub timestamp: String,
    /// Whether `content` is encrypted.
    pub is_encrypted: bool,
    /// Opaque change payload.
    pub content: Vec<u8>,
}

impl ChangeRecord {
    /// Creates a change record.
    pub fn new(
        timestamp: impl Into<String>,
        is_encrypted: bool,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            is_encrypted,
            content: content.into(),
        }
    }
}

/// A registered file and its sync state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// File id.
    pub file_id: String,
    /// Current replication group, `None` while awaiting an upload.
    pub group_id: Option<String>,
    /// Sync format version the file was uploaded with.
    pub sync_version: i16,
    /// Encryption metadata JSON, carrying `keyId`.
    pub encrypt_meta: Option<String>,
    /// Registered encryption key id.
    pub encrypt_key_id: Option<String>,
    /// Key derivation salt.
    pub encrypt_salt: Option<String>,
    /// Key verification payload.
    pub encrypt_test: Option<String>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Display name.
    pub name: String,
}

/// Fields supplied when registering a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    /// File id.
    pub file_id: String,
    /// Initial replication group.
    pub group_id: Option<String>,
    /// Sync format version.
    pub sync_version: i16,
    /// Encryption metadata JSON.
    pub encrypt_meta: Option<String>,
    /// Display name.
    pub name: String,
}

impl NewFile {
    /// Creates a new file registration with no encryption metadata.
    pub fn new(file_id: impl Into<String>, group_id: impl Into<String>, sync_version: i16) -> Self {
        Self {
            file_id: file_id.into(),
            group_id: Some(group_id.into()),
            sync_version,
            encrypt_meta: None,
            name: String::new(),
        }
    }

    /// Sets the encryption metadata JSON.
    pub fn with_encrypt_meta(mut self, meta: impl Into<String>) -> Self {
        self.encrypt_meta = Some(meta.into());
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers the file without a replication group.
    pub fn without_group(mut self) -> Self {
        self.group_id = None;
        self
    }
}

impl From<NewFile> for FileRecord {
    fn from(file: NewFile) -> Self {
        Self {
            file_id: file.file_id,
            group_id: file.group_id,
            sync_version: file.sync_version,
            encrypt_meta: file.encrypt_meta,
            encrypt_key_id: None,
            encrypt_salt: None,
            encrypt_test: None,
            deleted: false,
            name: file.name,
        }
    }
}

/// Checks that a file id is safe to use as a storage name.
///
/// Accepts non-empty ids of ASCII alphanumerics, `-` and `_`.
pub fn validate_file_id(file_id: &str) -> StorageResult<()> {
    let valid = !file_id.is_empty()
        && file_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFileId {
            file_id: file_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids() {
        for ok in ["f1", "0b5e-44a1_x", "ABC"] {
            assert!(validate_file_id(ok).is_ok(), "{ok}");
        }
        for bad in ["", "../etc", "a/b", "a b", "f.sqlite", "é"] {
            assert!(
                matches!(
                    validate_file_id(bad),
                    Err(StorageError::InvalidFileId { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn new_file_into_record() {
        let record: FileRecord = NewFile::new("f1", "g1", 2)
            .with_encrypt_meta(r#"{"keyId":"k1"}"#)
            .with_name("Budget")
            .into();

        assert_eq!(record.group_id.as_deref(), Some("g1"));
        assert_eq!(record.encrypt_key_id, None);
        assert!(!record.deleted);
        assert_eq!(record.name, "Budget");
    }

    #[test]
    fn change_record_serde() {
        let record = ChangeRecord::new(
            "2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF",
            true,
            b"x".to_vec(),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"isEncrypted\":true"));

        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
