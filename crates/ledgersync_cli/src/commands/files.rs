//! Files command implementation.

use ledgersync_storage::{FileRecord, FileRegistry};
use serde::Serialize;

/// One row of the file listing.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FileSummary {
    /// File id.
    pub file_id: String,
    /// Display name.
    pub name: String,
    /// Current replication group.
    pub group_id: Option<String>,
    /// Format version the file was uploaded with.
    pub sync_version: i16,
    /// Id of the key the file is encrypted with.
    pub key_id: Option<String>,
    /// Whether the file was deleted.
    pub deleted: bool,
}

impl From<FileRecord> for FileSummary {
    fn from(file: FileRecord) -> Self {
        Self {
            file_id: file.file_id,
            name: file.name,
            group_id: file.group_id,
            sync_version: file.sync_version,
            key_id: file.encrypt_key_id,
            deleted: file.deleted,
        }
    }
}

/// Lists registered files, skipping deleted ones unless `include_deleted`.
pub fn list<R: FileRegistry>(
    registry: &R,
    include_deleted: bool,
) -> Result<Vec<FileSummary>, Box<dyn std::error::Error>> {
    Ok(registry
        .all()?
        .into_iter()
        .filter(|file| include_deleted || !file.deleted)
        .map(FileSummary::from)
        .collect())
}

/// Runs the files command.
pub fn run<R: FileRegistry>(
    registry: &R,
    include_deleted: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = list(registry, include_deleted)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        _ => {
            if files.is_empty() {
                println!("No files registered");
                return Ok(());
            }
            println!(
                "{:<38} {:<38} {:>7}  {}",
                "FILE", "GROUP", "VERSION", "NAME"
            );
            for file in &files {
                let marker = if file.deleted { " (deleted)" } else { "" };
                println!(
                    "{:<38} {:<38} {:>7}  {}{}",
                    file.file_id,
                    file.group_id.as_deref().unwrap_or("-"),
                    file.sync_version,
                    file.name,
                    marker
                );
            }
        }
    }

    Ok(())
}
