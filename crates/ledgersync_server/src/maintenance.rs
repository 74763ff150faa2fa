//! Offline digest inspection and verification.
//!
//! These run against storage directly, outside any sync round, and are
//! what the `ledgersync` operator commands are built on.

use crate::error::{ServerError, ServerResult};
use ledgersync_crdt::{diff, MerkleTrie, Timestamp};
use ledgersync_storage::{FileRecord, FileRegistry, GroupStore};
use serde::Serialize;
use tracing::{debug, warn};

/// Result of comparing a stored digest against its change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestReport {
    /// File checked.
    pub file_id: String,
    /// Group whose digest was checked.
    pub group_id: String,
    /// Number of changes in the log.
    pub change_count: usize,
    /// Root hash of the stored digest, if one exists.
    pub stored_hash: Option<u32>,
    /// Root hash of the digest rebuilt from the log.
    pub rebuilt_hash: u32,
    /// Start of the first minute where the two disagree.
    pub diverges_at: Option<u64>,
}

impl DigestReport {
    /// Returns true if the stored digest agrees with the log.
    ///
    /// A missing digest agrees only with an empty log.
    pub fn is_consistent(&self) -> bool {
        self.diverges_at.is_none() && (self.stored_hash.is_some() || self.change_count == 0)
    }
}

fn current_group(file: &FileRecord) -> ServerResult<&str> {
    match file.group_id.as_deref() {
        Some(group_id) if !group_id.is_empty() => Ok(group_id),
        _ => Err(ServerError::invalid_request(format!(
            "file {} has no replication group",
            file.file_id
        ))),
    }
}

fn registered_file<S: FileRegistry>(storage: &S, file_id: &str) -> ServerResult<FileRecord> {
    storage.file(file_id)?.ok_or_else(|| {
        ServerError::invalid_request(format!("file {file_id} is not registered"))
    })
}

/// Loads the stored digest of the file's current group.
///
/// # Errors
///
/// Returns an error if the file is unknown, has no group, or its digest is
/// not valid JSON.
pub fn load_digest<S>(storage: &S, file_id: &str) -> ServerResult<Option<MerkleTrie>>
where
    S: GroupStore + FileRegistry,
{
    let file = registered_file(storage, file_id)?;
    let group_id = current_group(&file)?;
    storage.transaction(file_id, |txn| -> ServerResult<_> {
        match txn.for_group(group_id)? {
            Some(json) => Ok(Some(MerkleTrie::from_json(&json)?)),
            None => Ok(None),
        }
    })
}

/// Rebuilds the pruned digest of a file from its full change log.
///
/// Returns the trie and the number of changes folded into it.
///
/// # Errors
///
/// Returns an error if storage fails or a stored timestamp is malformed.
pub fn rebuild_digest<S: GroupStore>(
    storage: &S,
    file_id: &str,
) -> ServerResult<(MerkleTrie, usize)> {
    let changes =
        storage.transaction(file_id, |txn| -> ServerResult<_> { Ok(txn.since("")?) })?;

    let mut trie = MerkleTrie::new();
    for change in &changes {
        let timestamp =
            Timestamp::parse(&change.timestamp).map_err(ServerError::InvalidChange)?;
        trie = trie.insert(&timestamp);
    }
    debug!(file_id, changes = changes.len(), "rebuilt digest from change log");
    Ok((trie.prune(), changes.len()))
}

/// Compares the stored digest of a file against one rebuilt from its log.
///
/// # Errors
///
/// See [`load_digest`] and [`rebuild_digest`].
pub fn verify_digest<S>(storage: &S, file_id: &str) -> ServerResult<DigestReport>
where
    S: GroupStore + FileRegistry,
{
    let file = registered_file(storage, file_id)?;
    let group_id = current_group(&file)?.to_string();
    let stored = load_digest(storage, file_id)?;
    let (rebuilt, change_count) = rebuild_digest(storage, file_id)?;

    // Pruning once and pruning every round keep different interior nodes,
    // so only hashes along the divergence walk are compared.
    let diverges_at = match &stored {
        Some(stored) => diff(stored, &rebuilt),
        None => diff(&MerkleTrie::new(), &rebuilt),
    };
    if let Some(millis) = diverges_at {
        warn!(file_id, group_id = %group_id, millis, "stored digest diverges from change log");
    }

    Ok(DigestReport {
        file_id: file.file_id,
        group_id,
        change_count,
        stored_hash: stored.as_ref().map(MerkleTrie::hash),
        rebuilt_hash: rebuilt.hash(),
        diverges_at,
    })
}
