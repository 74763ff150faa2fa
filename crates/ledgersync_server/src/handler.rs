//! Request handler for sync rounds.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::outcome::{Rejection, SyncOutcome};
use crate::protocol::{ChangeEnvelope, SyncRequest, SyncResponse};
use crate::stats::StatsCounters;
use ledgersync_crdt::{MerkleTrie, Timestamp};
use ledgersync_storage::{ChangeRecord, FileRecord, FileRegistry, GroupStore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// The part of a file's encryption metadata the gates read.
#[derive(Debug, Default, Deserialize)]
struct EncryptMeta {
    #[serde(rename = "keyId", default)]
    key_id: Option<String>,
}

/// What an accepted round wrote and returns.
struct Applied {
    response: SyncResponse,
    inserted: usize,
    root_hash: u32,
}

/// Handles sync rounds against one storage backend.
pub(crate) struct SyncHandler<S> {
    storage: Arc<S>,
    config: ServerConfig,
    stats: Arc<StatsCounters>,
}

impl<S: GroupStore + FileRegistry> SyncHandler<S> {
    pub(crate) fn new(storage: Arc<S>, config: ServerConfig, stats: Arc<StatsCounters>) -> Self {
        Self {
            storage,
            config,
            stats,
        }
    }

    pub(crate) fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub(crate) fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs one authenticated sync round.
    pub(crate) fn handle(&self, request: &SyncRequest) -> ServerResult<SyncOutcome> {
        if request.since.is_empty() {
            return Err(ServerError::invalid_request("`since` is required"));
        }
        if let Some(max) = self.config.max_batch_size {
            if request.changes.len() > max {
                return Err(ServerError::invalid_request(format!(
                    "batch of {} changes exceeds limit of {max}",
                    request.changes.len()
                )));
            }
        }

        let file = match self.storage.file(&request.file_id)? {
            Some(file) => file,
            None => return Ok(self.reject(request, Rejection::FileNotFound)),
        };
        let group_id = match self.check_gates(&file, request)? {
            Ok(group_id) => group_id,
            Err(rejection) => return Ok(self.reject(request, rejection)),
        };

        self.stats.record_received(request.changes.len());
        let applied = self.apply(&file.file_id, group_id, request)?;
        self.stats
            .record_round(applied.inserted, applied.response.changes.len());

        info!(
            file_id = %file.file_id,
            group_id,
            received = request.changes.len(),
            inserted = applied.inserted,
            sent = applied.response.changes.len(),
            root_hash = applied.root_hash,
            "sync round complete"
        );
        Ok(SyncOutcome::Synced(applied.response))
    }

    /// Returns the file's group id if every gate passes.
    ///
    /// Gates run in a fixed order and the first failure wins.
    fn check_gates<'f>(
        &self,
        file: &'f FileRecord,
        request: &SyncRequest,
    ) -> ServerResult<Result<&'f str, Rejection>> {
        if file.sync_version < self.config.min_sync_version {
            return Ok(Err(Rejection::FileTooOld));
        }

        let group_id = match file.group_id.as_deref() {
            Some(group_id) if !group_id.is_empty() && !request.group_id.is_empty() => group_id,
            _ => return Ok(Err(Rejection::NeedsUpload)),
        };

        let registered_key = file.encrypt_key_id.as_deref().unwrap_or_default();
        let meta = match file.encrypt_meta.as_deref() {
            Some(meta) if !meta.is_empty() => {
                serde_json::from_str::<EncryptMeta>(meta).map_err(|source| {
                    ServerError::InvalidMetadata {
                        file_id: file.file_id.clone(),
                        source,
                    }
                })?
            }
            _ => EncryptMeta::default(),
        };
        if meta.key_id.as_deref().unwrap_or_default() != registered_key {
            return Ok(Err(Rejection::KeyMismatch));
        }

        if request.group_id != group_id {
            return Ok(Err(Rejection::HasBeenReset));
        }
        if request.key_id != registered_key {
            return Ok(Err(Rejection::HasNewKey));
        }

        Ok(Ok(group_id))
    }

    /// Merges the batch, persists the pruned digest and collects the delta
    /// in one transaction.
    fn apply(&self, file_id: &str, group_id: &str, request: &SyncRequest) -> ServerResult<Applied> {
        self.storage.transaction(file_id, |txn| -> ServerResult<Applied> {
            // Read before merging so the client's own changes are not echoed.
            let delta = txn.since(&request.since)?;

            let mut trie = match txn.for_group(group_id)? {
                Some(json) => MerkleTrie::from_json(&json)?,
                None => MerkleTrie::new(),
            };

            let mut inserted = 0;
            for change in &request.changes {
                let timestamp =
                    Timestamp::parse(&change.timestamp).map_err(ServerError::InvalidChange)?;
                // Canonical key: equal timestamps are one row and one fold.
                let record = ChangeRecord::new(
                    timestamp.to_string(),
                    change.is_encrypted,
                    change.content.clone(),
                );
                if txn.add(&record)? {
                    trie = trie.insert(&timestamp);
                    inserted += 1;
                }
            }

            let trie = trie.prune();
            let digest = trie.to_json()?;
            txn.upsert(group_id, &digest)?;

            Ok(Applied {
                response: SyncResponse {
                    digest,
                    changes: delta.into_iter().map(ChangeEnvelope::from).collect(),
                },
                inserted,
                root_hash: trie.hash(),
            })
        })
    }

    fn reject(&self, request: &SyncRequest, rejection: Rejection) -> SyncOutcome {
        self.stats.record_rejection();
        debug!(
            file_id = %request.file_id,
            group_id = %request.group_id,
            code = rejection.code(),
            "sync round rejected"
        );
        SyncOutcome::Rejected(rejection)
    }
}
