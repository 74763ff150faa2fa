//! Behaviour shared by every storage backend.

use ledgersync_storage::{
    ChangeRecord, FileRegistry, GroupStore, NewFile, Storage, StorageConfig, StorageError,
    StorageResult,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Opens one of each backend. The temp dir must outlive the storage.
fn backends() -> Vec<(TempDir, Storage)> {
    let memory_dir = tempfile::tempdir().unwrap();
    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite = Storage::open(&StorageConfig::sqlite_in(sqlite_dir.path())).unwrap();
    vec![
        (memory_dir, Storage::open(&StorageConfig::Memory).unwrap()),
        (sqlite_dir, sqlite),
    ]
}

fn stamp(minute: u32, counter: u16) -> String {
    format!(
        "2018-11-12T13:{:02}:00.000Z-{counter:04X}-0123456789ABCDEF",
        minute % 60
    )
}

fn record(ts: &str) -> ChangeRecord {
    ChangeRecord::new(ts, true, ts.as_bytes().to_vec())
}

#[test]
fn batch_commits_atomically() {
    for (_dir, storage) in backends() {
        let batch: Vec<_> = (0..5).map(|i| record(&stamp(i, 0))).collect();

        let inserted = storage
            .transaction("f1", |txn| -> StorageResult<usize> {
                let mut inserted = 0;
                for change in &batch {
                    if txn.add(change)? {
                        inserted += 1;
                    }
                }
                txn.upsert("g1", r#"{"hash":5}"#)?;
                Ok(inserted)
            })
            .unwrap();
        assert_eq!(inserted, 5);

        // A failing batch leaves the committed one untouched.
        let err = storage
            .transaction("f1", |txn| -> StorageResult<()> {
                txn.add(&record(&stamp(30, 0)))?;
                txn.upsert("g1", r#"{"hash":6}"#)?;
                Err(StorageError::Corrupted("bad record".into()))
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));

        let (changes, digest) = storage
            .transaction("f1", |txn| -> StorageResult<_> {
                Ok((txn.since("")?, txn.for_group("g1")?))
            })
            .unwrap();
        assert_eq!(changes, batch);
        assert_eq!(digest.as_deref(), Some(r#"{"hash":5}"#));
    }
}

#[test]
fn parallel_writers_on_one_file() {
    for (_dir, storage) in backends() {
        let storage = Arc::new(storage);
        let handles: Vec<_> = (0..4u16)
            .map(|worker| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for i in 0..10 {
                        storage
                            .transaction("shared", |txn| -> StorageResult<bool> {
                                txn.add(&record(&stamp(i, worker)))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let changes = storage
            .transaction("shared", |txn| -> StorageResult<_> { txn.since("") })
            .unwrap();
        assert_eq!(changes.len(), 40);
        assert!(changes.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}

#[test]
fn registry_round_trip() {
    for (_dir, storage) in backends() {
        storage
            .add(NewFile::new("f1", "g1", 2).with_encrypt_meta(r#"{"keyId":"k1"}"#))
            .unwrap();
        storage.update_encryption("f1", "salt", "k1", "test").unwrap();

        let file = storage.file("f1").unwrap().unwrap();
        assert_eq!(file.encrypt_key_id.as_deref(), Some("k1"));
        assert_eq!(storage.all().unwrap(), vec![file]);
        assert!(matches!(
            storage.add(NewFile::new("../f1", "g1", 2)),
            Err(StorageError::InvalidFileId { .. })
        ));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn since_returns_distinct_sorted_suffix(
        stamps in prop::collection::vec((0u32..60, 0u16..4), 0..30),
        cut in (0u32..60, 0u16..4),
    ) {
        for (_dir, storage) in backends() {
            let stamps: Vec<String> = stamps.iter().map(|(m, c)| stamp(*m, *c)).collect();
            let cut = stamp(cut.0, cut.1);

            let changes = storage
                .transaction("f1", |txn| -> StorageResult<_> {
                    for ts in &stamps {
                        txn.add(&record(ts))?;
                    }
                    txn.since(&cut)
                })
                .unwrap();

            let expected: Vec<String> = stamps
                .iter()
                .filter(|ts| ts.as_str() > cut.as_str())
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let got: Vec<String> = changes.into_iter().map(|c| c.timestamp).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
