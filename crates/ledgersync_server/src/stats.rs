//! Sync round counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared by every round a server handles.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    rounds: AtomicU64,
    rejections: AtomicU64,
    changes_received: AtomicU64,
    changes_applied: AtomicU64,
    changes_sent: AtomicU64,
}

impl StatsCounters {
    /// Records the size of an incoming batch that passed the gates.
    pub(crate) fn record_received(&self, count: usize) {
        self.changes_received
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Records a committed round.
    pub(crate) fn record_round(&self, applied: usize, sent: usize) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        self.changes_applied
            .fetch_add(applied as u64, Ordering::Relaxed);
        self.changes_sent.fetch_add(sent as u64, Ordering::Relaxed);
    }

    /// Records a round refused by a gate.
    pub(crate) fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        SyncStats {
            rounds: self.rounds.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            changes_received: self.changes_received.load(Ordering::Relaxed),
            changes_applied: self.changes_applied.load(Ordering::Relaxed),
            changes_sent: self.changes_sent.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the server's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncStats {
    /// Rounds that committed.
    pub rounds: u64,
    /// Rounds refused by a gate, including failed authentication.
    pub rejections: u64,
    /// Changes received in rounds that passed the gates.
    pub changes_received: u64,
    /// Changes that were new and got stored.
    pub changes_applied: u64,
    /// Changes returned to clients.
    pub changes_sent: u64,
}

impl SyncStats {
    /// Received changes that were already stored.
    pub fn duplicates(&self) -> u64 {
        self.changes_received.saturating_sub(self.changes_applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_rounds() {
        let stats = StatsCounters::default();
        stats.record_received(5);
        stats.record_round(3, 2);
        stats.record_rejection();

        let snap = stats.snapshot();
        assert_eq!(
            snap,
            SyncStats {
                rounds: 1,
                rejections: 1,
                changes_received: 5,
                changes_applied: 3,
                changes_sent: 2,
            }
        );
        assert_eq!(snap.duplicates(), 2);
    }

    #[test]
    fn concurrent_updates() {
        let stats = Arc::new(StatsCounters::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_round(1, 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.snapshot().rounds, 400);
        assert_eq!(stats.snapshot().changes_applied, 400);
    }
}
