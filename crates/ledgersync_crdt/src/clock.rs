//! Hybrid logical clock.
//!
//! A replica issues timestamps with [`Clock::send`] and folds in timestamps
//! from other replicas with [`Clock::recv`]. Both take the current physical
//! time explicitly so callers (and tests) control the wall clock.

use crate::error::{CrdtError, CrdtResult};
use crate::merkle::MerkleTrie;
use crate::timestamp::{MutableTimestamp, Timestamp};
use tracing::debug;

/// Maximum distance the logical clock may run ahead of physical time.
pub const MAX_DRIFT_MILLIS: u64 = 60_000;

/// A replica's logical clock and the digest of every change it has seen.
#[derive(Debug, Clone)]
pub struct Clock {
    timestamp: MutableTimestamp,
    merkle: MerkleTrie,
    max_drift: u64,
}

impl Clock {
    /// Creates a clock for `node` starting at physical time zero.
    pub fn new(node: impl Into<String>) -> Self {
        Self::with_state(MutableTimestamp::new(0, 0, node), MerkleTrie::new())
    }

    /// Restores a clock from a persisted timestamp and digest.
    pub fn with_state(timestamp: MutableTimestamp, merkle: MerkleTrie) -> Self {
        Self {
            timestamp,
            merkle,
            max_drift: MAX_DRIFT_MILLIS,
        }
    }

    /// Overrides the tolerated drift.
    pub fn with_max_drift(mut self, max_drift: u64) -> Self {
        self.max_drift = max_drift;
        self
    }

    /// The last issued or observed timestamp.
    pub fn timestamp(&self) -> &MutableTimestamp {
        &self.timestamp
    }

    /// Digest of every change recorded so far.
    pub fn merkle(&self) -> &MerkleTrie {
        &self.merkle
    }

    /// Issues a timestamp for a local change at physical time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CrdtError::ClockDrift`] if the logical clock is more than the
    /// tolerated drift ahead of `now`, and [`CrdtError::CounterOverflow`] if
    /// too many changes were issued within one millisecond. The clock is left
    /// unchanged on error.
    pub fn send(&mut self, now: u64) -> CrdtResult<Timestamp> {
        let l_old = self.timestamp.millis();
        let c_old = self.timestamp.counter();

        let l_new = l_old.max(now);
        let c_new = if l_new == l_old {
            u32::from(c_old) + 1
        } else {
            0
        };

        let (millis, counter) = self.check(now, l_new, c_new)?;
        self.timestamp.set_millis(millis);
        self.timestamp.set_counter(counter);
        self.timestamp.freeze()
    }

    /// Advances the clock past a timestamp received from another replica.
    ///
    /// # Errors
    ///
    /// Returns [`CrdtError::DuplicateNode`] if `msg` carries this clock's
    /// node id, and the same drift and overflow errors as [`Clock::send`].
    /// The clock is left unchanged on error.
    pub fn recv(&mut self, now: u64, msg: &Timestamp) -> CrdtResult<Timestamp> {
        let local = self.timestamp.freeze()?;
        if msg.node() == local.node() {
            return Err(CrdtError::DuplicateNode {
                node: msg.node().to_string(),
            });
        }

        let l_msg = msg.millis();
        let c_msg = u32::from(msg.counter());
        if l_msg > now && l_msg - now > self.max_drift {
            return Err(CrdtError::ClockDrift {
                drift_millis: l_msg - now,
                max_millis: self.max_drift,
            });
        }

        let l_old = self.timestamp.millis();
        let c_old = u32::from(self.timestamp.counter());

        let l_new = l_old.max(now).max(l_msg);
        let c_new = match (l_new == l_old, l_new == l_msg) {
            (true, true) => c_old.max(c_msg) + 1,
            (true, false) => c_old + 1,
            (false, true) => c_msg + 1,
            (false, false) => 0,
        };

        let (millis, counter) = self.check(now, l_new, c_new)?;
        self.timestamp.set_millis(millis);
        self.timestamp.set_counter(counter);
        self.timestamp.freeze()
    }

    /// Records a change in the clock's digest.
    pub fn record(&mut self, timestamp: &Timestamp) {
        self.merkle = self.merkle.insert(timestamp);
    }

    /// Prunes the clock's digest.
    pub fn prune(&mut self) {
        self.merkle = self.merkle.prune();
    }

    fn check(&self, now: u64, millis: u64, counter: u32) -> CrdtResult<(u64, u16)> {
        if millis > now && millis - now > self.max_drift {
            debug!(millis, now, "logical clock drifted");
            return Err(CrdtError::ClockDrift {
                drift_millis: millis - now,
                max_millis: self.max_drift,
            });
        }
        let counter = u16::try_from(counter).map_err(|_| CrdtError::CounterOverflow)?;
        Ok((millis, counter))
    }
}
