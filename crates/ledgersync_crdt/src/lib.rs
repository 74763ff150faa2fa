//! # Ledgersync CRDT
//!
//! Conflict-free primitives shared by the sync server and its clients.
//!
//! This crate provides:
//! - `Timestamp`, a hybrid logical timestamp with a canonical string form
//! - `Clock`, which issues and receives timestamps
//! - `MerkleTrie`, a base-3 digest trie over minute buckets
//! - `diff`, which finds the earliest minute two digests disagree on
//!
//! This is a pure crate with no I/O operations.
//!
//! # Digest layout
//!
//! A change's minute bucket (`millis / 60000`) is written in base 3 without
//! padding, which is 16 digits for dates between 1998 and 2049. Each digit
//! picks a child, and every node on the path XORs in the change's timestamp
//! hash:
//!
//! ```rust
//! use ledgersync_crdt::{MerkleTrie, Timestamp};
//!
//! let ts = Timestamp::parse("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF").unwrap();
//! let trie = MerkleTrie::new().insert(&ts);
//!
//! assert_eq!(trie.hash(), 1_983_295_247);
//! assert_eq!(trie.descend("1210100201102200").unwrap().hash(), 1_983_295_247);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod clock;
mod error;
mod merkle;
mod murmur;
mod timestamp;

pub use clock::{Clock, MAX_DRIFT_MILLIS};
pub use error::{CrdtError, CrdtResult};
pub use merkle::{bucket_key, diff, MerkleTrie, BUCKET_MILLIS, PRUNE_WIDTH};
pub use murmur::murmur3_32;
pub use timestamp::{MutableTimestamp, Timestamp, MAX_COUNTER, MAX_MILLIS, NODE_WIDTH};
