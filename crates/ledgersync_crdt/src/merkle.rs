//! Persistent Merkle digest trie.
//!
//! Each timestamp is filed under its minute bucket (`millis / 60_000`)
//! written in base 3, most significant digit first. Every node on the path
//! XORs the timestamp hash into its own `hash`, so a node always summarises
//! everything ever inserted beneath it, including subtrees that pruning has
//! since discarded.
//!
//! The trie is an immutable value. `insert` and `prune` return new roots and
//! share untouched subtrees through `Arc`; no node reachable from an earlier
//! root is ever mutated.
//!
//! ## Canonical JSON
//!
//! ```text
//! {"1":{"2":{...,"hash":1983295247},"hash":565800531},"hash":565800531}
//! ```
//!
//! Keys appear in byte order, children and `"hash"` interleaved as a sorted
//! map would emit them. `hash` is written as a signed 32-bit integer and is
//! omitted when zero. A child that would encode to `{}` is omitted.

use crate::error::CrdtResult;
use crate::timestamp::Timestamp;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

/// Number of children kept per node by [`MerkleTrie::prune`].
pub const PRUNE_WIDTH: usize = 2;

/// Width of one time bucket in milliseconds.
pub const BUCKET_MILLIS: u64 = 60_000;

const HASH_FIELD: &str = "hash";

/// A node of the digest trie. The root node is the trie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTrie {
    hash: u32,
    children: BTreeMap<char, Arc<MerkleTrie>>,
}

impl MerkleTrie {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR of every hash inserted beneath this node.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns true for a node with zero hash and no children.
    pub fn is_empty(&self) -> bool {
        self.hash == 0 && self.children.is_empty()
    }

    /// Returns true if this node encodes to `{}`: zero hash and nothing
    /// but blank nodes beneath it.
    fn is_blank(&self) -> bool {
        self.hash == 0 && self.children.values().all(|child| child.is_blank())
    }

    /// Child keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.children.keys().copied()
    }

    /// Returns the child under `key`.
    pub fn child(&self, key: char) -> Option<&MerkleTrie> {
        self.children.get(&key).map(|child| child.as_ref())
    }

    /// Follows `path` from this node.
    pub fn descend(&self, path: &str) -> Option<&MerkleTrie> {
        path.chars().try_fold(self, |node, key| node.child(key))
    }

    /// Total number of nodes, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .values()
            .map(|child| child.node_count())
            .sum::<usize>()
    }

    /// Length of the longest path below this node.
    pub fn depth(&self) -> usize {
        self.children
            .values()
            .map(|child| 1 + child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Returns a new trie with `timestamp` folded in.
    pub fn insert(&self, timestamp: &Timestamp) -> MerkleTrie {
        self.insert_hash(timestamp.millis(), timestamp.hash())
    }

    /// Returns a new trie with `hash` folded in under the bucket of `millis`.
    pub fn insert_hash(&self, millis: u64, hash: u32) -> MerkleTrie {
        let key: Vec<char> = bucket_key(millis).chars().collect();
        self.insert_path(&key, hash)
    }

    fn insert_path(&self, key: &[char], hash: u32) -> MerkleTrie {
        let mut node = MerkleTrie {
            hash: self.hash ^ hash,
            children: self.children.clone(),
        };
        if let Some((first, rest)) = key.split_first() {
            let child = match self.children.get(first) {
                Some(existing) => existing.insert_path(rest, hash),
                None => MerkleTrie::default().insert_path(rest, hash),
            };
            node.children.insert(*first, Arc::new(child));
        }
        node
    }

    /// Returns a new trie keeping only the [`PRUNE_WIDTH`] greatest child
    /// keys at every node.
    ///
    /// Hashes are never changed: every surviving node still accounts for
    /// the discarded subtrees.
    pub fn prune(&self) -> MerkleTrie {
        let skip = self.children.len().saturating_sub(PRUNE_WIDTH);
        let children = self
            .children
            .iter()
            .skip(skip)
            .map(|(key, child)| (*key, Arc::new(child.prune())))
            .collect();
        MerkleTrie {
            hash: self.hash,
            children,
        }
    }

    /// Encodes the trie as canonical JSON.
    pub fn to_json(&self) -> CrdtResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes canonical JSON.
    ///
    /// Syntactically invalid JSON is an error. A structurally incomplete
    /// node (not an object, or an object without `hash`) decodes to an
    /// empty node: stored digests written by older servers rely on this.
    /// A node whose hash XORs to zero is encoded without `hash`, so it too
    /// decodes empty, children included.
    pub fn from_json(json: &str) -> CrdtResult<MerkleTrie> {
        Ok(serde_json::from_str(json)?)
    }

    fn from_value(value: &Value) -> MerkleTrie {
        let Some(map) = value.as_object() else {
            warn!(?value, "digest node is not an object, decoding as empty");
            return MerkleTrie::default();
        };

        let Some(hash) = map.get(HASH_FIELD).and_then(decode_hash) else {
            if !map.is_empty() {
                warn!(
                    children = map.len(),
                    "digest node without hash, decoding as empty"
                );
            }
            return MerkleTrie::default();
        };

        let mut children = BTreeMap::new();
        for (key, child) in map {
            if key == HASH_FIELD {
                continue;
            }
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(digit), None) => {
                    children.insert(digit, Arc::new(Self::from_value(child)));
                }
                _ => warn!(key = %key, "ignoring digest child with multi-character key"),
            }
        }

        MerkleTrie { hash, children }
    }
}

impl Serialize for MerkleTrie {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(String, Entry<'_>)> = self
            .children
            .iter()
            .filter(|(_, child)| !child.is_blank())
            .map(|(key, child)| (key.to_string(), Entry::Child(child)))
            .collect();
        if self.hash != 0 {
            // Two's complement reinterpretation, the way clients store it.
            entries.push((HASH_FIELD.to_string(), Entry::Hash(self.hash as i32)));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, entry) in &entries {
            match entry {
                Entry::Child(child) => map.serialize_entry(key, child.as_ref())?,
                Entry::Hash(hash) => map.serialize_entry(key, hash)?,
            }
        }
        map.end()
    }
}

enum Entry<'a> {
    Child(&'a Arc<MerkleTrie>),
    Hash(i32),
}

impl<'de> Deserialize<'de> for MerkleTrie {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Accepts both the signed form clients write and an unsigned form.
fn decode_hash(value: &Value) -> Option<u32> {
    if let Some(hash) = value.as_i64() {
        return Some(hash as u32);
    }
    if let Some(hash) = value.as_u64() {
        return Some(hash as u32);
    }
    value.as_f64().map(|hash| hash as i64 as u32)
}

/// Base-3 key of the minute bucket containing `millis`.
pub fn bucket_key(millis: u64) -> String {
    let mut minutes = millis / BUCKET_MILLIS;
    if minutes == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while minutes > 0 {
        digits.push(char::from(b'0' + (minutes % 3) as u8));
        minutes /= 3;
    }
    digits.iter().rev().collect()
}

/// Start of the time range addressed by a key prefix of a `width`-digit key.
fn key_to_millis(key: &str, width: usize) -> u64 {
    let padded = format!("{key:0<width$}");
    let minutes = padded.chars().fold(0u64, |acc, digit| {
        acc.saturating_mul(3)
            .saturating_add(u64::from(digit.to_digit(3).unwrap_or(0)))
    });
    minutes.saturating_mul(BUCKET_MILLIS)
}

/// Finds where two tries diverge.
///
/// Walks both tries from the root, always descending into the smallest key
/// whose hashes differ, and returns the start of the time range where the
/// walk stops. Returns `None` when the root hashes match.
pub fn diff(a: &MerkleTrie, b: &MerkleTrie) -> Option<u64> {
    if a.hash == b.hash {
        return None;
    }

    let empty = MerkleTrie::default();
    let mut left = a;
    let mut right = b;
    let mut path = String::new();

    loop {
        let keys: BTreeSet<char> = left.keys().chain(right.keys()).collect();
        let divergent = keys.into_iter().find(|key| {
            let l = left.child(*key).unwrap_or(&empty);
            let r = right.child(*key).unwrap_or(&empty);
            l.hash != r.hash
        });

        match divergent {
            Some(key) => {
                path.push(key);
                left = left.child(key).unwrap_or(&empty);
                right = right.child(key).unwrap_or(&empty);
            }
            None => {
                // Keys are as long as the minute count needs, so the full
                // width is the walked path plus what lies below it.
                let width = path.len() + left.depth().max(right.depth());
                return Some(key_to_millis(&path, width));
            }
        }
    }
}
