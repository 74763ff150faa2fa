//! Hybrid logical timestamps.
//!
//! A timestamp identifies one change across every replica of a file. Its
//! canonical string form is the only thing that is hashed or sent over the
//! wire:
//!
//! ```text
//! 2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF
//! └──── millis (UTC) ────┘ └ctr┘ └──── node ────┘
//! ```

use crate::error::{CrdtError, CrdtResult};
use crate::murmur::murmur3_32;
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of the node id in the canonical form.
pub const NODE_WIDTH: usize = 16;

/// Largest representable counter value.
pub const MAX_COUNTER: u16 = u16::MAX;

/// Largest representable physical time (`9999-12-31T23:59:59.999Z`).
pub const MAX_MILLIS: u64 = 253_402_300_799_999;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// An immutable hybrid logical timestamp.
///
/// Ordering compares `(millis, counter, node)`, which coincides with the
/// lexicographic order of the canonical strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    millis: u64,
    counter: u16,
    node: String,
}

impl Timestamp {
    /// Creates a timestamp, left-padding `node` with `0` to 16 characters.
    ///
    /// # Errors
    ///
    /// Fails if `millis` is past [`MAX_MILLIS`] or `node` is longer than
    /// [`NODE_WIDTH`] characters.
    pub fn new(millis: u64, counter: u16, node: impl AsRef<str>) -> CrdtResult<Self> {
        if millis > MAX_MILLIS {
            return Err(CrdtError::invalid(format!(
                "millis {millis} is past year 9999"
            )));
        }
        let node = node.as_ref();
        let width = node.chars().count();
        if width > NODE_WIDTH {
            return Err(CrdtError::invalid(format!(
                "node id {node:?} is longer than {NODE_WIDTH} characters"
            )));
        }
        Ok(Self {
            millis,
            counter,
            node: format!("{}{node}", "0".repeat(NODE_WIDTH - width)),
        })
    }

    /// The smallest timestamp at the given physical time.
    ///
    /// Useful as a `since` bound: every change issued at or after `millis`
    /// compares greater than or equal to it.
    pub fn since(millis: u64) -> CrdtResult<Self> {
        Self::new(millis, 0, "")
    }

    /// Parses a canonical timestamp string.
    ///
    /// The string splits on `-` into exactly five fields. The first three
    /// are rejoined into an RFC 3339 date-time, the fourth is the counter in
    /// hex and the fifth is the node id.
    pub fn parse(input: &str) -> CrdtResult<Self> {
        let parts: Vec<&str> = input.split('-').collect();
        if parts.len() != 5 {
            return Err(CrdtError::malformed(input));
        }

        let iso = parts[..3].join("-");
        let date = DateTime::parse_from_rfc3339(&iso).map_err(|_| CrdtError::malformed(input))?;
        let millis =
            u64::try_from(date.timestamp_millis()).map_err(|_| CrdtError::malformed(input))?;
        let counter =
            u16::from_str_radix(parts[3], 16).map_err(|_| CrdtError::malformed(input))?;

        Self::new(millis, counter, parts[4]).map_err(|_| CrdtError::malformed(input))
    }

    /// Physical time in milliseconds since the Unix epoch.
    pub fn millis(&self) -> u64 {
        self.millis
    }

    /// Logical counter.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Node id, always [`NODE_WIDTH`] characters.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// MurmurHash3 of the canonical string, seed 0.
    pub fn hash(&self) -> u32 {
        murmur3_32(self.to_string().as_bytes(), 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = i64::try_from(self.millis).map_err(|_| fmt::Error)?;
        let date = DateTime::<Utc>::from_timestamp_millis(millis).ok_or(fmt::Error)?;
        write!(
            f,
            "{}-{:04X}-{}",
            date.format(ISO_FORMAT),
            self.counter,
            self.node
        )
    }
}

impl FromStr for Timestamp {
    type Err = CrdtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

/// A timestamp whose fields can be changed in place.
///
/// Only the local [`Clock`](crate::Clock) uses this; everything that leaves
/// the clock is frozen into a [`Timestamp`] first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableTimestamp {
    millis: u64,
    counter: u16,
    node: String,
}

impl MutableTimestamp {
    /// Creates a mutable timestamp.
    pub fn new(millis: u64, counter: u16, node: impl Into<String>) -> Self {
        Self {
            millis,
            counter,
            node: node.into(),
        }
    }

    /// Physical time in milliseconds.
    pub fn millis(&self) -> u64 {
        self.millis
    }

    /// Logical counter.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Node id.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Sets the physical time.
    pub fn set_millis(&mut self, millis: u64) {
        self.millis = millis;
    }

    /// Sets the logical counter.
    pub fn set_counter(&mut self, counter: u16) {
        self.counter = counter;
    }

    /// Sets the node id.
    pub fn set_node(&mut self, node: impl Into<String>) {
        self.node = node.into();
    }

    /// Freezes the current value into a [`Timestamp`].
    pub fn freeze(&self) -> CrdtResult<Timestamp> {
        Timestamp::new(self.millis, self.counter, &self.node)
    }
}

impl From<Timestamp> for MutableTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self {
            millis: ts.millis,
            counter: ts.counter,
            node: ts.node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reject_malformed() {
        for input in [
            "",
            " ",
            "0",
            "invalid",
            "1969-1-1T0:0:0.0Z-0-0-0",
            "2018-11-12T13:21:40.122Z-0000",
            "2018-11-12T13:21:40.122Z-XYZW-0123456789ABCDEF",
            "2018-11-12T13:21:40.122Z-10000-0123456789ABCDEF",
            "2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF0",
            "2018-11-12T13:21:40.122Z-0000-0123-456789ABCDEF",
        ] {
            let err = Timestamp::parse(input).unwrap_err();
            assert!(
                matches!(err, CrdtError::MalformedTimestamp { .. }),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn parse_and_format_round_trip() {
        for input in [
            "1970-01-01T00:00:00.000Z-0000-0000000000000000",
            "2015-04-24T22:23:42.123Z-1000-0123456789ABCDEF",
            "9999-12-31T23:59:59.999Z-FFFF-FFFFFFFFFFFFFFFF",
        ] {
            let ts = Timestamp::parse(input).unwrap();
            assert!(ts.millis() <= MAX_MILLIS);
            assert_eq!(ts.to_string(), input);
        }
    }

    #[test]
    fn parse_fields() {
        let ts = Timestamp::parse("2018-11-12T13:21:40.122Z-00AB-0123456789ABCDEF").unwrap();
        assert_eq!(ts.millis(), 1_542_028_900_122);
        assert_eq!(ts.counter(), 0xAB);
        assert_eq!(ts.node(), "0123456789ABCDEF");
    }

    #[test]
    fn lowercase_counter_formats_uppercase() {
        let ts = Timestamp::parse("2018-11-12T13:21:40.122Z-00ab-0123456789ABCDEF").unwrap();
        assert_eq!(ts.to_string(), "2018-11-12T13:21:40.122Z-00AB-0123456789ABCDEF");
    }

    #[test]
    fn short_node_is_padded() {
        let ts = Timestamp::new(0, 1, "abc").unwrap();
        assert_eq!(ts.node(), "0000000000000abc");
        assert_eq!(ts.to_string(), "1970-01-01T00:00:00.000Z-0001-0000000000000abc");
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(Timestamp::new(MAX_MILLIS + 1, 0, "a").is_err());
        assert!(Timestamp::new(0, 0, "0123456789ABCDEF0").is_err());
    }

    #[test]
    fn hash_known_values() {
        let a = Timestamp::parse("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF").unwrap();
        let b = Timestamp::parse("2018-11-13T13:21:40.122Z-0000-0123456789ABCDEF").unwrap();
        assert_eq!(a.hash(), 1_983_295_247);
        assert_eq!(b.hash(), 1_469_038_940);

        let epoch = Timestamp::parse("1970-01-01T00:00:00.000Z-0000-0000000000000000").unwrap();
        assert_eq!(epoch.hash(), 4_179_357_717);
    }

    #[test]
    fn ordering_matches_string_order() {
        let a = Timestamp::new(1_000, 5, "B").unwrap();
        let b = Timestamp::new(1_000, 6, "A").unwrap();
        let c = Timestamp::new(1_001, 0, "A").unwrap();
        assert!(a < b && b < c);
        assert!(a.to_string() < b.to_string() && b.to_string() < c.to_string());
    }

    #[test]
    fn since_is_minimal() {
        let since = Timestamp::since(1_542_028_900_122).unwrap();
        assert_eq!(
            since.to_string(),
            "2018-11-12T13:21:40.122Z-0000-0000000000000000"
        );
        let later = Timestamp::new(1_542_028_900_122, 0, "1").unwrap();
        assert!(since < later);
    }

    #[test]
    fn serde_uses_canonical_string() {
        let ts = Timestamp::new(1_542_028_900_122, 3, "0123456789ABCDEF").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2018-11-12T13:21:40.122Z-0003-0123456789ABCDEF\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<Timestamp>("\"garbage\"").is_err());
    }

    #[test]
    fn mutable_timestamp_freeze() {
        let mut mts = MutableTimestamp::from(Timestamp::new(10, 0, "node").unwrap());
        mts.set_millis(20);
        mts.set_counter(7);
        let ts = mts.freeze().unwrap();
        assert_eq!((ts.millis(), ts.counter()), (20, 7));
        assert_eq!(ts.node(), "000000000000node");

        mts.set_node("this-node-id-is-far-too-long");
        assert!(mts.freeze().is_err());
    }

    fn node_strategy() -> impl Strategy<Value = String> {
        "[0-9A-F]{16}"
    }

    proptest! {
        #[test]
        fn format_parse_identity(
            millis in 0u64..=MAX_MILLIS,
            counter in any::<u16>(),
            node in node_strategy(),
        ) {
            let ts = Timestamp::new(millis, counter, &node).unwrap();
            let text = ts.to_string();
            let parsed = Timestamp::parse(&text).unwrap();
            prop_assert_eq!(&parsed, &ts);
            prop_assert_eq!(parsed.to_string(), text);
            prop_assert_eq!(parsed.hash(), ts.hash());
        }

        #[test]
        fn order_agrees_with_canonical_strings(
            a in (0u64..=MAX_MILLIS, any::<u16>(), node_strategy()),
            b in (0u64..=MAX_MILLIS, any::<u16>(), node_strategy()),
        ) {
            let a = Timestamp::new(a.0, a.1, &a.2).unwrap();
            let b = Timestamp::new(b.0, b.1, &b.2).unwrap();
            prop_assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
        }
    }
}
