//! Hash command implementation.

use ledgersync_crdt::{bucket_key, Timestamp};
use serde::Serialize;

/// What a timestamp looks like to the digest.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HashResult {
    /// Canonical string form.
    pub canonical: String,
    /// Physical time in milliseconds.
    pub millis: u64,
    /// Logical counter.
    pub counter: u16,
    /// Node id.
    pub node: String,
    /// MurmurHash3 of the canonical form.
    pub hash: u32,
    /// Base-3 key of the minute bucket.
    pub bucket: String,
}

/// Parses `input` and describes it.
pub fn describe(input: &str) -> Result<HashResult, Box<dyn std::error::Error>> {
    let timestamp = Timestamp::parse(input)?;
    Ok(HashResult {
        canonical: timestamp.to_string(),
        millis: timestamp.millis(),
        counter: timestamp.counter(),
        node: timestamp.node().to_string(),
        hash: timestamp.hash(),
        bucket: bucket_key(timestamp.millis()),
    })
}

/// Runs the hash command.
pub fn run(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = describe(input)?;
    println!("Timestamp: {}", result.canonical);
    println!("  Millis:  {}", result.millis);
    println!("  Counter: {}", result.counter);
    println!("  Node:    {}", result.node);
    println!("  Hash:    {} ({})", result.hash, result.hash as i32);
    println!("  Bucket:  {}", result.bucket);
    Ok(())
}
