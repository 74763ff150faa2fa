//! Error types for the CRDT primitives.

use thiserror::Error;

/// Result type for CRDT operations.
pub type CrdtResult<T> = Result<T, CrdtError>;

/// Errors that can occur while parsing, issuing or decoding CRDT values.
#[derive(Debug, Error)]
pub enum CrdtError {
    /// A timestamp string is not in canonical form.
    #[error("malformed timestamp: {input:?}")]
    MalformedTimestamp {
        /// The rejected input.
        input: String,
    },

    /// Timestamp fields are outside the representable range.
    #[error("invalid timestamp: {message}")]
    InvalidTimestamp {
        /// Description of the violated bound.
        message: String,
    },

    /// The logical clock ran too far ahead of physical time.
    #[error("clock drift of {drift_millis}ms exceeds {max_millis}ms")]
    ClockDrift {
        /// How far the logical clock is ahead.
        drift_millis: u64,
        /// Maximum tolerated drift.
        max_millis: u64,
    },

    /// The logical counter overflowed 16 bits.
    #[error("timestamp counter overflow")]
    CounterOverflow,

    /// A remote timestamp carries this clock's own node id.
    #[error("duplicate node id: {node}")]
    DuplicateNode {
        /// The conflicting node id.
        node: String,
    },

    /// Digest JSON is not syntactically valid.
    #[error("digest json error: {0}")]
    DigestJson(#[from] serde_json::Error),
}

impl CrdtError {
    /// Creates a malformed timestamp error.
    pub fn malformed(input: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            input: input.into(),
        }
    }

    /// Creates an invalid timestamp error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            message: message.into(),
        }
    }
}
