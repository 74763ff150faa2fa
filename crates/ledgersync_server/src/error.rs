//! Error types for the sync server.

use ledgersync_crdt::CrdtError;
use ledgersync_storage::StorageError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
///
/// Gate rejections are not errors; see [`Rejection`](crate::Rejection).
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A change carries a timestamp that does not parse.
    #[error("invalid change: {0}")]
    InvalidChange(#[source] CrdtError),

    /// A file's stored encryption metadata is not valid JSON.
    #[error("malformed encryption metadata for file {file_id}: {source}")]
    InvalidMetadata {
        /// The file whose metadata failed to parse.
        file_id: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored digest could not be decoded or encoded.
    #[error("digest error: {0}")]
    Digest(#[from] CrdtError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_) | ServerError::InvalidChange(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidMetadata { .. }
                | ServerError::Digest(_)
                | ServerError::Storage(_)
                | ServerError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::invalid_request("bad").is_client_error());
        assert!(ServerError::InvalidChange(CrdtError::malformed("x")).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(ServerError::Storage(StorageError::not_found("f1")).is_server_error());
        assert!(!ServerError::invalid_request("bad").is_server_error());
    }

    #[test]
    fn error_display() {
        let err = ServerError::InvalidChange(CrdtError::malformed("nope"));
        assert_eq!(err.to_string(), "invalid change: malformed timestamp: \"nope\"");
    }
}
