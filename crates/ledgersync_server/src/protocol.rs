//! Request and response bodies of a sync round.
//!
//! Field names follow the client's wire format (`fileId`, `groupId`,
//! `messages`, `merkle`); the routing layer chooses the encoding.

use ledgersync_storage::ChangeRecord;
use serde::{Deserialize, Serialize};

/// One change as it travels between client and server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    /// Canonical timestamp string.
    pub timestamp: String,
    /// Whether `content` is encrypted.
    pub is_encrypted: bool,
    /// Opaque payload.
    pub content: Vec<u8>,
}

impl ChangeEnvelope {
    /// Creates an encrypted change envelope.
    pub fn encrypted(timestamp: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: timestamp.into(),
            is_encrypted: true,
            content: content.into(),
        }
    }
}

impl From<ChangeRecord> for ChangeEnvelope {
    fn from(record: ChangeRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            is_encrypted: record.is_encrypted,
            content: record.content,
        }
    }
}

impl From<&ChangeEnvelope> for ChangeRecord {
    fn from(envelope: &ChangeEnvelope) -> Self {
        ChangeRecord::new(
            envelope.timestamp.clone(),
            envelope.is_encrypted,
            envelope.content.clone(),
        )
    }
}

/// A client's sync request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Changes after this timestamp are returned.
    pub since: String,
    /// File being synced.
    pub file_id: String,
    /// Replication group the client believes is current.
    #[serde(default)]
    pub group_id: String,
    /// Encryption key id the client's changes are encrypted with.
    #[serde(default)]
    pub key_id: String,
    /// New changes from the client.
    #[serde(default, rename = "messages")]
    pub changes: Vec<ChangeEnvelope>,
}

impl SyncRequest {
    /// Creates a request with no changes and no key id.
    pub fn new(
        file_id: impl Into<String>,
        group_id: impl Into<String>,
        since: impl Into<String>,
    ) -> Self {
        Self {
            since: since.into(),
            file_id: file_id.into(),
            group_id: group_id.into(),
            key_id: String::new(),
            changes: Vec::new(),
        }
    }

    /// Sets the key id.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Sets the outgoing changes.
    pub fn with_changes(mut self, changes: Vec<ChangeEnvelope>) -> Self {
        self.changes = changes;
        self
    }
}

/// The server's reply to an accepted sync round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Canonical JSON of the group's pruned digest.
    #[serde(rename = "merkle")]
    pub digest: String,
    /// Changes the client is missing, ascending by timestamp.
    #[serde(rename = "messages")]
    pub changes: Vec<ChangeEnvelope>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_names() {
        let request = SyncRequest::new("f1", "g1", "2018-11-12T13:21:40.122Z-0000-0000000000000000")
            .with_key_id("k1")
            .with_changes(vec![ChangeEnvelope::encrypted(
                "2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF",
                vec![1, 2],
            )]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["fileId"], "f1");
        assert_eq!(json["groupId"], "g1");
        assert_eq!(json["keyId"], "k1");
        assert_eq!(json["messages"][0]["isEncrypted"], true);

        let back: SyncRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn request_optional_fields() {
        let request: SyncRequest =
            serde_json::from_str(r#"{"since":"x","fileId":"f1"}"#).unwrap();
        assert_eq!(request.group_id, "");
        assert_eq!(request.key_id, "");
        assert!(request.changes.is_empty());
    }

    #[test]
    fn response_wire_names() {
        let response = SyncResponse {
            digest: "{}".into(),
            changes: Vec::new(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"merkle":"{}","messages":[]}"#);
    }

    #[test]
    fn envelope_record_conversion() {
        let envelope = ChangeEnvelope::encrypted("t", b"payload".to_vec());
        let record = ChangeRecord::from(&envelope);
        assert_eq!(ChangeEnvelope::from(record), envelope);
    }
}
