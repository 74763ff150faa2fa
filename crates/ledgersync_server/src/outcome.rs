//! Results of a sync round.

use crate::protocol::SyncResponse;
use std::fmt;

/// Why a sync round was refused before touching storage.
///
/// Each variant tells the client which recovery to run; [`Rejection::code`]
/// is the stable string clients match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The session token is missing or unknown.
    Unauthorized,
    /// No file is registered under the requested id.
    FileNotFound,
    /// The file was uploaded with an unsupported format version.
    FileTooOld,
    /// The file has no replication group and awaits a fresh upload.
    NeedsUpload,
    /// The file's metadata and registered key disagree.
    KeyMismatch,
    /// The client is syncing against a group that was reset.
    HasBeenReset,
    /// The file has been re-keyed since the client last downloaded it.
    HasNewKey,
}

impl Rejection {
    /// Stable wire code for this rejection.
    pub fn code(self) -> &'static str {
        match self {
            Rejection::Unauthorized => "auth-error",
            Rejection::FileNotFound => "file-not-found",
            Rejection::FileTooOld => "file-old-version",
            Rejection::NeedsUpload => "file-needs-upload",
            Rejection::KeyMismatch => "file-key-mismatch",
            Rejection::HasBeenReset => "file-has-reset",
            Rejection::HasNewKey => "file-has-new-key",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The result of a sync round that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Changes were merged; carries the new digest and the delta.
    Synced(SyncResponse),
    /// A gate refused the round. Nothing was written.
    Rejected(Rejection),
}

impl SyncOutcome {
    /// Returns the response if the round was accepted.
    pub fn into_response(self) -> Option<SyncResponse> {
        match self {
            SyncOutcome::Synced(response) => Some(response),
            SyncOutcome::Rejected(_) => None,
        }
    }

    /// Returns the rejection if the round was refused.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            SyncOutcome::Synced(_) => None,
            SyncOutcome::Rejected(rejection) => Some(*rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let codes: Vec<_> = [
            Rejection::Unauthorized,
            Rejection::FileNotFound,
            Rejection::FileTooOld,
            Rejection::NeedsUpload,
            Rejection::KeyMismatch,
            Rejection::HasBeenReset,
            Rejection::HasNewKey,
        ]
        .iter()
        .map(|r| r.to_string())
        .collect();

        assert_eq!(
            codes,
            vec![
                "auth-error",
                "file-not-found",
                "file-old-version",
                "file-needs-upload",
                "file-key-mismatch",
                "file-has-reset",
                "file-has-new-key",
            ]
        );
    }

    #[test]
    fn outcome_accessors() {
        let rejected = SyncOutcome::Rejected(Rejection::HasNewKey);
        assert_eq!(rejected.rejection(), Some(Rejection::HasNewKey));
        assert_eq!(rejected.into_response(), None);

        let synced = SyncOutcome::Synced(SyncResponse::default());
        assert_eq!(synced.rejection(), None);
        assert!(synced.into_response().is_some());
    }
}
