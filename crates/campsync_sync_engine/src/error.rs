//! Error types for the sync engine.

use campsync_storage::StorageError;
use campsync_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// None of these is fatal: the engine records the message, returns to
/// idle and retries on the next trigger.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or HTTP failure, including timeouts.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint was reached but reported a failure.
    #[error("remote error: {0}")]
    RemoteApplication(String),

    /// A remote or persisted payload could not be decoded or encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Returns true if retrying the operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::Storage(StorageError::InvalidKey(_)))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Transport(_) => "transport",
            SyncError::RemoteApplication(_) => "remote",
            SyncError::Serialization(_) => "serialization",
            SyncError::Storage(_) => "storage",
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Remote(message) => SyncError::RemoteApplication(message),
            other => SyncError::Serialization(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

/// Returned by [`crate::SyncEngine::exit_guard`] while edits are pending.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{pending} unsynced edit(s) would be lost")]
pub struct UnsyncedEdits {
    /// Number of pending edits.
    pub pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_map_to_taxonomy() {
        let remote: SyncError = ProtocolError::Remote("sheet locked".into()).into();
        assert!(matches!(remote, SyncError::RemoteApplication(ref m) if m == "sheet locked"));

        let shape: SyncError = ProtocolError::UnexpectedShape("42".into()).into();
        assert!(matches!(shape, SyncError::Serialization(_)));
    }

    #[test]
    fn retryable_errors() {
        assert!(SyncError::Transport("connection reset".into()).is_retryable());
        assert!(SyncError::RemoteApplication("busy".into()).is_retryable());
        assert!(SyncError::Serialization("bad json".into()).is_retryable());
        assert!(!SyncError::Storage(StorageError::InvalidKey("../x".into())).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::Transport("fetch failed: HTTP 502".into());
        assert_eq!(err.to_string(), "transport error: fetch failed: HTTP 502");
        assert_eq!(err.kind(), "transport");

        let guard = UnsyncedEdits { pending: 3 };
        assert_eq!(guard.to_string(), "3 unsynced edit(s) would be lost");
    }
}
