//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while decoding or encoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON or does not match the expected type.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is JSON but not in a shape the endpoint is known to send.
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// A record inside the payload could not be read as an item.
    #[error("invalid record at position {position}: {reason}")]
    InvalidRecord {
        /// Position of the record in the payload.
        position: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The endpoint answered with an error envelope.
    #[error("remote reported error: {0}")]
    Remote(String),

    /// A field name that is not part of the item schema.
    #[error("unknown field: {0}")]
    UnknownField(String),
}
