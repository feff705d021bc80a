//! Messages exchanged with the spreadsheet endpoint.
//!
//! The endpoint answers every request with JSON. A read may return a bare
//! array of records or an envelope `{status, message?, data?}`; a write
//! returns an envelope. An envelope with `status: "error"` is a failure
//! whatever the HTTP status was.

use crate::change::RowUpdate;
use crate::error::{ProtocolError, ProtocolResult};
use crate::material::Material;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action name of a batch write.
pub const BATCH_UPDATE_ACTION: &str = "batch_update";

/// Envelope status marking a failed request.
pub const STATUS_ERROR: &str = "error";

/// Response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `"success"`, `"error"`, or absent.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable detail, mostly set on errors.
    #[serde(default)]
    pub message: Option<String>,
    /// Payload of a read.
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    /// Returns true if the envelope reports a failure.
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ERROR)
    }

    fn into_remote_error(self, default: &str) -> ProtocolError {
        ProtocolError::Remote(
            self.message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| default.to_string()),
        )
    }
}

/// Body of a batch write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    /// Always [`BATCH_UPDATE_ACTION`].
    pub action: String,
    /// Cell writes, applied in order.
    pub updates: Vec<RowUpdate>,
}

impl BatchUpdateRequest {
    /// Creates a batch write for `updates`.
    pub fn new(updates: Vec<RowUpdate>) -> Self {
        Self {
            action: BATCH_UPDATE_ACTION.to_string(),
            updates,
        }
    }

    /// Encodes the request as JSON text.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decodes the body of a read into items.
///
/// # Errors
///
/// - [`ProtocolError::Remote`] for an error envelope
/// - [`ProtocolError::Json`] if the body is not JSON
/// - [`ProtocolError::UnexpectedShape`] for JSON that holds no record list
/// - [`ProtocolError::InvalidRecord`] for a record that is not an object
pub fn decode_fetch_response(body: &[u8]) -> ProtocolResult<Vec<Material>> {
    let json: Value = serde_json::from_slice(body)?;

    let records = match json {
        Value::Array(records) => records,
        Value::Object(map) => {
            let envelope: Envelope = serde_json::from_value(Value::Object(map))?;
            if envelope.is_error() {
                return Err(envelope.into_remote_error("fetch failed"));
            }
            match envelope.data {
                Some(Value::Array(records)) => records,
                Some(other) => {
                    return Err(ProtocolError::UnexpectedShape(format!(
                        "envelope data is not an array: {other}"
                    )))
                }
                None => {
                    return Err(ProtocolError::UnexpectedShape(
                        "envelope carries no data".into(),
                    ))
                }
            }
        }
        other => {
            return Err(ProtocolError::UnexpectedShape(format!(
                "expected an array or an envelope, found {other}"
            )))
        }
    };

    records
        .iter()
        .enumerate()
        .map(|(position, raw)| Material::from_raw(position, raw))
        .collect()
}

/// Checks the body of a batch write response.
///
/// # Errors
///
/// - [`ProtocolError::Remote`] for an error envelope
/// - [`ProtocolError::Json`] if the body is not a JSON envelope
pub fn decode_push_response(body: &[u8]) -> ProtocolResult<Envelope> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.is_error() {
        return Err(envelope.into_remote_error("push failed"));
    }
    Ok(envelope)
}
