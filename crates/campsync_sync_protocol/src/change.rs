//! Pending local edits.

use crate::field::{Field, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pending edit of one field of one item.
///
/// A change queue holds at most one record per `(entity_id, field)`; a
/// newer edit of the same field replaces the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Identifier of the edited item.
    #[serde(rename = "id")]
    pub entity_id: String,
    /// Row of the item in the remote sheet.
    pub row_index: u32,
    /// Edited field.
    pub field: Field,
    /// New value.
    pub value: FieldValue,
    /// When the edit was made.
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    /// Creates a new change record.
    pub fn new(
        entity_id: impl Into<String>,
        row_index: u32,
        field: Field,
        value: FieldValue,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            row_index,
            field,
            value,
            timestamp,
        }
    }

    /// Returns true if this record is for the same item and field as `other`.
    pub fn same_slot(&self, other: &ChangeRecord) -> bool {
        self.entity_id == other.entity_id && self.field == other.field
    }

    /// Returns the wire form of this edit.
    pub fn to_row_update(&self) -> RowUpdate {
        RowUpdate {
            row_index: self.row_index,
            field: self.field,
            value: self.value.clone(),
        }
    }
}

/// A single cell write sent to the remote sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowUpdate {
    /// Row to write.
    pub row_index: u32,
    /// Column to write.
    pub field: Field,
    /// Value to write.
    pub value: FieldValue,
}
