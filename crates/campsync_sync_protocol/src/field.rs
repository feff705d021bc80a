//! Editable item fields and their values.

use crate::coerce::{coerce_bool, coerce_number, coerce_text};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The value type a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// A quantity or an amount.
    Number,
    /// A check mark.
    Bool,
}

/// An editable attribute of a [`crate::Material`].
///
/// Serialises to the camelCase column name used by the spreadsheet
/// endpoint. `id` and `rowIndex` are identity, not fields, and cannot be
/// edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Usage category.
    Category,
    /// Owning group.
    Group,
    /// Item name.
    Name,
    /// What the item is used for.
    Description,
    /// Where the item comes from.
    Source,
    /// Storage location.
    Loc,
    /// Quantity already owned.
    Owned,
    /// Quantity needed this event.
    Need,
    /// Quantity still missing.
    Lack,
    /// Estimated unit price.
    UnitPrice,
    /// Estimated total.
    TotalEst,
    /// Person responsible for buying.
    Responsible,
    /// Price actually paid per unit.
    ActualPrice,
    /// Quantity actually bought.
    ActualQty,
    /// Amount actually paid.
    ActualTotal,
    /// What was actually bought.
    ActualItem,
    /// Link to the receipt photo.
    ReceiptPhoto,
    /// Procurement check.
    Status,
    /// Packing check.
    Packed,
    /// Counting check.
    Counted,
    /// Link to the counting photo.
    CountPhoto,
    /// Free-form note.
    Note,
    /// Quantity left after the event.
    Remaining,
    /// Whether a refill is needed.
    Refill,
    /// Note for the next event.
    Suggestion,
}

impl Field {
    /// Every field, in column order.
    pub const ALL: [Field; 25] = [
        Field::Category,
        Field::Group,
        Field::Name,
        Field::Description,
        Field::Source,
        Field::Loc,
        Field::Owned,
        Field::Need,
        Field::Lack,
        Field::UnitPrice,
        Field::TotalEst,
        Field::Responsible,
        Field::ActualPrice,
        Field::ActualQty,
        Field::ActualTotal,
        Field::ActualItem,
        Field::ReceiptPhoto,
        Field::Status,
        Field::Packed,
        Field::Counted,
        Field::CountPhoto,
        Field::Note,
        Field::Remaining,
        Field::Refill,
        Field::Suggestion,
    ];

    /// Returns the wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Group => "group",
            Field::Name => "name",
            Field::Description => "description",
            Field::Source => "source",
            Field::Loc => "loc",
            Field::Owned => "owned",
            Field::Need => "need",
            Field::Lack => "lack",
            Field::UnitPrice => "unitPrice",
            Field::TotalEst => "totalEst",
            Field::Responsible => "responsible",
            Field::ActualPrice => "actualPrice",
            Field::ActualQty => "actualQty",
            Field::ActualTotal => "actualTotal",
            Field::ActualItem => "actualItem",
            Field::ReceiptPhoto => "receiptPhoto",
            Field::Status => "status",
            Field::Packed => "packed",
            Field::Counted => "counted",
            Field::CountPhoto => "countPhoto",
            Field::Note => "note",
            Field::Remaining => "remaining",
            Field::Refill => "refill",
            Field::Suggestion => "suggestion",
        }
    }

    /// Returns the value type of the field.
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Owned
            | Field::Need
            | Field::Lack
            | Field::UnitPrice
            | Field::TotalEst
            | Field::ActualPrice
            | Field::ActualQty
            | Field::ActualTotal
            | Field::Remaining => FieldKind::Number,
            Field::Packed | Field::Counted => FieldKind::Bool,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownField(s.to_string()))
    }
}

/// A value written to a field.
///
/// Serialises untagged, so it reads and writes plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// Text.
    Text(String),
}

impl FieldValue {
    /// Converts the value to the type `kind` using the remote coercion rules.
    pub fn coerce(&self, kind: FieldKind) -> FieldValue {
        let json = self.to_json();
        match kind {
            FieldKind::Text => FieldValue::Text(coerce_text(&json)),
            FieldKind::Number => FieldValue::Number(coerce_number(&json)),
            FieldKind::Bool => FieldValue::Bool(coerce_bool(&json)),
        }
    }

    /// Returns the value as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Parses user input for a field of type `kind`.
    ///
    /// Input is coerced, so this never fails: `"abc"` for a number field
    /// yields `0`.
    pub fn parse_for(kind: FieldKind, input: &str) -> FieldValue {
        FieldValue::Text(input.to_string()).coerce(kind)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}
