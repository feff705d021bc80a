//! The inventory item record.

use crate::coerce::{coerce_bool, coerce_number, coerce_text};
use crate::error::{ProtocolError, ProtocolResult};
use crate::field::{Field, FieldKind, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inventory item.
///
/// A `Material` is a value record: edits never mutate a shared record,
/// they produce a new one with [`Material::with_field`].
///
/// The identity is `id`, the decimal form of the spreadsheet row the item
/// was read from. `row_index` is kept separately because the remote store
/// addresses rows by position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Material {
    /// Stable identifier, derived from the row index.
    pub id: String,
    /// One-based row in the remote sheet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,

    /// Usage category.
    pub category: String,
    /// Owning group.
    pub group: String,
    /// Item name.
    pub name: String,
    /// What the item is used for.
    pub description: String,
    /// Where the item comes from.
    pub source: String,
    /// Storage location.
    pub loc: String,

    /// Quantity already owned.
    pub owned: f64,
    /// Quantity needed this event.
    pub need: f64,
    /// Quantity still missing.
    pub lack: f64,

    /// Estimated unit price.
    pub unit_price: f64,
    /// Estimated total.
    pub total_est: f64,

    /// Person responsible for buying.
    pub responsible: String,

    /// Price actually paid per unit.
    pub actual_price: f64,
    /// Quantity actually bought.
    pub actual_qty: f64,
    /// Amount actually paid.
    pub actual_total: f64,
    /// What was actually bought.
    pub actual_item: String,

    /// Link to the receipt photo.
    pub receipt_photo: String,

    /// Procurement check.
    pub status: String,

    /// Packing check.
    pub packed: bool,
    /// Counting check.
    pub counted: bool,

    /// Link to the counting photo.
    pub count_photo: String,

    /// Free-form note.
    pub note: String,
    /// Quantity left after the event.
    pub remaining: f64,
    /// Whether a refill is needed.
    pub refill: String,
    /// Note for the next event.
    pub suggestion: String,
}

impl Material {
    /// Builds a material from one raw record returned by the endpoint.
    ///
    /// Missing or malformed attributes take their defaults (see
    /// [`crate::coerce_text`], [`crate::coerce_number`],
    /// [`crate::coerce_bool`]). Only a record that is not a JSON object is
    /// rejected.
    pub fn from_raw(position: usize, raw: &Value) -> ProtocolResult<Self> {
        let object = raw.as_object().ok_or_else(|| ProtocolError::InvalidRecord {
            position,
            reason: format!("expected an object, found {}", json_kind(raw)),
        })?;

        let row_index = object.get("rowIndex").and_then(row_index_from_value);
        let mut material = Material {
            id: row_index.map(|r| r.to_string()).unwrap_or_default(),
            row_index,
            ..Material::default()
        };

        for field in Field::ALL {
            let value = object.get(field.as_str()).unwrap_or(&Value::Null);
            let coerced = match field.kind() {
                FieldKind::Text => FieldValue::Text(coerce_text(value)),
                FieldKind::Number => FieldValue::Number(coerce_number(value)),
                FieldKind::Bool => FieldValue::Bool(coerce_bool(value)),
            };
            material.set(field, coerced);
        }

        Ok(material)
    }

    /// Returns the current value of `field`.
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Category => self.category.clone().into(),
            Field::Group => self.group.clone().into(),
            Field::Name => self.name.clone().into(),
            Field::Description => self.description.clone().into(),
            Field::Source => self.source.clone().into(),
            Field::Loc => self.loc.clone().into(),
            Field::Owned => self.owned.into(),
            Field::Need => self.need.into(),
            Field::Lack => self.lack.into(),
            Field::UnitPrice => self.unit_price.into(),
            Field::TotalEst => self.total_est.into(),
            Field::Responsible => self.responsible.clone().into(),
            Field::ActualPrice => self.actual_price.into(),
            Field::ActualQty => self.actual_qty.into(),
            Field::ActualTotal => self.actual_total.into(),
            Field::ActualItem => self.actual_item.clone().into(),
            Field::ReceiptPhoto => self.receipt_photo.clone().into(),
            Field::Status => self.status.clone().into(),
            Field::Packed => self.packed.into(),
            Field::Counted => self.counted.into(),
            Field::CountPhoto => self.count_photo.clone().into(),
            Field::Note => self.note.clone().into(),
            Field::Remaining => self.remaining.into(),
            Field::Refill => self.refill.clone().into(),
            Field::Suggestion => self.suggestion.clone().into(),
        }
    }

    /// Returns a copy of this material with `field` set to `value`.
    ///
    /// The value is coerced to the field's type, so this never fails.
    #[must_use]
    pub fn with_field(&self, field: Field, value: &FieldValue) -> Material {
        let mut next = self.clone();
        next.set(field, value.coerce(field.kind()));
        next
    }

    /// Returns the row this material lives on in the remote sheet.
    ///
    /// Falls back to parsing `id` for records cached before the row index
    /// was stored.
    pub fn resolved_row_index(&self) -> Option<u32> {
        self.row_index.or_else(|| self.id.parse().ok())
    }

    fn set(&mut self, field: Field, value: FieldValue) {
        let text = |v: FieldValue| match v {
            FieldValue::Text(s) => s,
            other => other.to_string(),
        };
        let number = |v: FieldValue| match v {
            FieldValue::Number(n) => n,
            other => coerce_number(&other.to_json()),
        };
        let flag = |v: FieldValue| match v {
            FieldValue::Bool(b) => b,
            other => coerce_bool(&other.to_json()),
        };

        match field {
            Field::Category => self.category = text(value),
            Field::Group => self.group = text(value),
            Field::Name => self.name = text(value),
            Field::Description => self.description = text(value),
            Field::Source => self.source = text(value),
            Field::Loc => self.loc = text(value),
            Field::Owned => self.owned = number(value),
            Field::Need => self.need = number(value),
            Field::Lack => self.lack = number(value),
            Field::UnitPrice => self.unit_price = number(value),
            Field::TotalEst => self.total_est = number(value),
            Field::Responsible => self.responsible = text(value),
            Field::ActualPrice => self.actual_price = number(value),
            Field::ActualQty => self.actual_qty = number(value),
            Field::ActualTotal => self.actual_total = number(value),
            Field::ActualItem => self.actual_item = text(value),
            Field::ReceiptPhoto => self.receipt_photo = text(value),
            Field::Status => self.status = text(value),
            Field::Packed => self.packed = flag(value),
            Field::Counted => self.counted = flag(value),
            Field::CountPhoto => self.count_photo = text(value),
            Field::Note => self.note = text(value),
            Field::Remaining => self.remaining = number(value),
            Field::Refill => self.refill = text(value),
            Field::Suggestion => self.suggestion = text(value),
        }
    }
}

fn row_index_from_value(value: &Value) -> Option<u32> {
    let n = coerce_number(value);
    if n >= 1.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
        Some(n as u32)
    } else {
        None
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn from_raw_full_record() {
        let raw = json!({
            "rowIndex": 3,
            "category": "kitchen",
            "name": "Gas stove",
            "owned": "2",
            "need": 4,
            "unitPrice": 350.5,
            "packed": "TRUE",
            "counted": false,
            "note": null,
        });

        let material = Material::from_raw(0, &raw).unwrap();
        assert_eq!(material.id, "3");
        assert_eq!(material.row_index, Some(3));
        assert_eq!(material.category, "kitchen");
        assert_eq!(material.name, "Gas stove");
        assert_eq!(material.owned, 2.0);
        assert_eq!(material.need, 4.0);
        assert_eq!(material.unit_price, 350.5);
        assert!(material.packed);
        assert!(!material.counted);
        assert_eq!(material.note, "");
        assert_eq!(material.group, "");
    }

    #[test]
    fn from_raw_without_row_index() {
        let material = Material::from_raw(0, &json!({ "name": "rope" })).unwrap();
        assert_eq!(material.id, "");
        assert_eq!(material.row_index, None);
        assert_eq!(material.resolved_row_index(), None);
    }

    #[test]
    fn from_raw_rejects_non_object() {
        let err = Material::from_raw(7, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidRecord { position: 7, .. }));
    }

    #[test]
    fn with_field_does_not_touch_original() {
        let original = Material {
            id: "5".into(),
            row_index: Some(5),
            ..Material::default()
        };
        let edited = original.with_field(Field::Packed, &FieldValue::Bool(true));

        assert!(!original.packed);
        assert!(edited.packed);
        assert_eq!(edited.id, "5");
    }

    #[test]
    fn with_field_coerces() {
        let material = Material::default()
            .with_field(Field::Need, &FieldValue::from("7"))
            .with_field(Field::Counted, &FieldValue::from("true"))
            .with_field(Field::Note, &FieldValue::Number(1.5));

        assert_eq!(material.need, 7.0);
        assert!(material.counted);
        assert_eq!(material.note, "1.5");
    }

    #[test]
    fn get_matches_set() {
        let material = Material::default().with_field(Field::ActualItem, &"tarp".into());
        assert_eq!(material.get(Field::ActualItem), FieldValue::Text("tarp".into()));
        assert_eq!(material.get(Field::Remaining), FieldValue::Number(0.0));
    }

    fn any_field() -> impl Strategy<Value = Field> {
        prop::sample::select(Field::ALL.to_vec())
    }

    fn any_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            any::<bool>().prop_map(FieldValue::Bool),
            any::<f64>().prop_map(FieldValue::Number),
            ".{0,12}".prop_map(FieldValue::Text),
        ]
    }

    proptest! {
        #[test]
        fn with_field_reads_back_coerced(field in any_field(), value in any_value()) {
            let material = Material::default().with_field(field, &value);
            prop_assert_eq!(material.get(field), value.coerce(field.kind()));
        }

        #[test]
        fn with_field_touches_one_field(field in any_field(), value in any_value()) {
            let base = Material::default();
            let edited = base.with_field(field, &value);
            for other in Field::ALL.iter().copied().filter(|f| *f != field) {
                prop_assert_eq!(edited.get(other), base.get(other));
            }
        }
    }

    #[test]
    fn resolved_row_index_falls_back_to_id() {
        let material = Material {
            id: "12".into(),
            ..Material::default()
        };
        assert_eq!(material.resolved_row_index(), Some(12));
    }

    #[test]
    fn serde_uses_camel_case() {
        let material = Material {
            id: "1".into(),
            row_index: Some(1),
            unit_price: 2.0,
            ..Material::default()
        };
        let json = serde_json::to_value(&material).unwrap();
        assert_eq!(json["rowIndex"], 1);
        assert_eq!(json["unitPrice"], 2.0);

        let back: Material = serde_json::from_value(json).unwrap();
        assert_eq!(back, material);
    }
}
