//! Overlay of pending edits onto a remote snapshot.
//!
//! Pending changes for items that are missing from the remote snapshot
//! (for example because the row was deleted in the sheet) are dropped.
//! That is the merge policy, not an error: the item no longer exists to
//! be edited.

use campsync_sync_protocol::{ChangeRecord, Field, FieldValue, Material};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Result of a merge, with the ids whose changes were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeReport {
    /// Merged dataset, in remote order.
    pub materials: Vec<Material>,
    /// Ids with pending changes but no remote item, sorted.
    pub orphaned: Vec<String>,
}

/// Overlays `pending` onto `remote`.
///
/// Deterministic and side-effect free. The output has exactly the items of
/// `remote`, in the same order; for each item with pending changes the
/// latest pending value of every edited field replaces the remote one.
pub fn merge(remote: &[Material], pending: &[ChangeRecord]) -> Vec<Material> {
    merge_with_report(remote, pending).materials
}

/// Like [`merge`], also reporting which pending changes were dropped.
pub fn merge_with_report(remote: &[Material], pending: &[ChangeRecord]) -> MergeReport {
    let mut overlays: HashMap<&str, BTreeMap<Field, &FieldValue>> = HashMap::new();
    for change in pending {
        overlays
            .entry(change.entity_id.as_str())
            .or_default()
            .insert(change.field, &change.value);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let materials = remote
        .iter()
        .map(|item| match overlays.get(item.id.as_str()) {
            Some(fields) => {
                seen.insert(item.id.as_str());
                fields
                    .iter()
                    .fold(item.clone(), |acc, (field, value)| acc.with_field(*field, value))
            }
            None => item.clone(),
        })
        .collect();

    let mut orphaned: Vec<String> = overlays
        .keys()
        .filter(|id| !seen.contains(*id))
        .map(|id| id.to_string())
        .collect();
    orphaned.sort();

    MergeReport {
        materials,
        orphaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn item(row: u32) -> Material {
        Material {
            id: row.to_string(),
            row_index: Some(row),
            name: format!("item {row}"),
            ..Material::default()
        }
    }

    fn change(id: &str, field: Field, value: FieldValue) -> ChangeRecord {
        ChangeRecord::new(
            id,
            id.parse().unwrap_or(0),
            field,
            value,
            Utc.timestamp_opt(0, 0).unwrap(),
        )
    }

    #[test]
    fn no_pending_returns_remote() {
        let remote = vec![item(1), item(2)];
        assert_eq!(merge(&remote, &[]), remote);
    }

    #[test]
    fn pending_overlays_fields() {
        let remote = vec![item(1), item(3)];
        let pending = vec![
            change("3", Field::Packed, true.into()),
            change("3", Field::Note, "check poles".into()),
        ];

        let merged = merge(&remote, &pending);
        assert_eq!(merged[0], item(1));
        assert!(merged[1].packed);
        assert_eq!(merged[1].note, "check poles");
        assert_eq!(merged[1].name, "item 3");
    }

    #[test]
    fn later_pending_value_wins() {
        let remote = vec![item(1)];
        let pending = vec![
            change("1", Field::Need, 1.into()),
            change("1", Field::Need, 6.into()),
        ];
        assert_eq!(merge(&remote, &pending)[0].need, 6.0);
    }

    #[test]
    fn order_follows_remote() {
        let remote = vec![item(9), item(2), item(5)];
        let pending = vec![change("5", Field::Packed, true.into())];

        let ids: Vec<_> = merge(&remote, &pending).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["9", "2", "5"]);
    }

    #[test]
    fn drops_changes_for_missing_items() {
        let remote = vec![item(1)];
        let pending = vec![
            change("1", Field::Packed, true.into()),
            change("42", Field::Packed, true.into()),
        ];

        let report = merge_with_report(&remote, &pending);
        assert_eq!(report.materials.len(), 1);
        assert!(report.materials.iter().all(|m| m.id != "42"));
        assert_eq!(report.orphaned, vec!["42".to_string()]);
    }

    #[test]
    fn does_not_modify_inputs() {
        let remote = vec![item(1)];
        let pending = vec![change("1", Field::Counted, true.into())];
        let before = remote.clone();

        let _ = merge(&remote, &pending);
        assert_eq!(remote, before);
    }

    fn arb_change() -> impl Strategy<Value = ChangeRecord> {
        (1u32..8, prop::sample::select(Field::ALL.to_vec()), any::<bool>()).prop_map(
            |(row, field, flag)| {
                let value = match field.kind() {
                    campsync_sync_protocol::FieldKind::Bool => FieldValue::Bool(flag),
                    campsync_sync_protocol::FieldKind::Number => FieldValue::Number(f64::from(row)),
                    campsync_sync_protocol::FieldKind::Text => FieldValue::Text(format!("v{row}")),
                };
                change(&row.to_string(), field, value)
            },
        )
    }

    proptest! {
        #[test]
        fn merge_is_deterministic(rows in prop::collection::vec(1u32..8, 0..8), pending in prop::collection::vec(arb_change(), 0..20)) {
            let remote: Vec<Material> = rows.into_iter().map(item).collect();
            prop_assert_eq!(merge(&remote, &pending), merge(&remote, &pending));
        }

        #[test]
        fn merge_is_idempotent(rows in prop::collection::vec(1u32..8, 0..8), pending in prop::collection::vec(arb_change(), 0..20)) {
            let remote: Vec<Material> = rows.into_iter().map(item).collect();
            let once = merge(&remote, &pending);
            prop_assert_eq!(merge(&once, &pending), once.clone());
            prop_assert_eq!(once.len(), remote.len());
        }
    }
}
