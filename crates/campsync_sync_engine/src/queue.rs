//! The durable change queue.

use crate::store::PersistentStore;
use campsync_storage::StorageBackend;
use campsync_sync_protocol::{ChangeRecord, Field, FieldValue, RowUpdate};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered log of pending field edits.
///
/// # Invariants
///
/// - At most one record per `(entity_id, field)`; a new edit of the same
///   field replaces the value and timestamp in place
/// - Every mutation is written to the store before the call returns
/// - Records leave the queue only through [`ChangeQueue::acknowledge`] or
///   [`ChangeQueue::clear`], after the engine saw the push succeed
pub struct ChangeQueue<B: StorageBackend> {
    records: Vec<ChangeRecord>,
    store: Arc<PersistentStore<B>>,
}

impl<B: StorageBackend> ChangeQueue<B> {
    /// Loads the queue persisted in `store`, or starts empty.
    pub fn load(store: Arc<PersistentStore<B>>) -> Self {
        let records = store.load_queue().unwrap_or_default();
        let mut queue = Self { records, store };
        queue.dedup_loaded();
        debug!(pending = queue.records.len(), "change queue loaded");
        queue
    }

    /// Records an edit.
    ///
    /// Never fails. A failed write to the store is logged and the edit is
    /// kept in memory; the next successful write persists it.
    pub fn enqueue(
        &mut self,
        entity_id: &str,
        row_index: u32,
        field: Field,
        value: FieldValue,
        timestamp: DateTime<Utc>,
    ) -> usize {
        let record = ChangeRecord::new(entity_id, row_index, field, value, timestamp);

        match self.records.iter_mut().find(|r| r.same_slot(&record)) {
            Some(existing) => {
                debug!(entity_id, %field, "replacing pending change");
                *existing = record;
            }
            None => {
                debug!(entity_id, %field, "queueing change");
                self.records.push(record);
            }
        }

        self.persist();
        self.records.len()
    }

    /// Number of pending records.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pending records in queue order.
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Copies the pending records, for a sync attempt to work from.
    pub fn capture(&self) -> Vec<ChangeRecord> {
        self.records.clone()
    }

    /// Builds the payload of the next batch write from the current records.
    pub fn snapshot_for_push(&self) -> Vec<RowUpdate> {
        self.records.iter().map(ChangeRecord::to_row_update).collect()
    }

    /// Removes the records of a batch the remote has confirmed.
    ///
    /// A record that was replaced after `pushed` was captured is newer
    /// than what the remote holds and stays queued. Returns the number of
    /// records removed.
    pub fn acknowledge(&mut self, pushed: &[ChangeRecord]) -> usize {
        let before = self.records.len();
        self.records.retain(|record| !pushed.contains(record));
        let removed = before - self.records.len();

        if self.records.is_empty() {
            self.clear();
        } else if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Empties the queue and its persisted copy.
    ///
    /// Only call this once the edits are known to be on the remote.
    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(e) = self.store.clear_queue() {
            warn!(error = %e, "failed to remove persisted change queue");
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_queue(&self.records) {
            warn!(error = %e, pending = self.records.len(), "failed to persist change queue");
        }
    }

    /// Older files may hold several records for one slot; keep the last.
    fn dedup_loaded(&mut self) {
        let mut kept: Vec<ChangeRecord> = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            match kept.iter_mut().find(|r| r.same_slot(&record)) {
                Some(existing) => *existing = record,
                None => kept.push(record),
            }
        }
        self.records = kept;
    }
}
