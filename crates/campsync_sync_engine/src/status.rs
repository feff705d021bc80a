//! Observable sync status.

use campsync_sync_protocol::Material;
use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use serde::Serialize;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of the engine's sync status.
///
/// Derived on demand from the queue and the orchestrator; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// True while edits are waiting to be pushed.
    pub is_dirty: bool,
    /// Number of pending edits.
    pub pending_count: usize,
    /// End of the last successful sync.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// True while a sync is in flight.
    pub is_syncing: bool,
    /// Message of the last failed attempt, cleared when a new one starts.
    pub last_error: Option<String>,
    /// False when no endpoint is set; an unconfigured engine reports no error.
    pub is_configured: bool,
}

/// Receives status and data updates from the engine.
///
/// Called synchronously, once per change, with no coalescing; both
/// methods should be cheap and idempotent.
pub trait SyncObserver: Send + Sync {
    /// Called whenever the status may have changed.
    fn on_status(&self, status: &SyncStatus);

    /// Called whenever the local dataset changed.
    fn on_materials(&self, _materials: &[Material]) {}
}

struct FnObserver<F>(F);

impl<F> SyncObserver for FnObserver<F>
where
    F: Fn(&SyncStatus) + Send + Sync,
{
    fn on_status(&self, status: &SyncStatus) {
        (self.0)(status)
    }
}

/// Wraps a closure as a status-only observer.
pub fn status_observer<F>(f: F) -> Arc<dyn SyncObserver>
where
    F: Fn(&SyncStatus) + Send + Sync + 'static,
{
    Arc::new(FnObserver(f))
}

/// Handle returned by [`StatusPublisher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Delivers status and data updates to registered observers.
///
/// Updates computed on different threads are ordered by the sequence
/// number they were stamped with (see [`StatusPublisher::publish_update`]),
/// so observers never see an older status after a newer one.
#[derive(Default)]
pub struct StatusPublisher {
    observers: RwLock<Vec<(ObserverId, Arc<dyn SyncObserver>)>>,
    next_id: AtomicU64,
    /// Sequence number of the last stamped update delivered.
    delivered: ReentrantMutex<Cell<u64>>,
}

impl StatusPublisher {
    /// Creates a publisher with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn subscribe(&self, observer: Arc<dyn SyncObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, observer));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Sends `status` to every observer.
    pub fn publish_status(&self, status: &SyncStatus) {
        for observer in self.current() {
            observer.on_status(status);
        }
    }

    /// Sends `materials` to every observer.
    pub fn publish_materials(&self, materials: &[Material]) {
        for observer in self.current() {
            observer.on_materials(materials);
        }
    }

    /// Delivers an update stamped with `seq`, materials first.
    ///
    /// An update older than one already delivered is dropped and `false`
    /// is returned. Stamped updates are delivered one at a time; an update
    /// published from inside an observer callback supersedes the one being
    /// delivered, whose remaining observers are skipped.
    pub fn publish_update(
        &self,
        seq: u64,
        materials: Option<&[Material]>,
        status: &SyncStatus,
    ) -> bool {
        let delivered = self.delivered.lock();
        if seq <= delivered.get() {
            return false;
        }
        delivered.set(seq);

        for observer in self.current() {
            if delivered.get() != seq {
                break;
            }
            if let Some(materials) = materials {
                observer.on_materials(materials);
            }
            if delivered.get() != seq {
                break;
            }
            observer.on_status(status);
        }
        true
    }

    // Observers may subscribe or unsubscribe from inside a callback.
    fn current(&self) -> Vec<Arc<dyn SyncObserver>> {
        self.observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}
