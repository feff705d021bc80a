//! Sync engine state machine.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, UnsyncedEdits};
use crate::merge::{merge, merge_with_report};
use crate::queue::ChangeQueue;
use crate::status::{ObserverId, StatusPublisher, SyncObserver, SyncStatus};
use crate::store::PersistentStore;
use crate::transport::RemoteGateway;
use campsync_storage::StorageBackend;
use campsync_sync_protocol::{ChangeRecord, Field, FieldValue, Material, RowUpdate};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// `lastError` of an attempt that was dropped before it finished.
pub const CANCELLED: &str = "sync cancelled";

/// The current state of the sync engine.
///
/// `Error` only exists for the instant between a failed attempt and the
/// return to `Idle`; it is never left standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not syncing; a trigger may start a sync.
    Idle,
    /// A sync is in flight; triggers are ignored.
    Syncing,
    /// The last attempt failed.
    Error,
}

impl SyncState {
    /// Returns true if a new sync may start.
    pub fn can_start_sync(&self) -> bool {
        !matches!(self, SyncState::Syncing)
    }
}

/// Why a sync request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another sync is in flight.
    AlreadySyncing,
    /// No endpoint is configured.
    Unconfigured,
}

/// Result of a completed sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Items fetched from the remote.
    pub fetched: usize,
    /// Edits pushed to the remote.
    pub pushed: usize,
    /// Items whose pending changes had no remote row and were dropped.
    pub orphaned: Vec<String>,
    /// Edits made during the cycle that stay queued.
    pub still_pending: usize,
    /// Duration of the cycle.
    pub duration: Duration,
}

/// Outcome of a sync request.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The cycle ran to completion.
    Completed(SyncCycleResult),
    /// The request was ignored.
    Skipped(SkipReason),
    /// The cycle failed; the error is also in the status.
    Failed(SyncError),
}

impl SyncOutcome {
    /// Returns true for a completed cycle.
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }
}

/// Outcome of a local edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was applied locally and queued.
    Queued {
        /// Queue length after the edit.
        pending: usize,
        /// True if the queue reached the sync threshold.
        threshold_reached: bool,
    },
    /// No row index is known for the item, so the edit cannot be sent.
    UnknownEntity,
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles completed.
    pub cycles_completed: u64,
    /// Cycles that failed.
    pub cycles_failed: u64,
    /// Cycles abandoned before they finished.
    pub cycles_cancelled: u64,
    /// Requests ignored while a sync was in flight.
    pub skipped_in_flight: u64,
    /// Edits pushed.
    pub records_pushed: u64,
    /// Items fetched.
    pub items_fetched: u64,
    /// Pending changes dropped because their item vanished remotely.
    pub changes_orphaned: u64,
}

struct EngineState<B: StorageBackend> {
    state: SyncState,
    queue: ChangeQueue<B>,
    /// Last confirmed remote dataset, including our pushed edits.
    remote: Vec<Material>,
    /// `merge(remote, queue)`, what callers see.
    local: Vec<Material>,
    last_sync_time: Option<DateTime<Utc>>,
    last_error: Option<String>,
    stats: SyncStats,
    /// Bumped on every change that is published.
    seq: u64,
}

impl<B: StorageBackend> EngineState<B> {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// Marks a sync attempt in flight.
///
/// If the attempt's future is dropped at a suspension point, dropping the
/// guard returns the engine to idle with the queue untouched.
struct Flight<'a, G: RemoteGateway, B: StorageBackend, C: Clock> {
    engine: &'a SyncEngine<G, B, C>,
    landed: bool,
}

impl<G: RemoteGateway, B: StorageBackend, C: Clock> Flight<'_, G, B, C> {
    fn land(mut self) {
        self.landed = true;
    }
}

impl<G: RemoteGateway, B: StorageBackend, C: Clock> Drop for Flight<'_, G, B, C> {
    fn drop(&mut self) {
        if !self.landed {
            self.engine.abandon_sync();
        }
    }
}

/// The sync engine owns the change queue and the local dataset and
/// keeps them in step with the remote store.
///
/// All queue mutation and merging is synchronous; the only suspension
/// points are the two gateway calls, and the single-flight guard
/// serialises sync attempts.
pub struct SyncEngine<G: RemoteGateway, B: StorageBackend, C: Clock = SystemClock> {
    config: SyncConfig,
    store: Arc<PersistentStore<B>>,
    gateway: Option<G>,
    clock: C,
    inner: Mutex<EngineState<B>>,
    publisher: StatusPublisher,
    trigger: Arc<Notify>,
}

impl<G: RemoteGateway, B: StorageBackend, C: Clock> SyncEngine<G, B, C> {
    /// Creates an engine, loading the persisted queue and dataset.
    ///
    /// With `gateway` set to `None` the engine runs unconfigured: edits
    /// are queued and persisted, sync requests are skipped, and the status
    /// reports no error.
    pub fn open(config: SyncConfig, store: PersistentStore<B>, gateway: Option<G>, clock: C) -> Self {
        let store = Arc::new(store);
        let queue = ChangeQueue::load(Arc::clone(&store));
        let remote = store.load_snapshot().unwrap_or_default();
        let local = merge(&remote, queue.records());

        info!(
            pending = queue.size(),
            cached = remote.len(),
            configured = gateway.is_some(),
            "sync engine opened"
        );

        Self {
            config,
            store,
            gateway,
            clock,
            inner: Mutex::new(EngineState {
                state: SyncState::Idle,
                queue,
                remote,
                local,
                last_sync_time: None,
                last_error: None,
                stats: SyncStats::default(),
                seq: 0,
            }),
            publisher: StatusPublisher::new(),
            trigger: Arc::new(Notify::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the persistent store.
    pub fn store(&self) -> &PersistentStore<B> {
        &self.store
    }

    /// Returns the gateway, if configured.
    pub fn gateway(&self) -> Option<&G> {
        self.gateway.as_ref()
    }

    /// Returns true if an endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.inner.lock().stats.clone()
    }

    /// Computes the current status.
    pub fn status(&self) -> SyncStatus {
        let inner = self.inner.lock();
        self.status_of(&inner)
    }

    /// Returns a copy of the local dataset.
    pub fn materials(&self) -> Vec<Material> {
        self.inner.lock().local.clone()
    }

    /// Returns a copy of the pending edits.
    pub fn pending_changes(&self) -> Vec<ChangeRecord> {
        self.inner.lock().queue.capture()
    }

    /// Returns the payload the next push would send.
    pub fn pending_updates(&self) -> Vec<RowUpdate> {
        self.inner.lock().queue.snapshot_for_push()
    }

    /// Returns true while edits are waiting to be pushed.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.inner.lock().queue.is_empty()
    }

    /// Checks whether the process may exit without losing edits.
    ///
    /// Pending edits are persisted, but they only reach the remote once a
    /// sync succeeds; a host should warn before discarding the session.
    ///
    /// # Errors
    ///
    /// Returns [`UnsyncedEdits`] while the queue is not empty.
    pub fn exit_guard(&self) -> Result<(), UnsyncedEdits> {
        match self.inner.lock().queue.size() {
            0 => Ok(()),
            pending => Err(UnsyncedEdits { pending }),
        }
    }

    /// Registers an observer and sends it the current status and dataset.
    pub fn subscribe(&self, observer: Arc<dyn SyncObserver>) -> ObserverId {
        let (status, materials) = {
            let inner = self.inner.lock();
            (self.status_of(&inner), inner.local.clone())
        };
        observer.on_status(&status);
        observer.on_materials(&materials);
        self.publisher.subscribe(observer)
    }

    /// Removes an observer.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.publisher.unsubscribe(id)
    }

    /// Signal raised when the queue reaches the threshold.
    pub fn sync_trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.trigger)
    }

    /// Applies an edit locally and queues it for the remote.
    ///
    /// The local dataset and the persisted queue are updated before this
    /// returns, whether or not a sync is in flight. The value is coerced to
    /// the field's type. Reaching the queue threshold wakes the scheduler.
    pub fn edit(&self, entity_id: &str, field: Field, value: impl Into<FieldValue>) -> EditOutcome {
        let value: FieldValue = value.into();
        let value = value.coerce(field.kind());
        let now = self.clock.now();

        let (outcome, seq, status, materials) = {
            let mut inner = self.inner.lock();

            let row_index = inner
                .local
                .iter()
                .find(|m| m.id == entity_id)
                .and_then(Material::resolved_row_index)
                .or_else(|| entity_id.parse().ok());
            let Some(row_index) = row_index else {
                warn!(entity_id, %field, "edit for unknown item ignored");
                return EditOutcome::UnknownEntity;
            };

            let pending = inner.queue.enqueue(entity_id, row_index, field, value, now);
            let local = merge(&inner.remote, inner.queue.records());
            inner.local = local;

            let outcome = EditOutcome::Queued {
                pending,
                threshold_reached: pending >= self.config.queue_threshold,
            };
            let seq = inner.next_seq();
            (outcome, seq, self.status_of(&inner), inner.local.clone())
        };

        self.publisher.publish_update(seq, Some(&materials), &status);

        if let EditOutcome::Queued {
            pending,
            threshold_reached: true,
        } = outcome
        {
            debug!(pending, "queue threshold reached, requesting sync");
            self.trigger.notify_one();
        }
        outcome
    }

    /// Manual trigger. Returns true if a sync cycle completed.
    pub async fn force_sync(&self) -> bool {
        self.sync().await.is_completed()
    }

    /// Runs one fetch-merge-push cycle.
    ///
    /// Ignored while another sync is in flight or when unconfigured. On
    /// failure nothing is acknowledged and the local dataset is left as it
    /// was; the error is recorded in the status and the engine returns to
    /// idle. If the returned future is dropped before it completes, the
    /// engine returns to idle, keeps every pending edit and records the
    /// attempt as cancelled.
    pub async fn sync(&self) -> SyncOutcome {
        let Some(gateway) = self.gateway.as_ref() else {
            debug!("sync skipped: no endpoint configured");
            return SyncOutcome::Skipped(SkipReason::Unconfigured);
        };

        let start = Instant::now();
        let (captured, seq, status) = {
            let mut inner = self.inner.lock();
            if !inner.state.can_start_sync() {
                inner.stats.skipped_in_flight += 1;
                debug!("sync skipped: already in flight");
                return SyncOutcome::Skipped(SkipReason::AlreadySyncing);
            }
            inner.state = SyncState::Syncing;
            inner.last_error = None;
            let seq = inner.next_seq();
            (inner.queue.capture(), seq, self.status_of(&inner))
        };
        let flight = Flight {
            engine: self,
            landed: false,
        };
        self.publisher.publish_update(seq, None, &status);
        debug!(pending = captured.len(), "sync started");

        let result = Self::run_cycle(gateway, &captured).await;
        flight.land();
        match result {
            Ok((fetched, merged)) => self.finish_success(captured, fetched, merged, start),
            Err(error) => self.finish_failure(error),
        }
    }

    /// Fetch, merge against the captured batch, then push it.
    async fn run_cycle(
        gateway: &G,
        captured: &[ChangeRecord],
    ) -> SyncResult<(usize, crate::merge::MergeReport)> {
        let fetched = gateway.fetch_all().await?;
        let report = merge_with_report(&fetched, captured);

        if !captured.is_empty() {
            let updates: Vec<RowUpdate> = captured.iter().map(ChangeRecord::to_row_update).collect();
            gateway.push_batch(&updates).await?;
        }

        Ok((fetched.len(), report))
    }

    fn finish_success(
        &self,
        captured: Vec<ChangeRecord>,
        fetched: usize,
        report: crate::merge::MergeReport,
        start: Instant,
    ) -> SyncOutcome {
        let now = self.clock.now();
        let (result, seq, status, materials) = {
            let mut inner = self.inner.lock();

            inner.remote = report.materials;
            let acknowledged = inner.queue.acknowledge(&captured);
            let local = merge(&inner.remote, inner.queue.records());
            inner.local = local;

            if let Err(e) = self.store.save_snapshot(&inner.remote) {
                warn!(error = %e, "failed to persist dataset cache");
            }

            inner.last_sync_time = Some(now);
            inner.last_error = None;
            inner.state = SyncState::Idle;

            inner.stats.cycles_completed += 1;
            inner.stats.records_pushed += acknowledged as u64;
            inner.stats.items_fetched += fetched as u64;
            inner.stats.changes_orphaned += report.orphaned.len() as u64;

            let result = SyncCycleResult {
                fetched,
                pushed: captured.len(),
                orphaned: report.orphaned,
                still_pending: inner.queue.size(),
                duration: start.elapsed(),
            };
            let seq = inner.next_seq();
            (result, seq, self.status_of(&inner), inner.local.clone())
        };

        if !result.orphaned.is_empty() {
            warn!(ids = ?result.orphaned, "dropped pending changes for items missing remotely");
        }
        info!(
            fetched = result.fetched,
            pushed = result.pushed,
            still_pending = result.still_pending,
            duration_ms = result.duration.as_millis() as u64,
            "sync completed"
        );

        self.publisher.publish_update(seq, Some(&materials), &status);
        SyncOutcome::Completed(result)
    }

    fn finish_failure(&self, error: SyncError) -> SyncOutcome {
        let (seq, status) = {
            let mut inner = self.inner.lock();
            inner.state = SyncState::Error;
            inner.last_error = Some(error.to_string());
            inner.stats.cycles_failed += 1;
            warn!(
                kind = error.kind(),
                retryable = error.is_retryable(),
                error = %error,
                pending = inner.queue.size(),
                "sync failed, edits kept for retry"
            );
            inner.state = SyncState::Idle;
            (inner.next_seq(), self.status_of(&inner))
        };

        self.publisher.publish_update(seq, None, &status);
        SyncOutcome::Failed(error)
    }

    /// Called when a sync future is dropped mid-flight.
    fn abandon_sync(&self) {
        let (seq, status) = {
            let mut inner = self.inner.lock();
            if inner.state != SyncState::Syncing {
                return;
            }
            inner.state = SyncState::Idle;
            inner.last_error = Some(CANCELLED.to_string());
            inner.stats.cycles_cancelled += 1;
            warn!(pending = inner.queue.size(), "sync cancelled, edits kept for retry");
            (inner.next_seq(), self.status_of(&inner))
        };

        self.publisher.publish_update(seq, None, &status);
    }

    fn status_of(&self, inner: &EngineState<B>) -> SyncStatus {
        let pending_count = inner.queue.size();
        SyncStatus {
            is_dirty: pending_count > 0,
            pending_count,
            last_sync_time: inner.last_sync_time,
            is_syncing: inner.state == SyncState::Syncing,
            last_error: inner.last_error.clone(),
            is_configured: self.gateway.is_some(),
        }
    }
}
