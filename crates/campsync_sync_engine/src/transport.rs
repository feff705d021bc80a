//! Remote gateway abstraction.

use crate::error::{SyncError, SyncResult};
use campsync_sync_protocol::{Material, RowUpdate};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// The boundary to the spreadsheet-backed store.
///
/// Both operations are whole-batch: a push is either fully applied or
/// reported as failed. Implementations enforce their own timeout and
/// surface it as [`SyncError::Transport`].
pub trait RemoteGateway: Send + Sync {
    /// Fetches the full remote dataset.
    fn fetch_all(&self) -> impl Future<Output = SyncResult<Vec<Material>>> + Send;

    /// Writes a batch of cell updates.
    fn push_batch(&self, updates: &[RowUpdate]) -> impl Future<Output = SyncResult<()>> + Send;
}

/// An in-memory gateway for testing.
///
/// Holds a remote dataset, applies pushed updates to it, counts calls and
/// can be told to fail or to hold fetches until released.
#[derive(Debug)]
pub struct MockGateway {
    remote: Mutex<Vec<Material>>,
    pushed: Mutex<Vec<Vec<RowUpdate>>>,
    fetch_failures: Mutex<VecDeque<SyncError>>,
    push_failures: Mutex<VecDeque<SyncError>>,
    offline: AtomicBool,
    fetch_calls: watch::Sender<usize>,
    push_calls: watch::Sender<usize>,
    gate: watch::Sender<bool>,
}

impl MockGateway {
    /// Creates a gateway serving an empty dataset.
    pub fn new() -> Self {
        Self::with_remote(Vec::new())
    }

    /// Creates a gateway serving `remote`.
    pub fn with_remote(remote: Vec<Material>) -> Self {
        Self {
            remote: Mutex::new(remote),
            pushed: Mutex::new(Vec::new()),
            fetch_failures: Mutex::new(VecDeque::new()),
            push_failures: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
            fetch_calls: watch::Sender::new(0),
            push_calls: watch::Sender::new(0),
            gate: watch::Sender::new(true),
        }
    }

    /// Replaces the remote dataset.
    pub fn set_remote(&self, remote: Vec<Material>) {
        *self.remote.lock() = remote;
    }

    /// Returns the remote dataset.
    pub fn remote(&self) -> Vec<Material> {
        self.remote.lock().clone()
    }

    /// Returns every batch pushed so far.
    pub fn pushed_batches(&self) -> Vec<Vec<RowUpdate>> {
        self.pushed.lock().clone()
    }

    /// Makes the next fetch fail with `error`.
    pub fn fail_next_fetch(&self, error: SyncError) {
        self.fetch_failures.lock().push_back(error);
    }

    /// Makes the next push fail with `error`.
    pub fn fail_next_push(&self, error: SyncError) {
        self.push_failures.lock().push_back(error);
    }

    /// Makes every call fail with a transport error until set back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Holds fetches after they are counted until [`MockGateway::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Lets held fetches continue.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Number of fetches started.
    pub fn fetch_calls(&self) -> usize {
        *self.fetch_calls.borrow()
    }

    /// Number of pushes started.
    pub fn push_calls(&self) -> usize {
        *self.push_calls.borrow()
    }

    /// Waits until at least `n` fetches have started.
    pub async fn wait_for_fetches(&self, n: usize) {
        let mut rx = self.fetch_calls.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::Transport("network unreachable".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteGateway for MockGateway {
    async fn fetch_all(&self) -> SyncResult<Vec<Material>> {
        self.fetch_calls.send_modify(|calls| *calls += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        self.check_online()?;
        if let Some(error) = self.fetch_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.remote.lock().clone())
    }

    async fn push_batch(&self, updates: &[RowUpdate]) -> SyncResult<()> {
        self.push_calls.send_modify(|calls| *calls += 1);

        self.check_online()?;
        if let Some(error) = self.push_failures.lock().pop_front() {
            return Err(error);
        }

        let mut remote = self.remote.lock();
        for update in updates {
            if let Some(row) = remote
                .iter_mut()
                .find(|m| m.row_index == Some(update.row_index))
            {
                *row = row.with_field(update.field, &update.value);
            }
        }
        self.pushed.lock().push(updates.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campsync_sync_protocol::Field;

    fn item(row: u32) -> Material {
        Material {
            id: row.to_string(),
            row_index: Some(row),
            ..Material::default()
        }
    }

    #[tokio::test]
    async fn mock_serves_remote() {
        let gateway = MockGateway::with_remote(vec![item(1), item(2)]);
        let fetched = gateway.fetch_all().await.unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(gateway.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn mock_applies_push() {
        let gateway = MockGateway::with_remote(vec![item(1)]);
        let update = RowUpdate {
            row_index: 1,
            field: Field::Packed,
            value: true.into(),
        };

        gateway.push_batch(&[update.clone()]).await.unwrap();
        assert!(gateway.remote()[0].packed);
        assert_eq!(gateway.pushed_batches(), vec![vec![update]]);
    }

    #[tokio::test]
    async fn mock_one_shot_failures() {
        let gateway = MockGateway::new();
        gateway.fail_next_fetch(SyncError::RemoteApplication("quota".into()));

        assert!(matches!(
            gateway.fetch_all().await,
            Err(SyncError::RemoteApplication(_))
        ));
        assert!(gateway.fetch_all().await.is_ok());
    }

    #[tokio::test]
    async fn mock_offline() {
        let gateway = MockGateway::new();
        gateway.set_offline(true);

        assert!(matches!(gateway.fetch_all().await, Err(SyncError::Transport(_))));
        assert!(matches!(gateway.push_batch(&[]).await, Err(SyncError::Transport(_))));
        assert!(gateway.pushed_batches().is_empty());
    }
}
