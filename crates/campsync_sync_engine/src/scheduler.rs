//! Background trigger loop.

use crate::clock::Clock;
use crate::state::{SyncEngine, SyncOutcome};
use crate::transport::RemoteGateway;
use campsync_storage::StorageBackend;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Runs [`SyncEngine::sync`] on a fixed interval and whenever the change
/// queue reaches its threshold.
///
/// The first sync runs immediately. A trigger that arrives while a sync is
/// in flight is remembered and runs once the current cycle ends. Dropping
/// the scheduler stops the loop; a sync in progress is abandoned at its
/// next suspension point without acknowledging anything, and the engine
/// returns to idle.
pub struct SyncScheduler {
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawns the loop on the current tokio runtime.
    pub fn start<G, B, C>(engine: Arc<SyncEngine<G, B, C>>) -> Self
    where
        G: RemoteGateway + 'static,
        B: StorageBackend + 'static,
        C: Clock + 'static,
    {
        let period = engine.config().sync_interval;
        let trigger = engine.sync_trigger();
        info!(interval_ms = period.as_millis() as u64, "sync scheduler started");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => debug!("periodic sync"),
                    _ = trigger.notified() => debug!("threshold sync"),
                }

                if let SyncOutcome::Completed(_) = engine.sync().await {
                    ticker.reset();
                }
            }
        });

        Self { handle }
    }

    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the loop.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("sync scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::SyncConfig;
    use crate::store::PersistentStore;
    use crate::transport::MockGateway;
    use campsync_storage::InMemoryBackend;
    use campsync_sync_protocol::Field;
    use std::time::Duration;

    type Engine = SyncEngine<MockGateway, InMemoryBackend, SystemClock>;

    fn engine(config: SyncConfig) -> Arc<Engine> {
        Arc::new(SyncEngine::open(
            config,
            PersistentStore::new(InMemoryBackend::new()),
            Some(MockGateway::new()),
            SystemClock,
        ))
    }

    fn gateway(engine: &Engine) -> &MockGateway {
        engine.gateway().expect("configured")
    }

    #[tokio::test]
    async fn first_sync_runs_at_start() {
        let engine = engine(SyncConfig::new().with_sync_interval(Duration::from_secs(3600)));
        let scheduler = SyncScheduler::start(Arc::clone(&engine));

        tokio::time::timeout(Duration::from_secs(5), gateway(&engine).wait_for_fetches(1))
            .await
            .expect("initial sync");
        assert!(scheduler.is_running());
    }

    #[tokio::test]
    async fn interval_repeats() {
        let engine = engine(SyncConfig::new().with_sync_interval(Duration::from_millis(20)));
        let _scheduler = SyncScheduler::start(Arc::clone(&engine));

        tokio::time::timeout(Duration::from_secs(5), gateway(&engine).wait_for_fetches(3))
            .await
            .expect("periodic syncs");
    }

    #[tokio::test]
    async fn threshold_wakes_loop() {
        let engine = engine(
            SyncConfig::new()
                .with_sync_interval(Duration::from_secs(3600))
                .with_queue_threshold(2),
        );
        let _scheduler = SyncScheduler::start(Arc::clone(&engine));
        gateway(&engine).wait_for_fetches(1).await;

        engine.edit("1", Field::Packed, true);
        engine.edit("2", Field::Packed, true);

        tokio::time::timeout(Duration::from_secs(5), gateway(&engine).wait_for_fetches(2))
            .await
            .expect("threshold sync");
    }

    #[tokio::test]
    async fn stop_ends_loop() {
        let engine = engine(SyncConfig::new().with_sync_interval(Duration::from_millis(10)));
        let scheduler = SyncScheduler::start(Arc::clone(&engine));
        gateway(&engine).wait_for_fetches(1).await;

        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = gateway(&engine).fetch_calls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(gateway(&engine).fetch_calls(), calls);
    }
}
