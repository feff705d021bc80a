//! Watch command implementation.

use super::print_outcome;
use crate::session::Session;
use campsync_sync_engine::{status_observer, SyncScheduler};
use std::sync::Arc;
use tracing::warn;

/// Runs the scheduler until interrupted.
///
/// A Ctrl-C while edits are pending is refused once: a final sync is tried
/// and the process keeps running if it fails. A second Ctrl-C exits.
pub async fn run(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(session.open_engine()?);
    if !engine.is_configured() {
        println!("No endpoint configured; edits stay queued locally");
    }

    engine.subscribe(status_observer(|status| {
        if status.is_syncing {
            return;
        }
        match &status.last_error {
            Some(error) => println!(
                "[{} pending] last sync failed: {error}",
                status.pending_count
            ),
            None => println!("[{} pending]", status.pending_count),
        }
    }));

    let scheduler = SyncScheduler::start(Arc::clone(&engine));
    println!(
        "Watching {} (every {:?}, Ctrl-C to stop)",
        session.path().display(),
        engine.config().sync_interval
    );

    let mut warned = false;
    loop {
        tokio::signal::ctrl_c().await?;

        match engine.exit_guard() {
            Ok(()) => break,
            Err(_) if warned => {
                warn!(pending = engine.status().pending_count, "exiting with unsynced edits");
                break;
            }
            Err(guard) => {
                warned = true;
                println!("{guard}; trying a final sync");
                print_outcome(&engine.sync().await);
                if engine.exit_guard().is_ok() {
                    break;
                }
                println!("Edits are saved locally but not synced; press Ctrl-C again to exit");
            }
        }
    }

    scheduler.stop();
    Ok(())
}
