//! CLI command implementations.

pub mod configure;
pub mod edit;
pub mod list;
pub mod status;
pub mod sync;
pub mod watch;

use campsync_sync_engine::{SkipReason, SyncOutcome};

/// Prints a one-line summary of a sync attempt.
pub(crate) fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Completed(result) => {
            println!(
                "✓ Synced: {} item(s) fetched, {} edit(s) pushed in {:?}",
                result.fetched, result.pushed, result.duration
            );
            if result.still_pending > 0 {
                println!(
                    "  {} edit(s) made during the sync are still pending",
                    result.still_pending
                );
            }
            if !result.orphaned.is_empty() {
                println!(
                    "  Dropped edits for items no longer in the sheet: {}",
                    result.orphaned.join(", ")
                );
            }
        }
        SyncOutcome::Skipped(SkipReason::AlreadySyncing) => println!("Sync already in progress"),
        SyncOutcome::Skipped(SkipReason::Unconfigured) => {
            println!("No endpoint configured; edits stay queued locally")
        }
        SyncOutcome::Failed(error) => println!("✗ Sync failed: {error}"),
    }
}
