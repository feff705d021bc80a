//! Sync command implementation.

use super::print_outcome;
use crate::session::{CliError, Session};
use campsync_sync_engine::{SkipReason, SyncOutcome};

/// Runs one sync cycle.
pub async fn run(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;
    let outcome = engine.sync().await;
    print_outcome(&outcome);

    match outcome {
        SyncOutcome::Completed(_) => Ok(()),
        SyncOutcome::Skipped(SkipReason::Unconfigured) => Err(CliError::Unconfigured.into()),
        SyncOutcome::Skipped(SkipReason::AlreadySyncing) => Ok(()),
        SyncOutcome::Failed(error) => Err(CliError::Sync(error).into()),
    }
}
