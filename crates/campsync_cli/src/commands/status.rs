//! Status command implementation.

use crate::session::Session;
use campsync_sync_engine::SyncStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    path: String,
    #[serde(flatten)]
    status: SyncStatus,
    cached_items: usize,
}

/// Runs the status command.
pub fn run(session: &Session, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;
    let report = StatusReport {
        path: session.path().display().to_string(),
        status: engine.status(),
        cached_items: engine.materials().len(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatusReport) {
    let status = &report.status;
    println!("Data directory: {}", report.path);
    println!(
        "Endpoint:       {}",
        if status.is_configured { "configured" } else { "not configured" }
    );
    println!("Cached items:   {}", report.cached_items);
    println!(
        "Pending edits:  {}{}",
        status.pending_count,
        if status.is_dirty { " (unsynced)" } else { "" }
    );
    if let Some(error) = &status.last_error {
        println!("Last error:     {error}");
    }
}
