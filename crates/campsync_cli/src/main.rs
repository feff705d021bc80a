//! campsync CLI
//!
//! Command-line host for the offline-first camp inventory sync.
//!
//! # Commands
//!
//! - `configure` - Set or clear the spreadsheet endpoint
//! - `edit` - Change one field of an item and queue it
//! - `status` - Show the sync status
//! - `list` - Show the local dataset or the pending edits
//! - `sync` - Run one sync cycle
//! - `watch` - Keep syncing in the background until interrupted

mod commands;
mod session;

use campsync_sync_engine::SyncConfig;
use campsync_sync_protocol::Field;
use clap::{Parser, Subcommand};
use session::Session;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Offline-first sync for the camp inventory sheet.
#[derive(Parser)]
#[command(name = "campsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local data directory
    #[arg(global = true, short, long, default_value = ".campsync")]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Endpoint URL, overriding the configured one
    #[arg(global = true, long, env = "CAMPSYNC_ENDPOINT")]
    endpoint: Option<String>,

    /// Seconds between periodic syncs
    #[arg(global = true, long, default_value = "60")]
    interval: u64,

    /// Pending edits that trigger a sync immediately
    #[arg(global = true, long, default_value = "10")]
    threshold: usize,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set or clear the spreadsheet endpoint
    Configure {
        /// Apps Script web app URL
        url: Option<String>,

        /// Remove the stored endpoint
        #[arg(long, conflicts_with = "url")]
        clear: bool,
    },

    /// Change one field of an item
    Edit {
        /// Item id (its sheet row)
        id: String,

        /// Field name, e.g. packed or actualQty
        field: Field,

        /// New value, coerced to the field's type
        value: String,

        /// Sync right after queueing the edit
        #[arg(short, long)]
        sync: bool,
    },

    /// Show the sync status
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the local dataset
    List {
        /// Show pending edits instead of items
        #[arg(long)]
        pending: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run one sync cycle
    Sync,

    /// Sync periodically until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SyncConfig::new()
        .with_sync_interval(Duration::from_secs(cli.interval))
        .with_queue_threshold(cli.threshold)
        .with_request_timeout(Duration::from_secs(cli.timeout));
    let session = Session::new(cli.path, cli.endpoint, config);

    match cli.command {
        Commands::Configure { url, clear } => {
            commands::configure::run(&session, url.as_deref(), clear)?;
        }
        Commands::Edit {
            id,
            field,
            value,
            sync,
        } => {
            commands::edit::run(&session, &id, field, &value, sync).await?;
        }
        Commands::Status { format } => {
            commands::status::run(&session, &format)?;
        }
        Commands::List { pending, format } => {
            commands::list::run(&session, pending, &format)?;
        }
        Commands::Sync => {
            commands::sync::run(&session).await?;
        }
        Commands::Watch => {
            commands::watch::run(&session).await?;
        }
    }

    Ok(())
}
