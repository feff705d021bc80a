//! # campsync Sync Engine
//!
//! Offline-first synchronisation of the camp inventory with a
//! spreadsheet-backed HTTP endpoint.
//!
//! This crate provides:
//! - A durable change queue, deduplicated by item and field
//! - A pure merge of pending edits onto a fetched remote snapshot
//! - A single-flight sync state machine (idle → syncing → idle)
//! - A status publisher with an explicit observer list
//! - A periodic scheduler that also reacts to the queue threshold
//! - The remote gateway abstraction with an HTTP implementation
//!
//! ## Architecture
//!
//! The engine implements a **fetch-merge-push** model:
//! 1. Capture the pending edits
//! 2. Fetch the full remote dataset
//! 3. Overlay the captured edits onto it
//! 4. Push the captured edits
//! 5. Only then acknowledge them and replace the local snapshot
//!
//! ## Key Invariants
//!
//! - Local edits are applied and persisted before `edit` returns
//! - At most one pending record per item and field
//! - At most one sync in flight
//! - Pending edits leave the queue only after a confirmed push
//! - Failures are recorded, never fatal

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod http;
mod merge;
mod queue;
mod scheduler;
mod state;
mod status;
mod store;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EndpointConfig, SyncConfig};
pub use error::{SyncError, SyncResult, UnsyncedEdits};
pub use http::{HttpClient, HttpGateway, HttpResponse, ReqwestClient};
pub use merge::{merge, merge_with_report, MergeReport};
pub use queue::ChangeQueue;
pub use scheduler::SyncScheduler;
pub use state::{
    EditOutcome, SkipReason, SyncCycleResult, SyncEngine, SyncOutcome, SyncState, SyncStats,
    CANCELLED,
};
pub use status::{status_observer, ObserverId, StatusPublisher, SyncObserver, SyncStatus};
pub use store::{PersistentStore, CACHE_KEY, ENDPOINT_KEY, QUEUE_KEY, SCHEMA_VERSION};
pub use transport::{MockGateway, RemoteGateway};
