//! Configuration for the sync engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval of the periodic sync.
    pub sync_interval: Duration,
    /// Queue length that triggers a sync without waiting for the interval.
    pub queue_threshold: usize,
    /// Timeout of a single request to the endpoint.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration with the default values.
    pub fn new() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            queue_threshold: 10,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the periodic sync interval.
    ///
    /// A zero interval is raised to one millisecond.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the queue threshold. A threshold of zero is raised to one.
    pub fn with_queue_threshold(mut self, threshold: usize) -> Self {
        self.queue_threshold = threshold.max(1);
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Location of the spreadsheet endpoint.
///
/// Persisted next to the change queue. An empty URL means the engine
/// runs unconfigured: edits stay queued and reads come from the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// URL of the deployed Apps Script web app.
    pub apps_script_url: String,
}

impl EndpointConfig {
    /// Creates an endpoint configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            apps_script_url: url.into().trim().to_string(),
        }
    }

    /// Returns the URL if one is set.
    pub fn url(&self) -> Option<&str> {
        let url = self.apps_script_url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }

    /// Returns true if an endpoint is set.
    pub fn is_configured(&self) -> bool {
        self.url().is_some()
    }
}
