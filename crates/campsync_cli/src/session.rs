//! Opening the local store and the engine for a command.

use campsync_storage::{FileBackend, StorageError};
use campsync_sync_engine::{
    EndpointConfig, HttpGateway, PersistentStore, ReqwestClient, SyncConfig, SyncEngine,
    SyncError, SystemClock,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The engine as the CLI runs it.
pub type CliEngine = SyncEngine<HttpGateway<ReqwestClient>, FileBackend, SystemClock>;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// The data directory could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Data directory.
        path: String,
        /// Underlying error.
        source: StorageError,
    },

    /// Sync engine error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The item id has no known sheet row.
    #[error("unknown item '{0}' (run `campsync sync` to refresh the item list)")]
    UnknownItem(String),

    /// The requested operation needs an endpoint.
    #[error("no endpoint configured (use `campsync configure <url>` or CAMPSYNC_ENDPOINT)")]
    Unconfigured,
}

/// Where the data lives and how to reach the endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    endpoint_override: Option<String>,
    config: SyncConfig,
}

impl Session {
    /// Creates a session. `endpoint_override` wins over the stored endpoint.
    pub fn new(path: PathBuf, endpoint_override: Option<String>, config: SyncConfig) -> Self {
        Self {
            path,
            endpoint_override,
            config,
        }
    }

    /// Returns the data directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the persistent store, taking the directory lock.
    pub fn open_store(&self) -> Result<PersistentStore<FileBackend>, CliError> {
        let backend = FileBackend::open(&self.path).map_err(|source| CliError::Open {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(PersistentStore::new(backend))
    }

    /// Resolves the endpoint: the override if given, else the stored one.
    pub fn endpoint(&self, store: &PersistentStore<FileBackend>) -> EndpointConfig {
        match &self.endpoint_override {
            Some(url) => EndpointConfig::new(url.as_str()),
            None => store.load_endpoint().unwrap_or_default(),
        }
    }

    /// Opens the engine; it runs unconfigured when no endpoint is set.
    pub fn open_engine(&self) -> Result<CliEngine, CliError> {
        let store = self.open_store()?;
        let endpoint = self.endpoint(&store);
        let gateway = match endpoint.url() {
            Some(url) => Some(HttpGateway::reqwest(url, self.config.request_timeout)?),
            None => None,
        };
        Ok(SyncEngine::open(
            self.config.clone(),
            store,
            gateway,
            SystemClock,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campsync_sync_protocol::Field;

    fn session(dir: &Path, endpoint: Option<&str>) -> Session {
        Session::new(
            dir.to_path_buf(),
            endpoint.map(str::to_string),
            SyncConfig::new(),
        )
    }

    #[test]
    fn stored_endpoint_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), None);

        {
            let store = session.open_store().unwrap();
            assert!(!session.endpoint(&store).is_configured());
            store
                .save_endpoint(&EndpointConfig::new("https://sheet.example/exec"))
                .unwrap();
        }

        let store = session.open_store().unwrap();
        assert_eq!(
            session.endpoint(&store).url(),
            Some("https://sheet.example/exec")
        );
    }

    #[test]
    fn override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), Some("https://other.example/exec"));
        let store = session.open_store().unwrap();
        store
            .save_endpoint(&EndpointConfig::new("https://sheet.example/exec"))
            .unwrap();

        assert_eq!(
            session.endpoint(&store).url(),
            Some("https://other.example/exec")
        );
    }

    #[test]
    fn unconfigured_engine_keeps_edits() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), None);

        {
            let engine = session.open_engine().unwrap();
            assert!(!engine.is_configured());
            engine.edit("5", Field::Packed, true);
        }

        let engine = session.open_engine().unwrap();
        assert_eq!(engine.status().pending_count, 1);
    }

    #[test]
    fn second_session_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), None);

        let _held = session.open_store().unwrap();
        assert!(matches!(
            session.open_store(),
            Err(CliError::Open {
                source: StorageError::Locked(_),
                ..
            })
        ));
    }
}
