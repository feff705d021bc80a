//! Typed, versioned persistence on top of a storage backend.
//!
//! Every value is stored as a JSON document:
//!
//! ```text
//! {"version": 1, "data": <payload>}
//! ```
//!
//! A document with another version is refused rather than misread.

use crate::config::EndpointConfig;
use crate::error::{SyncError, SyncResult};
use campsync_storage::StorageBackend;
use campsync_sync_protocol::{ChangeRecord, Material};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

/// Key of the pending change queue.
pub const QUEUE_KEY: &str = "change_queue";
/// Key of the last merged dataset.
pub const CACHE_KEY: &str = "materials_cache";
/// Key of the endpoint configuration.
pub const ENDPOINT_KEY: &str = "endpoint_config";
/// Version written into every persisted document.
pub const SCHEMA_VERSION: u32 = 1;

const CORRUPT_SUFFIX: &str = ".corrupt";

#[derive(Serialize)]
struct VersionedRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct Versioned<T> {
    data: T,
}

/// Durable storage of the change queue, the cached dataset and the
/// endpoint configuration.
pub struct PersistentStore<B: StorageBackend> {
    backend: Mutex<B>,
}

impl<B: StorageBackend> PersistentStore<B> {
    /// Wraps a storage backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    /// Runs `f` with the backend, for inspection.
    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.backend.lock())
    }

    /// Reads and decodes the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for an undecodable document or an unknown
    /// schema version, `Storage` if the backend fails.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> SyncResult<Option<T>> {
        let Some(bytes) = self.backend.lock().get(key)? else {
            return Ok(None);
        };

        let json: Value = serde_json::from_slice(&bytes)?;
        let header: Header = serde_json::from_value(json.clone())
            .map_err(|e| SyncError::Serialization(format!("{key}: missing version: {e}")))?;
        if header.version != SCHEMA_VERSION {
            return Err(SyncError::Serialization(format!(
                "{key}: unsupported schema version {} (expected {SCHEMA_VERSION})",
                header.version
            )));
        }

        let document: Versioned<T> = serde_json::from_value(json)?;
        Ok(Some(document.data))
    }

    /// Encodes and writes `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails, `Storage` if the write fails.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> SyncResult<()> {
        let bytes = serde_json::to_vec(&VersionedRef {
            version: SCHEMA_VERSION,
            data: value,
        })?;
        self.backend.lock().put(key, &bytes)?;
        Ok(())
    }

    /// Removes the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the removal fails.
    pub fn remove(&self, key: &str) -> SyncResult<()> {
        self.backend.lock().remove(key)?;
        Ok(())
    }

    /// Loads `key` for startup, never failing.
    ///
    /// An unreadable document is moved to `<key>.corrupt` so the next
    /// write does not destroy it, and `None` is returned.
    pub fn load_or_quarantine<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.load(key) {
            Ok(value) => value,
            Err(SyncError::Serialization(reason)) => {
                error!(key, %reason, "persisted state is unreadable, starting empty");
                if let Err(e) = self.quarantine(key) {
                    warn!(key, error = %e, "could not set aside unreadable state");
                }
                None
            }
            Err(e) => {
                error!(key, error = %e, "could not read persisted state, starting empty");
                None
            }
        }
    }

    fn quarantine(&self, key: &str) -> SyncResult<()> {
        let mut backend = self.backend.lock();
        if let Some(bytes) = backend.get(key)? {
            backend.put(&format!("{key}{CORRUPT_SUFFIX}"), &bytes)?;
            backend.remove(key)?;
        }
        Ok(())
    }

    /// Loads the persisted change queue.
    pub fn load_queue(&self) -> Option<Vec<ChangeRecord>> {
        self.load_or_quarantine(QUEUE_KEY)
    }

    /// Persists the change queue.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_queue(&self, records: &[ChangeRecord]) -> SyncResult<()> {
        self.save(QUEUE_KEY, &records)
    }

    /// Removes the persisted change queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    pub fn clear_queue(&self) -> SyncResult<()> {
        self.remove(QUEUE_KEY)
    }

    /// Loads the cached dataset.
    pub fn load_snapshot(&self) -> Option<Vec<Material>> {
        self.load_or_quarantine(CACHE_KEY)
    }

    /// Persists the cached dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_snapshot(&self, materials: &[Material]) -> SyncResult<()> {
        self.save(CACHE_KEY, &materials)
    }

    /// Loads the endpoint configuration.
    pub fn load_endpoint(&self) -> Option<EndpointConfig> {
        self.load_or_quarantine(ENDPOINT_KEY)
    }

    /// Persists the endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_endpoint(&self, endpoint: &EndpointConfig) -> SyncResult<()> {
        self.save(ENDPOINT_KEY, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campsync_storage::InMemoryBackend;
    use campsync_sync_protocol::Field;
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> ChangeRecord {
        ChangeRecord::new(
            id,
            id.parse().unwrap(),
            Field::Packed,
            true.into(),
            Utc.timestamp_opt(0, 0).unwrap(),
        )
    }

    #[test]
    fn queue_round_trip() {
        let store = PersistentStore::new(InMemoryBackend::new());
        store.save_queue(&[record("1"), record("2")]).unwrap();

        let loaded = store.load_queue().unwrap();
        assert_eq!(loaded, vec![record("1"), record("2")]);
    }

    #[test]
    fn documents_carry_version() {
        let store = PersistentStore::new(InMemoryBackend::new());
        store.save_endpoint(&EndpointConfig::new("https://x")).unwrap();

        let raw = store.with_backend(|b| b.get(ENDPOINT_KEY).unwrap().unwrap());
        let json: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["version"], SCHEMA_VERSION);
        assert_eq!(json["data"]["appsScriptUrl"], "https://x");
    }

    #[test]
    fn missing_key_is_none() {
        let store = PersistentStore::new(InMemoryBackend::new());
        assert!(store.load_snapshot().is_none());
        assert!(store.load::<Vec<Material>>(CACHE_KEY).unwrap().is_none());
    }

    #[test]
    fn unknown_version_is_refused() {
        let backend =
            InMemoryBackend::with_entries([(QUEUE_KEY, br#"{"version": 2, "data": []}"#.to_vec())]);
        let store = PersistentStore::new(backend);

        let err = store.load::<Vec<ChangeRecord>>(QUEUE_KEY).unwrap_err();
        assert!(matches!(err, SyncError::Serialization(ref m) if m.contains("version 2")));
    }

    #[test]
    fn unversioned_legacy_array_is_refused() {
        let backend = InMemoryBackend::with_entries([(QUEUE_KEY, b"[]".to_vec())]);
        let store = PersistentStore::new(backend);
        assert!(matches!(
            store.load::<Vec<ChangeRecord>>(QUEUE_KEY),
            Err(SyncError::Serialization(_))
        ));
    }

    #[test]
    fn corrupt_document_is_quarantined() {
        let backend = InMemoryBackend::with_entries([(CACHE_KEY, b"{not json".to_vec())]);
        let store = PersistentStore::new(backend);

        assert!(store.load_snapshot().is_none());

        let entries = store.with_backend(|b| b.entries());
        assert!(!entries.contains_key(CACHE_KEY));
        assert_eq!(
            entries.get("materials_cache.corrupt").map(Vec::as_slice),
            Some(&b"{not json"[..])
        );
    }

    #[test]
    fn clear_queue_removes_key() {
        let store = PersistentStore::new(InMemoryBackend::new());
        store.save_queue(&[record("1")]).unwrap();
        store.clear_queue().unwrap();
        assert!(store.with_backend(|b| b.keys().unwrap()).is_empty());
    }
}
