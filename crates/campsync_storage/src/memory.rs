//! In-memory storage backend for testing.

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory storage backend.
///
/// This backend stores all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Sessions that don't need to survive a restart
///
/// Writes can be made to fail on demand with [`InMemoryBackend::fail_writes`],
/// which lets callers exercise their handling of a full or broken disk.
///
/// # Example
///
/// ```rust
/// use campsync_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// backend.put("materials_cache", b"{}").unwrap();
/// assert!(backend.contains("materials_cache").unwrap());
/// backend.remove("materials_cache").unwrap();
/// assert!(!backend.contains("materials_cache").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing values.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: RwLock::new(data),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Returns a copy of every stored value.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, Vec<u8>> {
        self.data.read().clone()
    }

    /// Makes every subsequent `put` and `remove` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.data.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_put_and_get() {
        let mut backend = InMemoryBackend::new();
        backend.put("a", b"hello").unwrap();

        assert_eq!(backend.get("a").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(backend.get("b").unwrap(), None);
    }

    #[test]
    fn memory_put_replaces() {
        let mut backend = InMemoryBackend::new();
        backend.put("a", b"first").unwrap();
        backend.put("a", b"second").unwrap();

        assert_eq!(backend.get("a").unwrap(), Some(b"second".to_vec()));
        assert_eq!(backend.keys().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn memory_remove_absent_is_ok() {
        let mut backend = InMemoryBackend::new();
        assert!(backend.remove("missing").is_ok());
    }

    #[test]
    fn memory_with_entries() {
        let backend = InMemoryBackend::with_entries([("x", b"1".to_vec()), ("y", b"2".to_vec())]);
        assert_eq!(backend.keys().unwrap(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(backend.entries().len(), 2);
    }

    #[test]
    fn memory_simulated_failure() {
        let mut backend = InMemoryBackend::new();
        backend.put("a", b"kept").unwrap();

        backend.fail_writes(true);
        assert!(matches!(backend.put("a", b"lost"), Err(StorageError::Io(_))));
        assert!(backend.remove("a").is_err());
        assert_eq!(backend.get("a").unwrap(), Some(b"kept".to_vec()));

        backend.fail_writes(false);
        backend.put("a", b"new").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let mut backend = InMemoryBackend::new();
        assert!(matches!(
            backend.put("../x", b""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    proptest! {
        #[test]
        fn memory_last_put_wins(values in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..10)) {
            let mut backend = InMemoryBackend::new();
            for value in &values {
                backend.put("slot", value).unwrap();
            }
            prop_assert_eq!(backend.get("slot").unwrap(), values.last().cloned());
        }
    }
}
