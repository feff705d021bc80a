//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A low-level key/value storage backend.
///
/// Backends are **opaque byte stores**. Each key names one slot holding
/// a single byte value; writing a key replaces its whole value.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful `put`
/// - `put` is atomic: a crash leaves either the old or the new value
/// - `put` and `remove` are durable once they return `Ok`
/// - `remove` of an absent key succeeds
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `None` if nothing has been stored under the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn put(&mut self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the removal fails.
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// Lists the keys that currently hold a value, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns true if a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Checks that `key` can name a storage slot.
///
/// Keys are non-empty and limited to ASCII letters, digits, `_`, `-`
/// and `.`, and may not start with a `.`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("change_queue").is_ok());
        assert!(validate_key("materials_cache.corrupt").is_ok());
        assert!(validate_key("endpoint-config").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("with space").is_err());
    }
}
