//! File-based storage backend for persistent storage.
//!
//! Layout of a storage directory:
//!
//! ```text
//! <path>/
//! ├─ .lock             # Advisory lock for single-writer
//! ├─ change_queue      # One file per key
//! ├─ materials_cache
//! └─ .<key>.tmp        # Transient, only during a write
//! ```

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = ".lock";

/// A directory-based storage backend.
///
/// Every key is stored in its own file. Values survive process restarts.
///
/// # Durability
///
/// `put` writes to a temporary file, syncs it, renames it over the
/// target and then syncs the directory, so a crash leaves either the
/// previous value or the new one.
///
/// # Locking
///
/// The backend holds an exclusive advisory lock on the directory for
/// its whole lifetime; a second `open` of the same directory fails with
/// [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use campsync_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new(".campsync")).unwrap();
/// backend.put("change_queue", b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The path exists but is not a directory
    /// - Another process holds the lock (returns `Locked`)
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(StorageError::Corrupted(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path.display().to_string()));
        }

        debug!(path = %path.display(), "opened storage directory");

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the storage directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.path.join(key)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.path.join(format!(".{key}.tmp"))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // Directory fsync is not available on Windows
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.value_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let temp_path = self.temp_path(key);

        let mut file = File::create(&temp_path)?;
        file.write_all(value)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.value_path(key))?;
        self.sync_directory()
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => self.sync_directory(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_key(name).is_ok() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");

        let backend = FileBackend::open(&path).unwrap();
        assert!(path.is_dir());
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn file_put_and_get() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path()).unwrap();

        backend.put("change_queue", b"hello").unwrap();
        assert_eq!(backend.get("change_queue").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(backend.get("materials_cache").unwrap(), None);
    }

    #[test]
    fn file_put_replaces_whole_value() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path()).unwrap();

        backend.put("k", b"a much longer first value").unwrap();
        backend.put("k", b"short").unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(b"short".to_vec()));
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let mut backend = FileBackend::open(dir.path()).unwrap();
            backend.put("materials_cache", b"persistent data").unwrap();
        }

        {
            let backend = FileBackend::open(dir.path()).unwrap();
            assert_eq!(
                backend.get("materials_cache").unwrap(),
                Some(b"persistent data".to_vec())
            );
        }
    }

    #[test]
    fn file_remove() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path()).unwrap();

        backend.put("k", b"v").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        assert!(backend.remove("k").is_ok());
    }

    #[test]
    fn file_keys_skip_lock_and_temp_files() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path()).unwrap();

        backend.put("b", b"2").unwrap();
        backend.put("a", b"1").unwrap();
        fs::write(dir.path().join(".c.tmp"), b"partial").unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileBackend::open(dir.path()).unwrap();

        let second = FileBackend::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }

    #[test]
    fn file_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _backend = FileBackend::open(dir.path()).unwrap();
        }
        assert!(FileBackend::open(dir.path()).is_ok());
    }

    #[test]
    fn file_path_is_not_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("plain");
        fs::write(&file_path, b"x").unwrap();

        assert!(matches!(
            FileBackend::open(&file_path),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.path(), dir.path());
    }
}
