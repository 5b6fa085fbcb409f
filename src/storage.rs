// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Durable key/value storage for client state.
//!
//! The session and the chat history each live under their own named key.
//! Callers receive the store as an injected [`KeyValueStore`], so tests can
//! swap the file-backed store for [`MemoryStore`].
//!
//! [`FileStore`] keeps every key in one JSON object file. Each write takes an
//! exclusive lock on a sibling `.lock` file, writes a temp file and renames
//! it over the original, so a crash mid-write never leaves a torn file.

use fs2::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// File name of the persisted store inside the data directory.
pub const STORE_FILE: &str = "storage.json";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize storage: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A string key/value store that outlives a single run.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove a named set of keys.
    fn reset(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// Store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open (or lazily create) the store in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let path = dir.join(STORE_FILE);
        let lock_path = path.with_extension("lock");
        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File, StoreError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| StoreError::io(&self.lock_path, e))
    }

    /// Read the whole map. A missing file is empty; so is an unparsable one.
    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(
                    "STORE_CORRUPT | path={} error=\"{}\" treating as empty",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map)?;
        let temp_path = self.path.with_extension("tmp");

        {
            let mut temp_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StoreError::io(&temp_path, e))?;
            temp_file
                .write_all(content.as_bytes())
                .map_err(|e| StoreError::io(&temp_path, e))?;
            temp_file
                .sync_all()
                .map_err(|e| StoreError::io(&temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }

    /// Apply `change` to the map under the exclusive lock, then persist it.
    fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let lock = self.lock_file()?;
        lock.lock_exclusive()
            .map_err(|e| StoreError::io(&self.lock_path, e))?;

        let mut map = self.read_map()?;
        let result = if change(&mut map) {
            self.write_map(&map)
        } else {
            Ok(())
        };

        let _ = FileExt::unlock(&lock);
        result
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let lock = self.lock_file()?;
        lock.lock_shared()
            .map_err(|e| StoreError::io(&self.lock_path, e))?;
        let map = self.read_map()?;
        let _ = FileExt::unlock(&lock);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })?;
        tracing::debug!("STORE_SET | key={}", key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| map.remove(key).is_some())?;
        tracing::debug!("STORE_DELETE | key={}", key);
        Ok(())
    }

    fn reset(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.update(|map| {
            let mut changed = false;
            for key in keys {
                changed |= map.remove(*key).is_some();
            }
            changed
        })?;
        tracing::debug!("STORE_RESET | keys={:?}", keys);
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recover the guard even if a panicking thread poisoned the lock.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("STORE_LOCK_POISONED | recovering in-memory store");
                poisoned.into_inner()
            }
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_reset_removes_only_named_keys() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();

        store.reset(&["a", "b"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set("token", "abc").unwrap();
            store.set("userId", "7").unwrap();
        }

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("userId").unwrap().as_deref(), Some("7"));
        assert!(!dir.path().join("storage.tmp").exists());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        store.delete("anything").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert_eq!(store.get("token").unwrap(), None);

        // Writing replaces the corrupt content with a valid map.
        store.set("token", "t").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn test_file_store_reset() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("token", "t").unwrap();
        store.set("keep", "me").unwrap();

        store.reset(&["token", "missing"]).unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        assert_eq!(store.get("keep").unwrap().as_deref(), Some("me"));
    }
}
