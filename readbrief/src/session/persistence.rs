//! Session persistence: a small key-value store and the record helpers on top of it.

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::types::SessionRecord;

/// Fixed key under which the single session record lives.
pub const SESSION_KEY: &str = "readbrief_generation_state";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

/// Durable string storage, in the manner of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory: `<data_local_dir>/readbrief/state`.
    pub fn in_data_dir() -> Result<Self, StorageError> {
        let dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join("readbrief").join("state"))
            .ok_or_else(|| {
                StorageError::Unavailable("Could not determine data directory".to_string())
            })?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves a half-written record
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Write the record under [`SESSION_KEY`].
pub fn save_record(store: &dyn KeyValueStore, record: &SessionRecord) -> Result<(), StorageError> {
    let json =
        serde_json::to_string(record).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    store.set(SESSION_KEY, &json)
}

/// Read the record, if any.
pub fn load_record(store: &dyn KeyValueStore) -> Result<Option<SessionRecord>, StorageError> {
    match store.get(SESSION_KEY)? {
        None => Ok(None),
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(e.to_string())),
    }
}

/// Delete the record. Missing records are fine.
pub fn clear_record(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(SESSION_KEY)
}

/// Log a storage failure; the caller continues in memory.
pub(crate) fn report(operation: &str, err: &StorageError) {
    warn!("Session storage {} failed, continuing without persistence: {}", operation, err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{GenerationRequest, SessionStatus};
    use brief_api::{ChapterRef, GenerationMode};
    use tempfile::TempDir;

    fn record() -> SessionRecord {
        let request = GenerationRequest::new(
            "alan",
            vec![ChapterRef {
                id: "c1".to_string(),
                number: 1,
                title: "One".to_string(),
            }],
            GenerationMode::Summarization,
        );
        SessionRecord::new(&request, 1_000)
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(handle.get("k").unwrap(), Some("v".to_string()));
        handle.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("state"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "{\"a\":1}").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("{\"a\":1}".to_string()));
        assert!(temp_dir.path().join("state").join("k.json").exists());
        assert!(!temp_dir.path().join("state").join("k.json.tmp").exists());

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing twice is not an error
        store.remove("k").unwrap();
    }

    #[test]
    fn test_record_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        save_record(&store, &record()).unwrap();
        let loaded = load_record(&store).unwrap().unwrap();
        assert_eq!(loaded.book_name, "alan");
        assert_eq!(loaded.status, SessionStatus::Starting);

        clear_record(&store).unwrap();
        assert!(load_record(&store).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "not json").unwrap();
        assert!(matches!(load_record(&store), Err(StorageError::Corrupt(_))));
    }
}
