/// Key-value persistence
///
/// Saves small JSON records such as the audio settings.
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Synchronous key-value store
///
/// `get` reports ordinary misses (absent key, missing or corrupt document) as
/// `Ok(None)`. An `Err` means the backing storage itself is failing.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by one JSON object document on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store file in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("BubbleSound").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self, key: &str) -> Result<Map<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    key: key.to_string(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                tracing::warn!("Ignoring corrupt store document: {}", self.path.display());
                Ok(Map::new())
            }
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_document(key)?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let write_failed = |source: std::io::Error| StoreError::Write {
            key: key.to_string(),
            source,
        };

        // Corrupt documents come back empty and are replaced; IO failures abort
        let mut document = self.read_document(key)?;
        document.insert(key.to_string(), value);

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(document))?;
        std::fs::write(&self.path, json).map_err(write_failed)?;

        tracing::debug!("Saved {} to {}", key, self.path.display());
        Ok(())
    }
}
