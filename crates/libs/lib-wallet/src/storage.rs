//! # Persisted Provider Selection
//!
//! Key/value storage that remembers the selected wallet provider across restarts.
//!
//! ## Stores
//! - [`MemoryStore`]: process-local map, for tests and ephemeral sessions
//! - [`FileStore`]: a single JSON file (`storage.json`) holding a string map
//!
//! ## PersistedValue
//!
//! [`PersistedValue`] binds one key of a store to an [`Observable`]. Writes go to the
//! store first and then update the observable, which is what drives the session's
//! re-derivation. [`PersistedValue::refresh`] re-reads the backing store so changes
//! made by another process are picked up.
//!
//! Stores are not watched. A consumer that needs to follow writes made outside
//! the session (another process, another tab of the same profile) must call
//! [`WalletSession::refresh_selection`](crate::session::WalletSession::refresh_selection)
//! periodically or on its own change signal.

use crate::error::StorageError;
use crate::observable::Observable;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimal string key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, or remove the key when `value` is `None`.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.entries.write().insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        match value {
            Some(value) => entries.insert(key.to_string(), value.to_string()),
            None => entries.remove(key),
        };
        Ok(())
    }
}

/// JSON file store, one `storage.json` per directory.
///
/// Writes go to a temporary file that is renamed over the original, so a crash
/// never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "storage.json";

    /// Open (or lazily create) the store inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(Self::FILE_NAME),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();

        let mut entries = self.read_all()?;
        match value {
            Some(value) => entries.insert(key.to_string(), value.to_string()),
            None => entries.remove(key),
        };

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// One store key exposed as an observable `Option<String>`.
#[derive(Clone)]
pub struct PersistedValue {
    key: String,
    store: Arc<dyn KeyValueStore>,
    value: Observable<Option<String>>,
}

impl PersistedValue {
    /// Bind `key` of `store`, reading its current value.
    ///
    /// A read failure is logged and treated as "no value".
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = store.get(&key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Failed to read persisted value");
            None
        });

        Self {
            key,
            store,
            value: Observable::new(initial),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Option<String> {
        self.value.get()
    }

    /// Write through to the store, then update observers.
    ///
    /// Writing the current value is a no-op and does not touch the store. A store
    /// failure is logged; observers are still updated so in-memory state follows
    /// the caller's intent.
    pub fn set(&self, value: Option<String>) -> bool {
        if self.value.with(|current| *current == value) {
            return false;
        }

        if let Err(e) = self.store.set(&self.key, value.as_deref()) {
            warn!(key = %self.key, error = %e, "Failed to persist value");
        }
        debug!(key = %self.key, value = ?value, "Persisted value updated");
        self.value.set(value)
    }

    /// Re-read the store and propagate an external change, if any.
    pub fn refresh(&self) -> Result<bool, StorageError> {
        let stored = self.store.get(&self.key)?;
        Ok(self.value.set(stored))
    }

    pub fn observable(&self) -> &Observable<Option<String>> {
        &self.value
    }
}
