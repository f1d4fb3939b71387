//! Key/value persistence used by the app.
//!
//! One trait, `StorageBackend`, with two implementations:
//!
//! - `FileStorage`: a single JSON file holding a map of string keys to string
//!   values, read once on open and rewritten synchronously on every mutation.
//! - `MemoryStorage`: the same map kept in memory only, for `--ignore-persisted`
//!   runs and tests.
//!
//! Structured values go through `save_json_backend` / `load_json_backend`,
//! which keep the trait object-safe.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Key holding the serialized `MapViewState`
pub const MAP_VIEW_STATE_KEY: &str = "map_view_state";
/// Key holding the recent search selections
pub const RECENT_SELECTIONS_KEY: &str = "recent_selections";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Platform storage error: {0}")]
    Platform(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Simple generic storage backend trait.
///
/// Keys and values are UTF-8 strings.
pub trait StorageBackend: Send + Sync {
    /// Store a string value for a key.
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read a string value for a key. Returns Ok(None) when key is missing.
    fn get_string(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove a key (no-op if key does not exist).
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, in no particular order.
    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}

pub fn save_json_backend<T: Serialize>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    match serde_json::to_string(value) {
        Ok(s) => backend.set_string(key, &s),
        Err(e) => Err(StorageError::Json(e.to_string())),
    }
}

pub fn load_json_backend<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> StorageResult<Option<T>> {
    match backend.get_string(key)? {
        Some(s) => match serde_json::from_str::<T>(&s) {
            Ok(v) => Ok(Some(v)),
            Err(e) => Err(StorageError::Json(e.to_string())),
        },
        None => Ok(None),
    }
}

fn lock_map(map: &Mutex<HashMap<String, String>>) -> StorageResult<MutexGuard<'_, HashMap<String, String>>> {
    map.lock()
        .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))
}

/// File-based storage: a single JSON file which is a map of key -> string value.
///
/// The file is read into memory on open. Mutations update memory and flush
/// the whole map back to disk synchronously.
pub struct FileStorage {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Per-user default location:
    /// - On Windows: %APPDATA%/PlaqueTrail/storage.json
    /// - Else: $HOME/.config/plaque-trail/storage.json
    fn default_storage_path() -> PathBuf {
        if cfg!(windows)
            && let Ok(appdata) = std::env::var("APPDATA")
        {
            return Path::new(&appdata).join("PlaqueTrail").join("storage.json");
        }

        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home)
                .join(".config")
                .join("plaque-trail")
                .join("storage.json");
        }

        Path::new(".").join("plaque-trail-storage.json")
    }

    pub fn new_with_path(path: Option<PathBuf>) -> StorageResult<Self> {
        let path = path.unwrap_or_else(Self::default_storage_path);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return Err(StorageError::Io(format!(
                "Failed to create storage parent directory: {}",
                e
            )));
        }

        let mut map: HashMap<String, String> = HashMap::new();
        if path.exists() {
            let s = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("Failed to read storage file: {}", e)))?;
            if !s.trim().is_empty() {
                match serde_json::from_str::<HashMap<String, String>>(&s) {
                    Ok(m) => map = m,
                    Err(e) => {
                        // A corrupt file costs the user their saved view, not the session
                        tracing::warn!(
                            "Ignoring unreadable storage file {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }

        tracing::debug!("Opened storage at {} ({} keys)", path.display(), map.len());
        Ok(FileStorage {
            path,
            inner: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_locked(&self, locked: &HashMap<String, String>) -> StorageResult<()> {
        let s =
            serde_json::to_string_pretty(locked).map_err(|e| StorageError::Json(e.to_string()))?;
        fs::write(&self.path, s).map_err(|e| StorageError::Io(format!("write failed: {}", e)))
    }
}

impl StorageBackend for FileStorage {
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = lock_map(&self.inner)?;
        guard.insert(key.to_string(), value.to_string());
        self.flush_locked(&guard)
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock_map(&self.inner)?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = lock_map(&self.inner)?;
        if guard.remove(key).is_some() {
            self.flush_locked(&guard)?;
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(lock_map(&self.inner)?.keys().cloned().collect())
    }
}

/// Volatile storage; nothing survives the process
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()> {
        lock_map(&self.inner)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock_map(&self.inner)?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        lock_map(&self.inner)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(lock_map(&self.inner)?.keys().cloned().collect())
    }
}

/// File storage at `path` (or the per-user default), or memory when persistence is off
pub fn default_storage_backend(
    path: Option<PathBuf>,
    ignore_persisted: bool,
) -> StorageResult<Arc<dyn StorageBackend>> {
    if ignore_persisted {
        tracing::info!("Ignoring persisted state, using in-memory storage");
        return Ok(Arc::new(MemoryStorage::new()));
    }
    Ok(Arc::new(FileStorage::new_with_path(path)?))
}
