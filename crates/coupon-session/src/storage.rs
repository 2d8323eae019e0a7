//! Key/value client storage.
//!
//! [`LocalStorage`] mirrors the browser storage API the claim session was
//! designed around: string values under string keys, with removal. Two
//! backends are provided:
//!
//! - [`FileStorage`]: one `<key>.json` file per key in a data directory
//! - [`MemoryStorage`]: process-local map, used by tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::SessionError;

/// String key/value store for client-side state.
pub trait LocalStorage: Send + Sync {
    /// Read the value under `key`. Returns `None` if unset.
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove `key`. Removing an unset key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), SessionError>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove_item(key)
    }
}

impl<T: LocalStorage + ?Sized> LocalStorage for &T {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove_item(key)
    }
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// Storage rooted at a directory, one file per key.
///
/// Writes go to a temporary sibling file first and are renamed into place,
/// so a crash mid-write never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory for the client (e.g. `~/.local/share/coupon-hub`).
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coupon-hub")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SessionError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SessionError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        self.items.lock().remove(key);
        Ok(())
    }
}
