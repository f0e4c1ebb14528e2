//! Durable client-side storage for the session record.
//!
//! The record is [`USER_KEY`] holding the serialized identity, [`TOKEN_KEY`]
//! holding the raw bearer and [`ACCESS_KEY`] holding the console session
//! cookie value. Storage knows nothing about their meaning; the guard
//! decides what is valid.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";
pub const ACCESS_KEY: &str = "access";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is corrupt: {0}")]
    Corrupt(String),
}

/// Key/value store with local-storage semantics.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Writes all entries as one record. A failed write must not leave a
    /// mix of old and new entries behind.
    fn set_record(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            if let Err(e) = self.set(key, value) {
                let _ = self.clear();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drops every entry. Used when the record cannot be trusted.
    fn clear(&self) -> Result<(), StorageError> {
        self.remove(USER_KEY)?;
        self.remove(TOKEN_KEY)?;
        self.remove(ACCESS_KEY)
    }
}

/// Entries kept as one JSON object in a file, replaced atomically on write.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let serialized =
            serde_json::to_vec_pretty(entries).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let tmpPath = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmpPath)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(&tmpPath, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        // An unreadable file is overwritten rather than merged into.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(key);
        self.write_entries(&entries)
    }

    fn set_record(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let record = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // One rename replaces the whole file, so readers never see half a record.
        self.write_entries(&record)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_entries(&BTreeMap::new())
    }
}

/// In-process storage, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn set_record(&self, record: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        entries.extend(record.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Ok(())
    }
}
