//! JSON-file storage backend.
//!
//! The whole store is one JSON object on disk. It is loaded once when the
//! store is opened and rewritten atomically after every change, so a template
//! cached by one process is visible to the next one that opens the file.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KeyValueStore, StorageError};
use crate::utils::fs::safe_write;

/// Durable [`KeyValueStore`] backed by a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<u64>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file starts an empty store. A file that is not a JSON object
    /// of strings is discarded with a warning: it holds nothing but cache
    /// entries, and every entry can be fetched again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template store: {}", path.display()))?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        "Discarding unreadable template store {}: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened template store {} ({} entries)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota,
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>, key: &str) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Io {
            reason: e.to_string(),
        })?;

        if let Some(limit) = self.quota
            && serialized.len() as u64 > limit
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                limit,
            });
        }

        safe_write(&self.path, &serialized).map_err(|e| StorageError::Io {
            reason: format!("{e:#}"),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Unavailable {
            reason: "template store lock poisoned".to_string(),
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries, key) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries, key) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_persists_across_opens() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("store.json");

        let store = FileStore::open(&path, None)?;
        store.set("common-tpl-mapping:#cart", "abc123")?;
        store.set("common-tpl-hash:abc123", "<ul></ul>")?;
        store.remove("common-tpl-mapping:#cart")?;
        drop(store);

        let reopened = FileStore::open(&path, None)?;
        assert_eq!(reopened.get("common-tpl-mapping:#cart")?, None);
        assert_eq!(reopened.get("common-tpl-hash:abc123")?, Some("<ul></ul>".to_string()));
        assert_eq!(reopened.keys()?, vec!["common-tpl-hash:abc123".to_string()]);
        Ok(())
    }

    #[test]
    fn test_file_store_quota_rolls_back() -> Result<()> {
        let temp = TempDir::new()?;
        let store = FileStore::open(temp.path().join("store.json"), Some(40))?;

        store.set("a", "1")?;
        let result = store.set("b", &"x".repeat(100));
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert_eq!(store.get("b")?, None);
        assert_eq!(store.get("a")?, Some("1".to_string()));
        Ok(())
    }

    #[test]
    fn test_corrupt_store_starts_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("store.json");
        std::fs::write(&path, "not json")?;

        let store = FileStore::open(&path, None)?;
        assert!(store.keys()?.is_empty());
        Ok(())
    }
}
