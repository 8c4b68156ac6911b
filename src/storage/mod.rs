//! Best-effort durable key-value storage.
//!
//! The template cache persists its entries in a string-to-string store shared
//! with everything else running on the page (in a browser this is local
//! storage; here it is a [`KeyValueStore`] implementation). That store may be
//! missing, disabled or full at any moment, so every access goes through
//! [`SafeStore`], which turns backend failures into "not found" on reads and a
//! recoverable [`StorageError`] on writes. Nothing in this module panics or
//! propagates a failure further than the immediate caller.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, optionally with a byte quota
//! - [`FileStore`] - JSON file written atomically on every change
//!
//! # Examples
//!
//! ```rust
//! use common_tpl::storage::{MemoryStore, SafeStore};
//! use std::sync::Arc;
//!
//! let store = SafeStore::new(Arc::new(MemoryStore::new()));
//! assert!(store.is_available());
//! store.try_set("common-tpl-hash:abc123", "<h1>{{ title }}</h1>").ok();
//! assert_eq!(store.try_get("common-tpl-hash:abc123").as_deref(), Some("<h1>{{ title }}</h1>"));
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::constants::STORAGE_PROBE_KEY;

/// Failures reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store is missing or disabled
    #[error("Storage is unavailable: {reason}")]
    Unavailable {
        /// Why the store cannot be used
        reason: String,
    },

    /// Writing the value would exceed the store's byte budget
    #[error("Storage quota exceeded while writing '{key}' (limit {limit} bytes)")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Configured byte budget
        limit: u64,
    },

    /// The backend failed to read or write its medium
    #[error("Storage I/O failed: {reason}")]
    Io {
        /// Underlying failure
        reason: String,
    },
}

/// A string-valued key-value store.
///
/// Implementations report failures as [`StorageError`]; callers are expected to
/// wrap them in a [`SafeStore`] rather than use them directly.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List every stored key.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Failure-tolerant adapter over a [`KeyValueStore`].
///
/// Availability is probed once, on first use, by writing and removing a
/// throwaway key; the result is cached for the adapter's lifetime. An
/// unavailable store never reaches the backend again.
pub struct SafeStore {
    backend: Option<Arc<dyn KeyValueStore>>,
    available: OnceLock<bool>,
}

impl std::fmt::Debug for SafeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeStore")
            .field("has_backend", &self.backend.is_some())
            .field("available", &self.available.get())
            .finish()
    }
}

impl SafeStore {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
            available: OnceLock::new(),
        }
    }

    /// A store with no backend at all; every read misses and every write fails.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            available: OnceLock::new(),
        }
    }

    /// Whether the backend accepted the availability probe.
    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let Some(backend) = &self.backend else {
                tracing::debug!("No storage backend configured");
                return false;
            };

            let probe = backend
                .set(STORAGE_PROBE_KEY, STORAGE_PROBE_KEY)
                .and_then(|()| backend.remove(STORAGE_PROBE_KEY));

            match probe {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!("Storage probe failed, running memory-only: {}", e);
                    false
                }
            }
        })
    }

    fn backend(&self) -> Result<&Arc<dyn KeyValueStore>, StorageError> {
        match &self.backend {
            Some(backend) if self.is_available() => Ok(backend),
            _ => Err(StorageError::Unavailable {
                reason: "storage probe failed".to_string(),
            }),
        }
    }

    /// Read a value; any failure is reported as "not found".
    pub fn try_get(&self, key: &str) -> Option<String> {
        let backend = self.backend().ok()?;
        match backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Storage read of '{}' failed: {}", key, e);
                None
            }
        }
    }

    /// Write a value.
    pub fn try_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let result = self.backend().and_then(|backend| backend.set(key, value));
        if let Err(e) = &result {
            tracing::debug!("Storage write of '{}' failed: {}", key, e);
        }
        result
    }

    /// Remove a value.
    pub fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        let result = self.backend().and_then(|backend| backend.remove(key));
        if let Err(e) = &result {
            tracing::debug!("Storage removal of '{}' failed: {}", key, e);
        }
        result
    }

    /// List stored keys; an unusable store has none.
    pub fn keys(&self) -> Vec<String> {
        self.backend().and_then(|backend| backend.keys()).unwrap_or_default()
    }
}
