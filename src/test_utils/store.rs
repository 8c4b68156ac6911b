use std::sync::atomic::{AtomicUsize, Ordering};

use crate::storage::{KeyValueStore, StorageError};

/// Storage backend that rejects every call, like a browser with storage
/// disabled.
#[derive(Debug, Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    /// Create a failing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that reached the store.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Unavailable {
            reason: "storage disabled".to_string(),
        })
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        self.fail()
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.fail()
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        self.fail()
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.fail()
    }
}
