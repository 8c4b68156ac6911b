//! Durable template persistence and checksum validation.
//!
//! Each cached template occupies two storage entries:
//!
//! ```text
//! common-tpl-mapping:<TemplateKey>  ->  checksum
//! common-tpl-hash:<checksum>        ->  raw template content
//! ```
//!
//! A mapping is trusted only while it equals the manifest checksum of the key's
//! block name. A mismatch (or a block the manifest no longer lists) evicts both
//! entries on read, so the template is fetched again. The last data each key
//! was rendered with lives under `common-tpl-data:<TemplateKey>`.

use serde_json::Value;
use std::sync::Arc;

use super::compiler::{CompiledTemplate, TemplateCompiler};
use super::TemplateKey;
use crate::constants::{STORAGE_DATA_PREFIX, STORAGE_HASH_PREFIX, STORAGE_MAPPING_PREFIX};
use crate::csp::CspStore;
use crate::storage::{SafeStore, StorageError};

fn mapping_key(key: &TemplateKey) -> String {
    format!("{STORAGE_MAPPING_PREFIX}{key}")
}

fn hash_key(checksum: &str) -> String {
    format!("{STORAGE_HASH_PREFIX}{checksum}")
}

fn data_key(key: &TemplateKey) -> String {
    format!("{STORAGE_DATA_PREFIX}{key}")
}

/// A durable mapping as listed by [`LocalTemplateStore::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTemplate {
    /// Template key
    pub key: String,
    /// Checksum the key points at
    pub checksum: String,
    /// Size of the stored content, when present
    pub content_bytes: Option<usize>,
    /// Whether prefetch data is stored for the key
    pub has_data: bool,
}

/// Memory-first template lookup backed by durable storage.
#[derive(Debug)]
pub struct LocalTemplateStore {
    store: Arc<SafeStore>,
    compiler: TemplateCompiler,
    csp: Arc<CspStore>,
}

impl LocalTemplateStore {
    /// Create a store validating against the manifest in `csp`.
    pub fn new(store: Arc<SafeStore>, compiler: TemplateCompiler, csp: Arc<CspStore>) -> Self {
        Self {
            store,
            compiler,
            csp,
        }
    }

    /// The compiler used for templates loaded from storage.
    pub fn compiler(&self) -> &TemplateCompiler {
        &self.compiler
    }

    /// Persist `content` for `key`.
    ///
    /// The mapping is written first and the content only once the mapping is
    /// in place. If the content write fails, the mapping is removed again so
    /// the key never points at a missing body.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] of the first failed write.
    pub fn store_local(&self, key: &TemplateKey, checksum: &str, content: &str) -> Result<(), StorageError> {
        self.store.try_set(&mapping_key(key), checksum)?;

        if let Err(e) = self.store.try_set(&hash_key(checksum), content) {
            let _ = self.store.try_remove(&mapping_key(key));
            return Err(e);
        }

        tracing::debug!("Stored template {} for {}", checksum, key);
        Ok(())
    }

    /// Resolve `key` without the network.
    ///
    /// Order: memory cache, then the durable mapping validated against the
    /// manifest, then the durable content (compiled and cached in memory).
    /// Any miss, eviction, storage failure or compile failure yields `None`.
    pub fn load_local(&self, key: &TemplateKey) -> Option<Arc<CompiledTemplate>> {
        if let Some(compiled) = self.compiler.cache().get(key) {
            tracing::trace!("Memory cache hit for {}", key);
            return Some(compiled);
        }

        let stored_checksum = self.store.try_get(&mapping_key(key))?;

        let block_name = key.block_name();
        let expected = self.csp.manifest().get_checksum(&block_name);
        if expected != Some(stored_checksum.as_str()) {
            tracing::debug!(
                "Evicting stale template for {} (stored {}, manifest {:?})",
                key,
                stored_checksum,
                expected
            );
            let _ = self.store.try_remove(&mapping_key(key));
            let _ = self.store.try_remove(&hash_key(&stored_checksum));
            return None;
        }

        let Some(content) = self.store.try_get(&hash_key(&stored_checksum)) else {
            tracing::debug!("Mapping for {} points at missing content {}", key, stored_checksum);
            return None;
        };

        self.compiler.compile(key, &content, &stored_checksum).ok()
    }

    /// Last data `key` was rendered with.
    pub fn load_prefetch_data(&self, key: &TemplateKey) -> Option<Value> {
        let raw = self.store.try_get(&data_key(key))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Discarding unreadable prefetch data for {}: {}", key, e);
                None
            }
        }
    }

    /// Remember the data `key` was rendered with.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] of the failed write.
    pub fn store_prefetch_data(&self, key: &TemplateKey, data: &Value) -> Result<(), StorageError> {
        self.store.try_set(&data_key(key), &data.to_string())
    }

    /// Every durable mapping, sorted by key.
    pub fn entries(&self) -> Vec<StoredTemplate> {
        let keys = self.store.keys();
        keys.iter()
            .filter_map(|stored| stored.strip_prefix(STORAGE_MAPPING_PREFIX))
            .filter_map(|key| {
                let checksum = self.store.try_get(&format!("{STORAGE_MAPPING_PREFIX}{key}"))?;
                let content_bytes = self.store.try_get(&hash_key(&checksum)).map(|c| c.len());
                let has_data = keys.iter().any(|k| k.strip_prefix(STORAGE_DATA_PREFIX) == Some(key));
                Some(StoredTemplate {
                    key: key.to_string(),
                    checksum,
                    content_bytes,
                    has_data,
                })
            })
            .collect()
    }
}
