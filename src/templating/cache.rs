//! In-process compiled template cache.
//!
//! Two links make up a lookup: `TemplateKey -> checksum` and
//! `checksum -> CompiledTemplate`. Keys whose templates share a checksum
//! share one compiled instance, and a checksum is compiled at most once per
//! cache (the first stored instance wins).

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::TemplateKey;
use super::compiler::CompiledTemplate;

/// Memory cache of compiled templates.
#[derive(Debug, Default)]
pub struct MemoryTemplateCache {
    key_to_checksum: DashMap<TemplateKey, String>,
    compiled: DashMap<String, Arc<CompiledTemplate>>,
    compiles: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl MemoryTemplateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled template for `key`, if both links exist.
    pub fn get(&self, key: &TemplateKey) -> Option<Arc<CompiledTemplate>> {
        let found = self
            .key_to_checksum
            .get(key)
            .and_then(|checksum| self.compiled.get(checksum.value()).map(|c| c.value().clone()));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Link `key` to an already compiled `checksum`.
    ///
    /// Returns the compiled template when one exists; otherwise nothing is
    /// recorded.
    pub fn link(&self, key: &TemplateKey, checksum: &str) -> Option<Arc<CompiledTemplate>> {
        let compiled = self.compiled.get(checksum).map(|c| c.value().clone())?;
        self.key_to_checksum.insert(key.clone(), checksum.to_string());
        Some(compiled)
    }

    /// Record `key -> checksum` and, unless `checksum` already has one, the
    /// compiled template. Returns the instance now cached for `checksum`.
    pub fn store(
        &self,
        key: &TemplateKey,
        checksum: &str,
        compiled: Arc<CompiledTemplate>,
    ) -> Arc<CompiledTemplate> {
        self.key_to_checksum.insert(key.clone(), checksum.to_string());

        let entry = self.compiled.entry(checksum.to_string()).or_insert_with(|| {
            self.compiles.fetch_add(1, Ordering::Relaxed);
            compiled
        });
        entry.value().clone()
    }

    /// Number of distinct compiled templates ever stored.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    /// Number of keys linked to a checksum.
    pub fn len(&self) -> usize {
        self.key_to_checksum.len()
    }

    /// Whether no key is linked.
    pub fn is_empty(&self) -> bool {
        self.key_to_checksum.is_empty()
    }

    /// `(hits, misses)` of [`MemoryTemplateCache::get`].
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Hit rate of [`MemoryTemplateCache::get`] as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.stats();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}
