//! Client half of the CSP bridge.

use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use super::{CspData, deep_merge};
use crate::core::TplError;
use crate::dom::Dom;
use crate::templating::ChecksumManifest;

/// Lazily extracted CSP data for one page.
///
/// The first call to [`CspStore::data`] reads every node matching the selector,
/// merges the decoded objects in document order and detaches the nodes. Later
/// calls return the same data without touching the document.
pub struct CspStore {
    dom: Option<Arc<dyn Dom>>,
    selector: String,
    data: OnceLock<CspData>,
    manifest: OnceLock<ChecksumManifest>,
}

impl std::fmt::Debug for CspStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CspStore")
            .field("selector", &self.selector)
            .field("loaded", &self.data.get().is_some())
            .finish()
    }
}

impl CspStore {
    /// Create a store reading nodes matching `selector` from `dom`.
    pub fn new(dom: Arc<dyn Dom>, selector: impl Into<String>) -> Self {
        Self {
            dom: Some(dom),
            selector: selector.into(),
            data: OnceLock::new(),
            manifest: OnceLock::new(),
        }
    }

    /// Create a store that is already populated, without a document.
    pub fn preloaded(data: CspData) -> Self {
        Self {
            dom: None,
            selector: String::new(),
            data: OnceLock::from(data),
            manifest: OnceLock::new(),
        }
    }

    /// The merged CSP data, extracted on first access.
    pub fn data(&self) -> &CspData {
        self.data.get_or_init(|| self.extract())
    }

    /// The template checksum manifest, parsed once.
    pub fn manifest(&self) -> &ChecksumManifest {
        self.manifest.get_or_init(|| self.data().tpl_checksums())
    }

    fn extract(&self) -> CspData {
        let Some(dom) = &self.dom else {
            return CspData::default();
        };

        let mut merged = Value::Object(Map::new());
        let values = dom.take_values(&self.selector);
        let node_count = values.len();

        for raw in values {
            match decode_node(&raw) {
                Ok(object) => deep_merge(&mut merged, Value::Object(object)),
                Err(e) => tracing::warn!("Skipping CSP node: {}", e),
            }
        }

        tracing::debug!("Extracted CSP data from {} node(s)", node_count);

        match merged {
            Value::Object(map) => CspData::new(map),
            _ => CspData::default(),
        }
    }
}

/// Decode one CSP node value: URL-decode, then parse a JSON object.
///
/// # Errors
///
/// Returns [`TplError::CspDecodeError`] when the value is not valid
/// percent-encoded UTF-8 or does not hold a JSON object.
pub fn decode_node(raw: &str) -> Result<Map<String, Value>, TplError> {
    let decoded = urlencoding::decode(raw).map_err(|e| TplError::CspDecodeError {
        reason: e.to_string(),
    })?;

    match serde_json::from_str::<Value>(&decoded) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TplError::CspDecodeError {
            reason: format!("expected a JSON object, found {other}"),
        }),
        Err(e) => Err(TplError::CspDecodeError {
            reason: e.to_string(),
        }),
    }
}
