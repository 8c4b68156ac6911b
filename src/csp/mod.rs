//! CSP data bridge.
//!
//! Server state reaches the client without inline scripts: the server encodes
//! a JSON object into the `value` of one or more hidden `<input class="csp-data">`
//! nodes ([`CspBuilder`]), and the client reads every such node once, merges
//! them, and removes them from the document ([`CspStore`]). The merged object is
//! exposed read-only as [`CspData`].
//!
//! Two keys matter to the template pipeline:
//!
//! - `tplChecksums` - the `BlockName -> checksum` manifest used to validate
//!   locally cached templates
//! - `isDeveloperMode` - gates logging of template compile and render errors
//!
//! # Examples
//!
//! ```rust
//! use common_tpl::csp::{CspBuilder, CspStore};
//! use common_tpl::dom::Document;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut builder = CspBuilder::new();
//! builder.set_data(json!({ "locale": "fr_CA", "tplChecksums": { "promo_banner": "abc123" } }));
//! let markup = builder.hidden_markup();
//!
//! let document = Arc::new(Document::from_html(&markup));
//! let store = CspStore::new(document, ".csp-data");
//! assert_eq!(store.data().locale(), Some("fr_CA"));
//! assert_eq!(store.data().tpl_checksums().get_checksum("promo_banner"), Some("abc123"));
//! ```

mod builder;
mod store;

pub use builder::CspBuilder;
pub use store::{CspStore, decode_node};

use serde_json::{Map, Value};

use crate::constants::{CSP_DEVELOPER_MODE_KEY, CSP_TPL_CHECKSUMS_KEY, CSP_TRANSLATIONS_KEY};
use crate::templating::ChecksumManifest;

/// Merged, read-only CSP configuration object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CspData {
    values: Map<String, Value>,
}

impl CspData {
    /// Wrap an already merged object.
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
        }
    }

    /// Wrap a JSON value; anything but an object yields empty data.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self::new(values),
            _ => Self::default(),
        }
    }

    /// The whole data set.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`; empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
    }

    /// Translate `text` through the `__` map, falling back to `text` itself.
    pub fn translate<'a>(&'a self, text: &'a str) -> &'a str {
        self.get(CSP_TRANSLATIONS_KEY)
            .and_then(|translations| translations.get(text))
            .and_then(Value::as_str)
            .filter(|translation| !translation.is_empty())
            .unwrap_or(text)
    }

    /// `baseUrl`
    pub fn base_url(&self) -> Option<&str> {
        self.get_str("baseUrl")
    }

    /// `jsUrl`
    pub fn js_url(&self) -> Option<&str> {
        self.get_str("jsUrl")
    }

    /// `formKey`
    pub fn form_key(&self) -> Option<&str> {
        self.get_str("formKey")
    }

    /// `locale`
    pub fn locale(&self) -> Option<&str> {
        self.get_str("locale")
    }

    /// `mediaUrl`
    pub fn media_url(&self) -> Option<&str> {
        self.get_str("mediaUrl")
    }

    /// `skinUrl`
    pub fn skin_url(&self) -> Option<&str> {
        self.get_str("skinUrl")
    }

    /// `storeUrl`
    pub fn store_url(&self) -> Option<&str> {
        self.get_str("storeUrl")
    }

    /// `uenc`
    pub fn uenc(&self) -> Option<&str> {
        self.get_str("uenc")
    }

    /// Whether the server flagged the page as running in developer mode.
    ///
    /// Accepts `true`, a non-zero number, or the strings `"1"` and `"true"`.
    pub fn is_developer_mode(&self) -> bool {
        match self.get(CSP_DEVELOPER_MODE_KEY) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// The template checksum manifest.
    pub fn tpl_checksums(&self) -> ChecksumManifest {
        self.get(CSP_TPL_CHECKSUMS_KEY)
            .map(ChecksumManifest::from_value)
            .unwrap_or_default()
    }
}

/// Merge `source` into `target`.
///
/// Objects merge key by key, recursively; any other value in `source`
/// replaces the one in `target`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
