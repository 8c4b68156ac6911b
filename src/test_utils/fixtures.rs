use serde_json::{Map, Value, json};

use crate::constants::CSP_CLASS_NAME;
use crate::csp::CspBuilder;
use crate::dom::Document;
use crate::templating::{RawTemplate, TemplateKey};

/// Templates as the template endpoint would serve them.
///
/// Checksums are computed from content, so a fixture can produce both the
/// response payload and the page manifest that validates it.
#[derive(Debug, Clone, Default)]
pub struct TemplateFixture {
    templates: Vec<(String, RawTemplate)>,
}

impl TemplateFixture {
    /// An empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template served under `key`.
    #[must_use]
    pub fn template(mut self, key: &str, content: &str) -> Self {
        self.templates.push((key.to_string(), RawTemplate::from_content(content)));
        self
    }

    /// Checksum of the template added under `key`.
    pub fn checksum(&self, key: &str) -> Option<String> {
        self.templates.iter().find(|(k, _)| k == key).map(|(_, raw)| raw.checksum.clone())
    }

    /// Response payload: `key -> { content, checksum }`.
    pub fn payload(&self) -> Value {
        let payload: Map<String, Value> = self
            .templates
            .iter()
            .map(|(key, raw)| (key.clone(), json!({ "content": raw.content, "checksum": raw.checksum })))
            .collect();
        Value::Object(payload)
    }

    /// A successful response envelope carrying [`TemplateFixture::payload`].
    pub fn envelope(&self) -> Value {
        json!({ "error": 0, "payload": self.payload() })
    }

    /// Checksum manifest: `block name -> checksum`.
    pub fn manifest(&self) -> Value {
        let manifest: Map<String, Value> = self
            .templates
            .iter()
            .filter_map(|(key, raw)| {
                TemplateKey::new(key).map(|key| (key.block_name(), Value::String(raw.checksum.clone())))
            })
            .collect();
        Value::Object(manifest)
    }

    /// CSP data carrying [`TemplateFixture::manifest`].
    pub fn csp_data(&self) -> Value {
        json!({ "tplChecksums": self.manifest() })
    }
}

/// A document holding one hidden CSP node with `data`.
pub fn page_with_csp(data: Value) -> Document {
    let mut builder = CspBuilder::new();
    builder.set_data(data);
    Document::new().with_input(&[CSP_CLASS_NAME], &builder.encoded())
}
