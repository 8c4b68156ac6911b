//! Server half of the CSP bridge.

use serde_json::{Map, Value};

use crate::constants::{CSP_CLASS_NAME, CSP_TRANSLATIONS_KEY};

/// Accumulates data for the hidden CSP node.
#[derive(Debug, Clone, Default)]
pub struct CspBuilder {
    data: Map<String, Value>,
}

impl CspBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge `data` into the accumulated object.
    ///
    /// Non-object values are ignored, as are objects whose values are all
    /// empty (`null`, `false`, `0`, `""`, `"0"`, `[]` or `{}`).
    pub fn set_data(&mut self, data: Value) -> &mut Self {
        let Value::Object(data) = data else {
            tracing::debug!("Ignoring non-object CSP data");
            return self;
        };

        if data.values().any(is_filled) {
            self.data.extend(data);
        }
        self
    }

    /// Merge translations into the `__` map.
    ///
    /// A missing or empty translation maps the text to itself.
    pub fn set_translation<I, K>(&mut self, translations: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let mut merged = match self.data.get(CSP_TRANSLATIONS_KEY) {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Map::new(),
        };

        for (text, translation) in translations {
            let text = text.into();
            let translation = translation.filter(|t| !t.is_empty()).unwrap_or_else(|| text.clone());
            merged.insert(text, Value::String(translation));
        }

        let mut wrapper = Map::new();
        wrapper.insert(CSP_TRANSLATIONS_KEY.to_string(), Value::Object(merged));
        self.set_data(Value::Object(wrapper))
    }

    /// The accumulated data.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Percent-encoded JSON, safe to place in an attribute value.
    pub fn encoded(&self) -> String {
        let json = Value::Object(self.data.clone()).to_string();
        urlencoding::encode(&json).into_owned()
    }

    /// Hidden `input` markup carrying the encoded data.
    pub fn hidden_markup(&self) -> String {
        format!(r#"<input class="{}" type="hidden" value="{}" />"#, CSP_CLASS_NAME, self.encoded())
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::decode_node;
    use serde_json::json;

    #[test]
    fn test_set_data_merges_shallowly() {
        let mut builder = CspBuilder::new();
        builder
            .set_data(json!({ "locale": "en_CA", "tplChecksums": { "a": "1" } }))
            .set_data(json!({ "tplChecksums": { "b": "2" } }));

        assert_eq!(builder.data()["locale"], json!("en_CA"));
        assert_eq!(builder.data()["tplChecksums"], json!({ "b": "2" }));
    }

    #[test]
    fn test_all_empty_data_is_ignored() {
        let mut builder = CspBuilder::new();
        builder.set_data(json!({ "locale": "en_CA" }));
        builder.set_data(json!({ "locale": "", "formKey": null, "flag": false }));
        assert_eq!(builder.data()["locale"], json!("en_CA"));
        assert!(!builder.data().contains_key("formKey"));
    }

    #[test]
    fn test_translations_accumulate() {
        let mut builder = CspBuilder::new();
        builder.set_translation([("Cart", Some("Panier".to_string()))]);
        builder.set_translation([("Checkout", None), ("Cart", Some("Chariot".to_string()))]);

        assert_eq!(builder.data()["__"], json!({ "Cart": "Chariot", "Checkout": "Checkout" }));
    }

    #[test]
    fn test_markup_round_trips_through_decoder() -> anyhow::Result<()> {
        let mut builder = CspBuilder::new();
        builder.set_data(json!({ "baseUrl": "https://shop.example/?a=1&b=\"2\"" }));

        let markup = builder.hidden_markup();
        assert!(markup.starts_with(r#"<input class="csp-data" type="hidden" value=""#));
        assert!(!builder.encoded().contains('"'));

        let decoded = decode_node(&builder.encoded())?;
        assert_eq!(decoded["baseUrl"], json!("https://shop.example/?a=1&b=\"2\""));
        Ok(())
    }
}
