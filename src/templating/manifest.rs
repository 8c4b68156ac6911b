//! Server-supplied checksum manifest.

use serde_json::Value;
use std::collections::HashMap;

/// Read-only `BlockName -> checksum` mapping for the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    checksums: HashMap<String, String>,
}

impl ChecksumManifest {
    /// Build a manifest from its JSON form.
    ///
    /// Only object entries with string or numeric values are kept; anything
    /// else is ignored with a debug log.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::debug!("Checksum manifest is not an object; treating it as empty");
            return Self::default();
        };

        let checksums = object
            .iter()
            .filter_map(|(block, checksum)| match checksum {
                Value::String(s) => Some((block.clone(), s.clone())),
                Value::Number(n) => Some((block.clone(), n.to_string())),
                _ => {
                    tracing::debug!("Ignoring non-string checksum for block '{}'", block);
                    None
                }
            })
            .collect();

        Self {
            checksums,
        }
    }

    /// Checksum the server currently reports for `block_name`.
    pub fn get_checksum(&self, block_name: &str) -> Option<&str> {
        self.checksums.get(block_name).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.checksums.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.checksums.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ChecksumManifest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            checksums: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let manifest = ChecksumManifest::from_value(&json!({
            "promo_banner": "abc123",
            "numeric": 42,
            "bogus": ["x"]
        }));
        assert_eq!(manifest.get_checksum("promo_banner"), Some("abc123"));
        assert_eq!(manifest.get_checksum("numeric"), Some("42"));
        assert_eq!(manifest.get_checksum("bogus"), None);
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_non_object_is_empty() {
        assert!(ChecksumManifest::from_value(&json!("abc")).is_empty());
    }

    #[test]
    fn test_from_iter() {
        let manifest: ChecksumManifest = [("a", "1")].into_iter().collect();
        assert_eq!(manifest.get_checksum("a"), Some("1"));
    }
}
