//! Uncompiled templates as served by the template endpoint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Template text plus the checksum the server computed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTemplate {
    /// Template source
    pub content: String,
    /// Content checksum, opaque to the client
    pub checksum: String,
}

impl RawTemplate {
    /// Wrap `content`, computing its checksum (hex SHA-256).
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = checksum(&content);
        Self {
            content,
            checksum,
        }
    }
}

/// Hex SHA-256 of `content`.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
