//! The fixed JSON response envelope.
//!
//! Every endpoint the client talks to answers with the same shape:
//!
//! ```json
//! {
//!   "error": 0,
//!   "feedback": { "message": "Data retrieved successfully!", "debug": [] },
//!   "payload": { "...": "..." },
//!   "target": { "payload": ["#mini-cart"], "feedback": "#cart-messages" },
//!   "tpl": ["#mini-cart"]
//! }
//! ```
//!
//! `error` is mandatory and must be numeric; an object without it is an
//! [`FetchError::EnvelopeViolation`], never a success with an empty payload.
//! Every other field is optional.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::FetchError;

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `0` on success, `>= 1` when the server reports a failure
    pub error: i64,

    /// Human-readable feedback
    #[serde(default)]
    pub feedback: Feedback,

    /// Endpoint-specific content
    #[serde(default)]
    pub payload: Value,

    /// Selectors the client should fill automatically
    #[serde(default, skip_serializing_if = "Target::is_empty")]
    pub target: Target,

    /// Template keys the client should re-render with the payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tpl: Vec<String>,
}

/// `feedback` section of an [`Envelope`].
///
/// Both fields are kept as raw JSON: a non-string message is not an envelope
/// violation, it is just not shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Message to show the user
    #[serde(default)]
    pub message: Value,

    /// Debug entries, only sent in developer mode
    #[serde(default)]
    pub debug: Value,
}

impl Feedback {
    /// The message, when it is a string.
    pub fn message(&self) -> Option<&str> {
        self.message.as_str()
    }

    /// Whether any debug entries are present.
    pub fn has_debug(&self) -> bool {
        json_size(&self.debug) > 0
    }
}

/// `target` section of an [`Envelope`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Selectors whose same-named payload entries hold HTML to inject
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<String>,

    /// Selector that receives the feedback message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Target {
    /// Whether no target is set.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.feedback.is_none()
    }
}

impl Envelope {
    /// Decode an envelope from a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::EnvelopeViolation`] when the value is not an
    /// object, lacks `error`, or has a non-numeric `error`.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        let Value::Object(object) = &value else {
            return Err(FetchError::EnvelopeViolation {
                reason: "response is not a JSON object".to_string(),
            });
        };

        match object.get("error") {
            None => {
                return Err(FetchError::EnvelopeViolation {
                    reason: "missing field `error`".to_string(),
                });
            }
            Some(Value::Number(_)) => {}
            Some(other) => {
                return Err(FetchError::EnvelopeViolation {
                    reason: format!("field `error` must be numeric, found {other}"),
                });
            }
        }

        serde_json::from_value(value).map_err(|e| FetchError::EnvelopeViolation {
            reason: e.to_string(),
        })
    }

    /// Decode an envelope from a response body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::EnvelopeViolation`] when the body is not JSON or
    /// not a valid envelope.
    pub fn from_body(body: &str) -> Result<Self, FetchError> {
        let value = serde_json::from_str(body).map_err(|e| FetchError::EnvelopeViolation {
            reason: format!("response is not JSON: {e}"),
        })?;
        Self::from_value(value)
    }

    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        self.error == 0
    }

    /// Number of entries in the payload, with the loose notion of size the
    /// envelope protocol uses: object keys, array items or string length.
    pub fn payload_size(&self) -> usize {
        json_size(&self.payload)
    }
}

pub(crate) fn json_size(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(selector)) if selector.is_empty() => Vec::new(),
        Some(OneOrMany::One(selector)) => vec![selector],
        Some(OneOrMany::Many(selectors)) => selectors,
        None => Vec::new(),
    })
}
