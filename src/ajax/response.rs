//! Server half of the envelope protocol.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use super::envelope::{Envelope, Feedback, Target, json_size};
use crate::constants::{FEEDBACK_FAILURE_MESSAGE, FEEDBACK_SUCCESS_MESSAGE};

/// Fluent builder for envelope responses.
///
/// Unset fields get protocol defaults at [`ResponseBuilder::build`] time: the
/// error code is `0` for a non-empty payload and `1` otherwise, and the
/// feedback message says whether data was retrieved. Debug feedback is only
/// emitted in developer mode.
///
/// # Examples
///
/// ```rust
/// use common_tpl::ajax::ResponseBuilder;
/// use serde_json::json;
///
/// let envelope = ResponseBuilder::new().payload(json!({ "qty": 3 })).build();
/// assert_eq!(envelope.error, 0);
/// assert_eq!(envelope.feedback.message(), Some("Data retrieved successfully!"));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    payload: Value,
    feedback_message: String,
    error: Option<i64>,
    tpl: Vec<String>,
    debug: Vec<Value>,
    target: Target,
    http_code: u16,
    cache_time_secs: u64,
    developer_mode: bool,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            payload: Value::Null,
            feedback_message: String::new(),
            error: None,
            tpl: Vec::new(),
            debug: Vec::new(),
            target: Target::default(),
            http_code: 200,
            cache_time_secs: 0,
            developer_mode: false,
        }
    }
}

impl ResponseBuilder {
    /// Start an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload.
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the feedback message.
    #[must_use]
    pub fn feedback_message(mut self, message: impl Into<String>) -> Self {
        self.feedback_message = message.into();
        self
    }

    /// Set an explicit error code.
    #[must_use]
    pub fn error_code(mut self, code: i64) -> Self {
        self.error = Some(code);
        self
    }

    /// Ask the client to re-render a template key with the payload.
    #[must_use]
    pub fn add_tpl(mut self, key: impl Into<String>) -> Self {
        self.tpl.push(key.into());
        self
    }

    /// Withdraw a previously added template key.
    #[must_use]
    pub fn remove_tpl(mut self, key: &str) -> Self {
        if let Some(index) = self.tpl.iter().position(|k| k == key) {
            self.tpl.remove(index);
        }
        self
    }

    /// Attach a debug entry, kept only in developer mode.
    #[must_use]
    pub fn add_debug_feedback(mut self, entry: Value) -> Self {
        self.debug.push(entry);
        self
    }

    /// Name a selector whose payload entry the client should inject.
    #[must_use]
    pub fn target_payload(mut self, selector: impl Into<String>) -> Self {
        self.target.payload.push(selector.into());
        self
    }

    /// Name the selector that should show the feedback message.
    #[must_use]
    pub fn target_feedback(mut self, selector: impl Into<String>) -> Self {
        self.target.feedback = Some(selector.into());
        self
    }

    /// Set the HTTP status code.
    #[must_use]
    pub fn http_code(mut self, code: u16) -> Self {
        self.http_code = code;
        self
    }

    /// Allow shared caches to keep the response for `seconds`.
    #[must_use]
    pub fn cache_time(mut self, seconds: u64) -> Self {
        self.cache_time_secs = seconds;
        self
    }

    /// Whether debug feedback may be emitted.
    #[must_use]
    pub fn developer_mode(mut self, enabled: bool) -> Self {
        self.developer_mode = enabled;
        self
    }

    /// Clear everything back to defaults, keeping developer mode.
    #[must_use]
    pub fn reset(self) -> Self {
        Self {
            developer_mode: self.developer_mode,
            ..Self::default()
        }
    }

    /// The configured HTTP status code.
    pub fn status(&self) -> u16 {
        self.http_code
    }

    /// `Cache-Control` directive for the configured cache time.
    pub fn cache_control(&self) -> String {
        if self.cache_time_secs == 0 {
            "private, no-cache, no-store, no-transform, max-age=0, s-maxage=0".to_string()
        } else {
            format!(
                "public, no-transform, max-age={0}, s-maxage={0}",
                self.cache_time_secs
            )
        }
    }

    /// `Expires` header value relative to `now`.
    pub fn expires(&self, now: DateTime<Utc>) -> String {
        let expires = i64::try_from(self.cache_time_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now);
        expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    /// Every response header, in the order they should be sent.
    pub fn headers(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "application/json".to_string()),
            ("Cache-Control", self.cache_control()),
            ("Expires", self.expires(now)),
            ("Pragma", String::new()),
        ]
    }

    /// Produce the envelope.
    pub fn build(&self) -> Envelope {
        let filled = json_size(&self.payload) > 0;

        let error = self.error.unwrap_or(if filled { 0 } else { 1 });

        let message = if self.feedback_message.is_empty() {
            let message = if filled { FEEDBACK_SUCCESS_MESSAGE } else { FEEDBACK_FAILURE_MESSAGE };
            message.to_string()
        } else {
            self.feedback_message.clone()
        };

        let debug = if self.developer_mode { self.debug.clone() } else { Vec::new() };

        Envelope {
            error,
            feedback: Feedback {
                message: Value::String(message),
                debug: Value::Array(debug),
            },
            payload: self.payload.clone(),
            target: self.target.clone(),
            tpl: self.tpl.clone(),
        }
    }

    /// Produce the serialized response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_defaults_for_empty_payload() {
        let envelope = ResponseBuilder::new().build();
        assert_eq!(envelope.error, 1);
        assert_eq!(envelope.feedback.message(), Some("Data could not be retrieved."));
    }

    #[test]
    fn test_explicit_values_win() {
        let envelope = ResponseBuilder::new()
            .payload(json!({ "a": 1 }))
            .error_code(3)
            .feedback_message("Nope")
            .build();
        assert_eq!(envelope.error, 3);
        assert_eq!(envelope.feedback.message(), Some("Nope"));
    }

    #[test]
    fn test_debug_only_in_developer_mode() {
        let builder = ResponseBuilder::new().payload(json!({ "a": 1 })).add_debug_feedback(json!("sql"));
        assert!(!builder.build().feedback.has_debug());
        assert!(builder.developer_mode(true).build().feedback.has_debug());
    }

    #[test]
    fn test_tpl_keys() {
        let envelope = ResponseBuilder::new()
            .add_tpl("#mini-cart")
            .add_tpl("#header-cart")
            .remove_tpl("#mini-cart")
            .build();
        assert_eq!(envelope.tpl, vec!["#header-cart".to_string()]);
    }

    #[test]
    fn test_cache_headers() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let uncached = ResponseBuilder::new();
        assert_eq!(
            uncached.cache_control(),
            "private, no-cache, no-store, no-transform, max-age=0, s-maxage=0"
        );
        assert_eq!(uncached.expires(now), "Fri, 01 Mar 2024 12:00:00 GMT");

        let cached = ResponseBuilder::new().cache_time(90);
        assert_eq!(cached.cache_control(), "public, no-transform, max-age=90, s-maxage=90");
        assert_eq!(cached.expires(now), "Fri, 01 Mar 2024 12:01:30 GMT");
        assert_eq!(cached.headers(now).len(), 4);
    }

    #[test]
    fn test_reset_keeps_developer_mode() {
        let builder = ResponseBuilder::new()
            .developer_mode(true)
            .payload(json!({ "a": 1 }))
            .http_code(404)
            .reset();
        assert_eq!(builder.status(), 200);
        assert_eq!(builder.build().payload, Value::Null);
        assert!(builder.developer_mode);
    }

    #[test]
    fn test_body_round_trips_as_envelope() -> anyhow::Result<()> {
        let body = ResponseBuilder::new().payload(json!({ "a": 1 })).target_payload("#a").body()?;
        let envelope = Envelope::from_body(&body)?;
        assert_eq!(envelope.target.payload, vec!["#a".to_string()]);
        Ok(())
    }
}
