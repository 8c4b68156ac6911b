//! AJAX layer with a fixed response envelope.
//!
//! Everything that talks to the server goes through here:
//!
//! - [`Envelope`] - the decoded `{error, feedback, payload, target, tpl}` shape
//! - [`Transport`] - the network port, with [`HttpTransport`] over `reqwest`
//! - [`AjaxClient`] - memoized requests plus the `post` lifecycle
//!   (before/after hooks, `limbo`/`valid`/`invalid`/`cleanup`/`error`
//!   callbacks and automatic target injection)
//! - [`ResponseBuilder`] - the server half, producing envelopes and cache headers
//!
//! # Failure model
//!
//! A request fails with a [`FetchError`]: transport errors, timeouts, non-2xx
//! statuses and envelope violations (including a missing `error` field) are all
//! failures. `FetchError` is `Clone` because one in-flight request may be
//! awaited by several callers.

mod client;
mod envelope;
mod response;
mod transport;

pub use client::{AfterPostHook, AjaxClient, BeforePostHook, EnvelopeResult, PostCallbacks};
pub use envelope::{Envelope, Feedback, Target};
pub use response::ResponseBuilder;
pub use transport::{AjaxRequest, HttpTransport, Method, RequestKey, Transport, TransportResponse, generate_hash};

use serde_json::Value;
use thiserror::Error;

/// Failures of an envelope request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The server answered with a non-2xx status
    #[error("Server responded with HTTP {status}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, when it was JSON
        body: Option<Value>,
    },

    /// The response was not a valid envelope
    #[error("Malformed response envelope: {reason}")]
    EnvelopeViolation {
        /// What was wrong with it
        reason: String,
    },

    /// The request exceeded its time budget
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// The envelope arrived but its `error` code reports a failure
    #[error("Server reported error {code}")]
    Reported {
        /// Non-zero `error` code of the envelope
        code: i64,
        /// Feedback message, when it was a string
        message: Option<String>,
    },

    /// A successful template response lacked a requested key
    #[error("Server returned no template for '{key}'")]
    MissingTemplate {
        /// The requested template key
        key: String,
    },
}

impl FetchError {
    /// Envelope carried by an error response, if its body was one.
    pub fn response_envelope(&self) -> Option<Envelope> {
        match self {
            Self::Http {
                body: Some(body),
                ..
            } => Envelope::from_value(body.clone()).ok(),
            _ => None,
        }
    }

    /// `payload` of an error response body, if present.
    pub fn response_payload(&self) -> Option<&Value> {
        match self {
            Self::Http {
                body: Some(body),
                ..
            } => body.get("payload"),
            _ => None,
        }
    }
}
