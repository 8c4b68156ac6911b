//! Error handling for common-tpl
//!
//! The hot path (cache lookups, fetches, renders) never raises: it returns
//! explicit `Option`/`Result`/outcome values that the orchestrator folds into
//! "treat as cache miss" or "skip injection". The types here serve the edges of
//! the crate instead: configuration loading, store opening and the CLI.
//!
//! # Architecture
//!
//! - [`TplError`] - Enumerated error types for every application-edge failure
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! Module-level errors ([`StorageError`], [`TemplateError`], [`FetchError`]) convert
//! into [`TplError`] so they can be surfaced by the CLI with context.
//!
//! # Examples
//!
//! ```rust,no_run
//! use common_tpl::core::{TplError, user_friendly_error};
//!
//! let error = anyhow::Error::from(TplError::ConfigError {
//!     message: "unknown method 'put'".to_string(),
//! });
//! user_friendly_error(error).display();
//! ```
//!
//! [`StorageError`]: crate::storage::StorageError
//! [`TemplateError`]: crate::templating::TemplateError
//! [`FetchError`]: crate::ajax::FetchError

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::ajax::FetchError;
use crate::storage::StorageError;
use crate::templating::TemplateError;

/// The main error type for common-tpl application-edge operations.
#[derive(Error, Debug, Clone)]
pub enum TplError {
    /// Configuration file is missing required values or has invalid ones
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration file syntax in {file}")]
    ConfigParseError {
        /// Path of the configuration file
        file: String,
        /// Parser message
        reason: String,
    },

    /// A template key was blank or otherwise unusable
    #[error("Invalid template key: '{key}'")]
    InvalidTemplateKey {
        /// The rejected key
        key: String,
    },

    /// A CSP data node could not be decoded
    #[error("Cannot decode CSP data: {reason}")]
    CspDecodeError {
        /// Why decoding failed
        reason: String,
    },

    /// Render data supplied on the command line was not valid JSON
    #[error("Invalid render data: {reason}")]
    InvalidRenderData {
        /// Parser message
        reason: String,
    },

    /// Durable storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Template compile or render failure
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Network or envelope failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Generic error with a message
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information
///
/// Pairs a [`TplError`] with optional details (why it happened) and a
/// suggestion (what to do about it). The CLI prints these with colors.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: TplError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: TplError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known error types get tailored details and suggestions; anything else is
/// wrapped as [`TplError::Other`] with the full `anyhow` chain as its message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(context) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: context.error.clone(),
            suggestion: context.suggestion.clone(),
            details: context.details.clone(),
        };
    }

    if let Some(tpl_error) = error.downcast_ref::<TplError>() {
        return create_error_context(tpl_error.clone());
    }

    if let Some(fetch_error) = error.downcast_ref::<FetchError>() {
        return create_error_context(TplError::Fetch(fetch_error.clone()));
    }

    if let Some(storage_error) = error.downcast_ref::<StorageError>() {
        return create_error_context(TplError::Storage(storage_error.clone()));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(TplError::ConfigParseError {
            file: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file");
    }

    ErrorContext::new(TplError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: TplError) -> ErrorContext {
    match &error {
        TplError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Review ~/.common-tpl/config.toml or pass --config <path>"),
        TplError::ConfigParseError {
            reason,
            ..
        } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Check the TOML syntax of the configuration file")
        }
        TplError::InvalidTemplateKey {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Template keys are CSS selectors such as '#promo-banner' or '.cart'"),
        TplError::CspDecodeError {
            ..
        } => ErrorContext::new(error).with_details(
            "CSP nodes must hold URL-encoded JSON objects, as produced by `common-tpl csp encode`",
        ),
        TplError::InvalidRenderData {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass a JSON object with --data, or raw HTML with --html"),
        TplError::Storage(StorageError::QuotaExceeded {
            ..
        }) => ErrorContext::new(error)
            .with_suggestion("Raise store_quota_bytes in the configuration or remove the store file"),
        TplError::Storage(_) => ErrorContext::new(error)
            .with_details("Template storage is best-effort; rendering falls back to the network"),
        TplError::Fetch(FetchError::EnvelopeViolation {
            ..
        }) => ErrorContext::new(error).with_details(
            "Responses must be JSON objects with a numeric `error` field and a `payload`",
        ),
        TplError::Fetch(_) => ErrorContext::new(error)
            .with_suggestion("Check base_url and endpoint in the configuration and that the server is reachable"),
        TplError::Template(_) => ErrorContext::new(error)
            .with_suggestion("Run with --verbose to see the template source position"),
        TplError::Other {
            ..
        } => ErrorContext::new(error),
    }
}
