//! Template compile and render errors.

use thiserror::Error;

/// Errors raised while compiling or rendering a micro-template.
///
/// These never escape the pipeline: the compiler and renderer report them as
/// values, and the orchestrator logs them (in developer mode) and skips the
/// affected key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A tag was opened but never closed
    #[error("Unterminated '{tag}' tag starting at byte {offset}")]
    Unterminated {
        /// Opening delimiter
        tag: String,
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// A tag with nothing inside it
    #[error("Empty '{tag}' tag at byte {offset}")]
    EmptyExpression {
        /// Opening delimiter
        tag: String,
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// The template engine rejected the translated source
    #[error("Template syntax error in '{key}': {message}")]
    Syntax {
        /// Template key being compiled
        key: String,
        /// Cleaned-up engine message
        message: String,
    },

    /// Applying data to a compiled template failed
    #[error("Template render error in '{key}': {message}")]
    Render {
        /// Template key being rendered
        key: String,
        /// Cleaned-up engine message
        message: String,
    },
}

/// Flatten a Tera error chain into one readable message.
///
/// Tera wraps the useful part ("Variable `title` not found") several layers
/// deep behind generic "Failed to render" messages; those wrappers are
/// dropped.
pub(crate) fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        let generic = message.starts_with("Failed to render") || message.starts_with("Failed to parse");
        if !generic && !message.trim().is_empty() {
            messages.push(message.trim().to_string());
        }
        current = err.source();
    }

    if messages.is_empty() {
        error.to_string()
    } else {
        messages.join(": ")
    }
}
