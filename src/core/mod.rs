//! Core error types and user-facing error formatting.
//!
//! The rest of the crate keeps its failures local and explicit; this module
//! collects them into [`TplError`] when they have to be reported to a person.

pub mod error;

pub use error::{ErrorContext, TplError, user_friendly_error};
