//! common-tpl - checksum-validated template fetching and caching
//!
//! A client-side template subsystem that fetches HTML micro-templates from a
//! server endpoint, compiles them, persists them in a durable key-value store
//! keyed by content checksum, and invalidates them against a server-supplied
//! checksum manifest. It sits on top of a small AJAX layer that enforces a
//! fixed JSON response envelope, and a CSP-safe data bridge that carries
//! server state inside hidden DOM nodes instead of inline scripts.
//!
//! # Architecture Overview
//!
//! ```text
//!  tpl(keys, data)
//!       │
//!       ▼
//!  TemplateService ──► LocalTemplateStore ──► MemoryTemplateCache
//!       │                     │                      ▲
//!       │                     ▼                      │
//!       │                 SafeStore (durable KV)  TemplateCompiler (tera)
//!       ▼
//!  TemplateFetcher ──► AjaxClient (memoized) ──► Transport (reqwest)
//!       │
//!       ▼
//!  TemplateRenderer ──► Dom port (headless Document or a real page)
//! ```
//!
//! # Core Modules
//!
//! - [`templating`] - the template-fetch-and-cache pipeline and its `tpl` entry point
//! - [`ajax`] - envelope types, memoized requests and the `post` lifecycle
//! - [`storage`] - best-effort durable key-value storage
//! - [`csp`] - the CSP data bridge (server encoder and client reader)
//! - [`dom`] - the DOM port used for injection and events
//!
//! ## Supporting Modules
//! - [`common`] - application shell wiring every component together
//! - [`config`] - TOML configuration file
//! - [`core`] - error types and user-facing error formatting
//! - [`format`] - locale-aware price and number formatting
//! - [`validate`] - form validation helpers
//! - [`utils`] - file system and URL fragment helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use common_tpl::common::Common;
//! use common_tpl::config::TplConfig;
//! use common_tpl::dom::Document;
//! use common_tpl::templating::{TemplateData, TplOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let document = Arc::new(Document::new().with_element(Some("promo-banner"), &[]));
//! let common = Common::builder(TplConfig::default()).dom(document.clone()).build()?;
//!
//! common
//!     .tpl("#promo-banner", TemplateData::json(json!({ "title": "Sale" })), TplOptions::default())
//!     .await;
//! println!("{:?}", document.inner_html("#promo-banner"));
//! # Ok(())
//! # }
//! ```

pub mod ajax;
pub mod cli;
pub mod common;
pub mod config;
pub mod constants;
pub mod core;
pub mod csp;
pub mod dom;
pub mod format;
pub mod storage;
pub mod templating;
pub mod utils;
pub mod validate;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
