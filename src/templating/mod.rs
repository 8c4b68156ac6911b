//! Client-side template fetching, caching and rendering.
//!
//! This module turns a template key (a CSS selector such as `#promo-banner`)
//! into HTML injected into every node the key selects. Templates are fetched
//! from the server at most once per checksum, persisted in durable storage and
//! compiled at most once per process.
//!
//! # Overview
//!
//! A `tpl` call resolves each key through three tiers:
//!
//! 1. the in-process [`MemoryTemplateCache`] of compiled templates
//! 2. durable storage, trusted only while its checksum equals the page's
//!    [`ChecksumManifest`] entry for the key's block name
//! 3. the network, one batched request for every key still missing
//!
//! Locally resolved keys are rendered first; fetched keys follow once the
//! batch response arrives.
//!
//! # Template Syntax
//!
//! - Interpolation: `{{ product.name }}`
//! - Escaped interpolation: `{{- review.text }}`
//! - Statements: `{{% if in_stock %}}...{{% else %}}...{{% endif %}}`,
//!   `{{% for item in items %}}...{{% endfor %}}`
//!
//! Expressions follow Tera syntax, so filters such as `{{ price | round }}`
//! are available. See [`translate`].
//!
//! # Data
//!
//! - [`TemplateData::Json`] renders the template with that data and stores it
//!   for the key.
//! - [`TemplateData::Html`] is injected as-is; no template is involved.
//! - [`TemplateData::None`] renders with the stored data, when there is any
//!   and [`TplOptions::allow_prefetch_render`] is set. This warms caches
//!   without rendering when nothing is stored.
//!
//! # Errors
//!
//! `tpl` never fails as a whole. Compile and render failures are collected in
//! the [`TplOutcome`] and, in developer mode, logged as warnings (see
//! [`Diagnostics`]). Storage failures degrade to memory-only caching.

mod cache;
mod compiler;
mod diagnostics;
mod error;
mod fetcher;
mod key;
mod local;
mod manifest;
mod raw;
mod renderer;
mod service;

pub use cache::MemoryTemplateCache;
pub use compiler::{CompiledTemplate, TemplateCompiler, translate};
pub use diagnostics::Diagnostics;
pub use error::TemplateError;
pub use fetcher::TemplateFetcher;
pub use key::{IntoTemplateKeys, TemplateKey};
pub use local::{LocalTemplateStore, StoredTemplate};
pub use manifest::ChecksumManifest;
pub use raw::{RawTemplate, checksum};
pub use renderer::{RenderOutcome, TemplateRenderer};
pub use service::{TemplateData, TemplateService, TplOptions, TplOutcome};
