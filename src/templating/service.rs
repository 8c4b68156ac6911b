//! The `tpl` entry point.

use serde_json::Value;
use std::sync::Arc;

use super::compiler::CompiledTemplate;
use super::fetcher::TemplateFetcher;
use super::local::LocalTemplateStore;
use super::renderer::{RenderOutcome, TemplateRenderer};
use super::{IntoTemplateKeys, TemplateKey};
use crate::ajax::FetchError;

/// Data handed to `tpl`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TemplateData {
    /// No data: render with the last data stored for the key, if allowed.
    #[default]
    None,
    /// Ready-made HTML, injected without any template.
    Html(String),
    /// Template data.
    Json(Value),
}

impl TemplateData {
    /// Wrap a JSON value; a JSON string is treated as ready-made HTML.
    pub fn json(value: Value) -> Self {
        match value {
            Value::String(html) => Self::Html(html),
            other => Self::Json(other),
        }
    }
}

impl From<Value> for TemplateData {
    fn from(value: Value) -> Self {
        Self::json(value)
    }
}

impl From<&str> for TemplateData {
    fn from(html: &str) -> Self {
        Self::Html(html.to_string())
    }
}

impl From<String> for TemplateData {
    fn from(html: String) -> Self {
        Self::Html(html)
    }
}

/// Options of a `tpl` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TplOptions {
    /// Append to target content instead of replacing it
    pub append: bool,
    /// Render with stored data when the call carries none
    pub allow_prefetch_render: bool,
}

impl Default for TplOptions {
    fn default() -> Self {
        Self {
            append: false,
            allow_prefetch_render: true,
        }
    }
}

impl TplOptions {
    /// Set [`TplOptions::append`].
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Set [`TplOptions::allow_prefetch_render`].
    #[must_use]
    pub fn allow_prefetch_render(mut self, allow: bool) -> Self {
        self.allow_prefetch_render = allow;
        self
    }
}

/// What a `tpl` call did, per key.
///
/// `tpl` never fails as a whole: keys that could not be resolved or rendered
/// are listed here, and the first network failure is kept for inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TplOutcome {
    /// Keys resolved from memory or durable storage
    pub local: Vec<TemplateKey>,
    /// Keys compiled from a network response
    pub fetched: Vec<TemplateKey>,
    /// Keys injected into at least one node
    pub rendered: Vec<TemplateKey>,
    /// Keys whose template failed to compile or render
    pub failed: Vec<TemplateKey>,
    /// Keys the network did not provide
    pub unresolved: Vec<TemplateKey>,
    /// Number of template requests issued
    pub requests: usize,
    /// First network failure
    pub fetch_error: Option<FetchError>,
}

impl TplOutcome {
    /// Whether every requested key was rendered.
    pub fn all_rendered(&self) -> bool {
        self.failed.is_empty() && self.unresolved.is_empty()
    }

    pub(crate) fn record(&mut self, key: &TemplateKey, render: Option<RenderOutcome>) {
        match render {
            Some(RenderOutcome::Injected(_)) => self.rendered.push(key.clone()),
            Some(RenderOutcome::Failed(_)) => self.failed.push(key.clone()),
            Some(RenderOutcome::NoTarget) | None => {}
        }
    }

    fn merge(&mut self, other: TplOutcome) {
        self.local.extend(other.local);
        self.fetched.extend(other.fetched);
        self.rendered.extend(other.rendered);
        self.failed.extend(other.failed);
        self.unresolved.extend(other.unresolved);
        self.requests += other.requests;
        if self.fetch_error.is_none() {
            self.fetch_error = other.fetch_error;
        }
    }
}

/// Render one resolved template according to the data it was asked for with.
///
/// Without data, the stored data of the key is used when the options allow;
/// with none stored the template stays compiled but nothing is injected.
/// Data is stored for the next call only once it has been injected.
pub(crate) fn deliver(
    local: &LocalTemplateStore,
    renderer: &TemplateRenderer,
    key: &TemplateKey,
    compiled: &CompiledTemplate,
    data: &TemplateData,
    options: &TplOptions,
) -> Option<RenderOutcome> {
    match data {
        TemplateData::None => {
            if !options.allow_prefetch_render {
                return None;
            }
            let stored = local.load_prefetch_data(key)?;
            Some(renderer.render_compiled(key, compiled, &stored, options))
        }
        TemplateData::Json(value) => {
            let outcome = renderer.render_compiled(key, compiled, value, options);
            if matches!(outcome, RenderOutcome::Injected(_))
                && let Err(e) = local.store_prefetch_data(key, value)
            {
                tracing::debug!("Could not store data for {}: {}", key, e);
            }
            Some(outcome)
        }
        TemplateData::Html(html) => Some(renderer.render_html(key, html, options)),
    }
}

/// Resolves, fetches and renders templates by key.
#[derive(Debug, Clone)]
pub struct TemplateService {
    local: Arc<LocalTemplateStore>,
    renderer: Arc<TemplateRenderer>,
    fetcher: TemplateFetcher,
}

impl TemplateService {
    /// Assemble a service from its parts.
    pub fn new(local: Arc<LocalTemplateStore>, renderer: Arc<TemplateRenderer>, fetcher: TemplateFetcher) -> Self {
        Self {
            local,
            renderer,
            fetcher,
        }
    }

    /// Local template storage.
    pub fn local(&self) -> &LocalTemplateStore {
        &self.local
    }

    /// Render templates into the nodes their keys select.
    ///
    /// - HTML data is injected into every key's targets directly.
    /// - Otherwise each key is resolved locally where possible; the rest are
    ///   requested in a single batch.
    /// - Locally resolved keys are rendered before the batch response is
    ///   awaited.
    /// - Fetched keys are compiled, persisted and rendered as they arrive.
    pub async fn tpl(&self, keys: impl IntoTemplateKeys, data: TemplateData, options: TplOptions) -> TplOutcome {
        let keys = keys.into_template_keys();
        let mut outcome = TplOutcome::default();
        if keys.is_empty() {
            return outcome;
        }

        if let TemplateData::Html(html) = &data {
            for key in &keys {
                outcome.record(key, Some(self.renderer.render_html(key, html, &options)));
            }
            return outcome;
        }

        let mut resolved = Vec::new();
        let mut missing = Vec::new();
        for key in keys {
            match self.local.load_local(&key) {
                Some(compiled) => resolved.push((key, compiled)),
                None => missing.push(key),
            }
        }
        tracing::debug!("Resolved {} template(s) locally, fetching {}", resolved.len(), missing.len());

        for (key, compiled) in &resolved {
            outcome.local.push(key.clone());
            outcome.record(key, deliver(&self.local, &self.renderer, key, compiled, &data, &options));
        }

        outcome.merge(self.fetcher.fetch(&missing, &data, &options).await);
        outcome
    }
}
