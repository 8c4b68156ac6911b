//! Network retrieval of templates missing from local storage.

use serde_json::Value;
use std::sync::Arc;

use super::local::LocalTemplateStore;
use super::raw::RawTemplate;
use super::renderer::TemplateRenderer;
use super::service::{TemplateData, TplOptions, TplOutcome, deliver};
use super::TemplateKey;
use crate::ajax::{AjaxClient, AjaxRequest, FetchError, Method};
use crate::constants::{DEFAULT_TEMPLATE_ENDPOINT, DEFAULT_TEMPLATE_PARAM};

/// Fetches templates in one batched request and hands them to the renderer.
///
/// The request carries every missing key as `<param>[]`, sorted, so two
/// calls asking for the same set share one memoized response. The response
/// payload maps each key (or its block name) to a [`RawTemplate`].
#[derive(Debug, Clone)]
pub struct TemplateFetcher {
    client: Arc<AjaxClient>,
    local: Arc<LocalTemplateStore>,
    renderer: Arc<TemplateRenderer>,
    endpoint: String,
    method: Method,
    param: String,
}

impl TemplateFetcher {
    /// Create a fetcher using the default endpoint, method and parameter.
    pub fn new(client: Arc<AjaxClient>, local: Arc<LocalTemplateStore>, renderer: Arc<TemplateRenderer>) -> Self {
        Self {
            client,
            local,
            renderer,
            endpoint: DEFAULT_TEMPLATE_ENDPOINT.to_string(),
            method: Method::default(),
            param: DEFAULT_TEMPLATE_PARAM.to_string(),
        }
    }

    /// Use another endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Use another HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Use another request parameter name.
    #[must_use]
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// The request that would fetch `keys`.
    pub fn request_for(&self, keys: &[TemplateKey]) -> AjaxRequest {
        let mut sorted: Vec<&str> = keys.iter().map(TemplateKey::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        AjaxRequest::new(&self.endpoint, self.method).list_param(&self.param, sorted)
    }

    /// Fetch `keys`, compile and persist each template, then render it.
    ///
    /// Nothing is sent when `keys` is empty. A failed request, or an envelope
    /// whose `error` is not `0`, leaves every key unresolved and caches
    /// nothing, so the next call asks again.
    pub async fn fetch(&self, keys: &[TemplateKey], data: &TemplateData, options: &TplOptions) -> TplOutcome {
        let mut outcome = TplOutcome::default();
        if keys.is_empty() {
            return outcome;
        }

        let request = self.request_for(keys);
        outcome.requests = 1;

        let envelope = match self.client.request(request.clone()).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Template request failed: {}", e);
                outcome.unresolved.extend(keys.iter().cloned());
                outcome.fetch_error = Some(e);
                return outcome;
            }
        };

        if !envelope.is_success() {
            tracing::debug!("Template endpoint reported error {}", envelope.error);
            self.client.forget(&request);
            outcome.unresolved.extend(keys.iter().cloned());
            outcome.fetch_error = Some(FetchError::Reported {
                code: envelope.error,
                message: envelope.feedback.message().map(str::to_string),
            });
            return outcome;
        }

        for key in keys {
            let Some(raw) = lookup(&envelope.payload, key) else {
                match closest_key(&envelope.payload, key) {
                    Some(suggestion) => {
                        tracing::debug!("Response has no template for {} (did you mean {}?)", key, suggestion);
                    }
                    None => tracing::debug!("Response has no template for {}", key),
                }
                outcome.unresolved.push(key.clone());
                outcome.fetch_error.get_or_insert_with(|| FetchError::MissingTemplate {
                    key: key.to_string(),
                });
                continue;
            };

            let compiled = match self.local.compiler().compile(key, &raw.content, &raw.checksum) {
                Ok(compiled) => compiled,
                Err(_) => {
                    outcome.failed.push(key.clone());
                    continue;
                }
            };

            if let Err(e) = self.local.store_local(key, &raw.checksum, &raw.content) {
                tracing::debug!("Keeping {} in memory only: {}", key, e);
            }
            outcome.fetched.push(key.clone());
            outcome.record(key, deliver(&self.local, &self.renderer, key, &compiled, data, options));
        }

        if !outcome.unresolved.is_empty() {
            self.client.forget(&request);
        }

        outcome
    }
}

fn lookup(payload: &Value, key: &TemplateKey) -> Option<RawTemplate> {
    let entry = payload
        .get(key.as_str())
        .or_else(|| payload.get(key.block_name().as_str()))?;
    match serde_json::from_value(entry.clone()) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::debug!("Malformed template entry for {}: {}", key, e);
            None
        }
    }
}

fn closest_key<'a>(payload: &'a Value, key: &TemplateKey) -> Option<&'a str> {
    let block_name = key.block_name();
    payload
        .as_object()?
        .keys()
        .map(|candidate| (candidate, strsim::levenshtein(&block_name, candidate)))
        .filter(|(candidate, distance)| *distance <= candidate.len().max(block_name.len()) / 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.as_str())
}
