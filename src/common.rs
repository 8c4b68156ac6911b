//! Application shell wiring the pipeline together.
//!
//! [`Common`] owns one instance of every component for one page: the
//! document, the CSP data read from it, the memoized AJAX client and the
//! template service. Components not supplied to the [`CommonBuilder`] are
//! created from the [`TplConfig`].

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::ajax::{AjaxClient, AjaxRequest, EnvelopeResult, HttpTransport, PostCallbacks, Transport};
use crate::config::TplConfig;
use crate::csp::{CspData, CspStore};
use crate::dom::{Document, Dom};
use crate::format::Accounting;
use crate::storage::{FileStore, KeyValueStore, MemoryStore, SafeStore};
use crate::templating::{
    Diagnostics, IntoTemplateKeys, LocalTemplateStore, MemoryTemplateCache, TemplateCompiler, TemplateData,
    TemplateFetcher, TemplateRenderer, TemplateService, TplOptions, TplOutcome,
};

/// Builder for [`Common`].
pub struct CommonBuilder {
    config: TplConfig,
    dom: Option<Arc<dyn Dom>>,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl CommonBuilder {
    /// Use `dom` as the page; defaults to an empty [`Document`].
    #[must_use]
    pub fn dom(mut self, dom: Arc<dyn Dom>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Send requests through `transport`; defaults to an [`HttpTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persist templates in `store`; defaults to the configured file store,
    /// or memory when no store file is configured.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the HTTP client
    /// cannot be created or the configured store file cannot be opened.
    pub fn build(self) -> Result<Common> {
        let config = self.config;
        config.validate()?;

        let dom = self.dom.unwrap_or_else(|| Arc::new(Document::new()));

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.base_url, config.timeout())?),
        };

        let backend: Arc<dyn KeyValueStore> = match (self.store, config.resolved_store_path()?) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(
                FileStore::open(&path, config.store_quota_bytes)
                    .with_context(|| format!("Failed to open template store {}", path.display()))?,
            ),
            (None, None) => Arc::new(match config.store_quota_bytes {
                Some(quota) => MemoryStore::with_quota(quota),
                None => MemoryStore::new(),
            }),
        };

        let csp = Arc::new(CspStore::new(dom.clone(), config.csp_selector.clone()));
        let diagnostics = Diagnostics::from_csp(csp.clone(), config.is_debug());

        let compiler = TemplateCompiler::new(Arc::new(MemoryTemplateCache::new()), diagnostics.clone());
        let local = Arc::new(LocalTemplateStore::new(Arc::new(SafeStore::new(backend)), compiler, csp.clone()));
        let renderer = Arc::new(TemplateRenderer::new(dom.clone(), diagnostics));
        let client = Arc::new(AjaxClient::new(transport).with_dom(dom.clone()));

        let fetcher = TemplateFetcher::new(client.clone(), local.clone(), renderer.clone())
            .endpoint(config.endpoint.clone())
            .method(config.method)
            .param(config.param.clone());

        tracing::debug!("Template pipeline ready ({} {})", config.method, config.endpoint);

        Ok(Common {
            config,
            dom,
            csp,
            client,
            templates: TemplateService::new(local, renderer, fetcher),
        })
    }
}

/// One page's template pipeline and AJAX client.
pub struct Common {
    config: TplConfig,
    dom: Arc<dyn Dom>,
    csp: Arc<CspStore>,
    client: Arc<AjaxClient>,
    templates: TemplateService,
}

impl std::fmt::Debug for Common {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Common")
            .field("config", &self.config)
            .field("csp", &self.csp)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Common {
    /// Start building a pipeline from `config`.
    pub fn builder(config: TplConfig) -> CommonBuilder {
        CommonBuilder {
            config,
            dom: None,
            transport: None,
            store: None,
        }
    }

    /// Render templates into the nodes their keys select.
    ///
    /// See [`TemplateService::tpl`].
    pub async fn tpl(&self, keys: impl IntoTemplateKeys, data: TemplateData, options: TplOptions) -> TplOutcome {
        self.templates.tpl(keys, data, options).await
    }

    /// Send a request through the `post` lifecycle, then render every
    /// template the response lists in `tpl` with the response payload.
    ///
    /// See [`AjaxClient::post`].
    pub async fn post(&self, request: AjaxRequest, callbacks: PostCallbacks) -> EnvelopeResult {
        let result = self.client.post(request, callbacks).await;

        if let Ok(envelope) = &result
            && !envelope.tpl.is_empty()
        {
            let outcome = self
                .templates
                .tpl(envelope.tpl.clone(), TemplateData::json(envelope.payload.clone()), TplOptions::default())
                .await;
            tracing::debug!("Server-directed render refreshed {} template(s)", outcome.rendered.len());
        }

        result
    }

    /// The page's CSP data.
    pub fn csp(&self) -> &CspData {
        self.csp.data()
    }

    /// Price formatting for the page locale.
    pub fn accounting(&self) -> Accounting {
        Accounting::for_locale(self.csp().locale())
    }

    /// The AJAX client.
    pub fn client(&self) -> &AjaxClient {
        &self.client
    }

    /// The template service.
    pub fn templates(&self) -> &TemplateService {
        &self.templates
    }

    /// The page.
    pub fn dom(&self) -> &Arc<dyn Dom> {
        &self.dom
    }

    /// The configuration the pipeline was built from.
    pub fn config(&self) -> &TplConfig {
        &self.config
    }
}
