//! Integration test suite for common-tpl
//!
//! End-to-end tests of the template pipeline through the public API: a
//! headless [`Document`] as the page, a scripted [`MockTransport`] as the
//! server and a real storage backend.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **tpl_pipeline**: resolution tiers, batching, prefetch and error recovery
//! - **storage_failure**: behaviour with a broken or full durable store
//! - **persistence**: templates surviving a reload through the file store
//! - **ajax_post**: the `post` lifecycle and server-directed renders
//! - **page_helpers**: locale pricing, visibility toggles and form data on a page

use common_tpl::common::Common;
use common_tpl::config::TplConfig;
use common_tpl::dom::Document;
use common_tpl::storage::KeyValueStore;
use common_tpl::test_utils::{MockTransport, init_test_logging, page_with_csp};
use serde_json::Value;
use std::sync::Arc;

mod ajax_post;
mod page_helpers;
mod persistence;
mod storage_failure;
mod tpl_pipeline;

/// One page wired to a scripted server.
pub struct Harness {
    pub document: Arc<Document>,
    pub transport: Arc<MockTransport>,
    pub common: Common,
}

impl Harness {
    /// A page carrying `csp` data and one empty node per `#id` or `.class`
    /// selector in `targets`.
    pub fn new(csp: Value, targets: &[&str], store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        Self::with_transport(csp, targets, store, Arc::new(MockTransport::new()))
    }

    pub fn with_transport(
        csp: Value,
        targets: &[&str],
        store: Arc<dyn KeyValueStore>,
        transport: Arc<MockTransport>,
    ) -> anyhow::Result<Self> {
        init_test_logging(None);

        let mut document = page_with_csp(csp);
        for target in targets {
            document = match (target.strip_prefix('#'), target.strip_prefix('.')) {
                (Some(id), _) => document.with_element(Some(id), &[]),
                (_, Some(class)) => document.with_element(None, &[class]),
                _ => document,
            };
        }
        let document = Arc::new(document);

        let common = Common::builder(TplConfig::default())
            .dom(document.clone())
            .transport(transport.clone())
            .store(store)
            .build()?;

        Ok(Self {
            document,
            transport,
            common,
        })
    }

    /// Content of the first node matching `selector`.
    pub fn html(&self, selector: &str) -> String {
        self.document.inner_html(selector).unwrap_or_default()
    }

    /// Template parameters sent by the `n`th request.
    pub fn requested_keys(&self, n: usize) -> Vec<String> {
        self.transport
            .requests()
            .get(n)
            .map(|request| {
                request.params.iter().filter(|(name, _)| name == "tpl[]").map(|(_, value)| value.clone()).collect()
            })
            .unwrap_or_default()
    }
}
