use common_tpl::storage::{KeyValueStore, MemoryStore};
use common_tpl::templating::{TemplateData, TplOptions};
use common_tpl::test_utils::{FailingStore, TemplateFixture};
use serde_json::json;
use std::sync::Arc;

use super::Harness;

#[tokio::test]
async fn test_disabled_storage_runs_memory_only() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
    let store = Arc::new(FailingStore::new());
    let harness = Harness::new(fixture.csp_data(), &["#promo-banner"], store.clone())?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "Sale" })), TplOptions::default())
        .await;
    assert!(outcome.all_rendered());
    assert_eq!(harness.html("#promo-banner"), "<h1>Sale</h1>");

    let outcome = harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "Clearance" })), TplOptions::default())
        .await;
    assert_eq!(outcome.requests, 0);
    assert_eq!(harness.html("#promo-banner"), "<h1>Clearance</h1>");

    // Only the availability probe ever reached the backend.
    assert_eq!(store.calls(), 1);
    assert!(harness.common.templates().local().entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_disabled_storage_refetches_after_reload() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
    let store = Arc::new(FailingStore::new());

    for visit in 0..2 {
        let harness = Harness::new(fixture.csp_data(), &["#promo-banner"], store.clone())?;
        harness.transport.push_envelope(fixture.envelope());

        let outcome = harness
            .common
            .tpl("#promo-banner", TemplateData::json(json!({ "title": visit })), TplOptions::default())
            .await;

        assert_eq!(outcome.requests, 1);
        assert_eq!(harness.html("#promo-banner"), format!("<h1>{visit}</h1>"));
    }
    Ok(())
}

#[tokio::test]
async fn test_full_storage_keeps_template_in_memory() -> anyhow::Result<()> {
    let body = format!("<section>{{{{ title }}}}{}</section>", "x".repeat(200));
    let fixture = TemplateFixture::new().template("#big", &body);
    let store = Arc::new(MemoryStore::with_quota(200));
    let harness = Harness::new(fixture.csp_data(), &["#big"], store.clone())?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl("#big", TemplateData::json(json!({ "title": "T" })), TplOptions::default()).await;

    assert!(outcome.all_rendered());
    assert!(harness.html("#big").starts_with("<section>Txx"));
    // The content did not fit, so the mapping written before it is gone too.
    assert_eq!(store.get("common-tpl-mapping:#big")?, None);
    assert!(store.keys()?.iter().all(|key| !key.starts_with("common-tpl-hash:")));

    let outcome = harness.common.tpl("#big", TemplateData::json(json!({ "title": "U" })), TplOptions::default()).await;
    assert_eq!(outcome.requests, 0);
    assert!(harness.html("#big").starts_with("<section>Uxx"));
    assert_eq!(harness.transport.request_count(), 1);
    Ok(())
}
