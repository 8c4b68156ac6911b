use common_tpl::storage::{FileStore, KeyValueStore};
use common_tpl::templating::{TemplateData, TplOptions};
use common_tpl::test_utils::TemplateFixture;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use super::Harness;

fn open(path: &Path) -> anyhow::Result<Arc<FileStore>> {
    Ok(Arc::new(FileStore::open(path, None)?))
}

#[tokio::test]
async fn test_templates_survive_a_reload() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("store.json");
    let fixture = TemplateFixture::new()
        .template("#promo-banner", "<h1>{{ title }}</h1>")
        .template(".cart-summary", "<p>{{ count }} item(s)</p>");
    let data = || TemplateData::json(json!({ "title": "Sale", "count": 2 }));

    {
        let harness = Harness::new(fixture.csp_data(), &["#promo-banner", ".cart-summary"], open(&path)?)?;
        harness.transport.push_envelope(fixture.envelope());
        let outcome = harness.common.tpl(["#promo-banner", ".cart-summary"], data(), TplOptions::default()).await;
        assert_eq!(outcome.fetched.len(), 2);
    }
    assert!(path.exists());

    // A second page over the same file needs no network at all.
    let harness = Harness::new(fixture.csp_data(), &["#promo-banner", ".cart-summary"], open(&path)?)?;
    let outcome = harness.common.tpl(["#promo-banner", ".cart-summary"], data(), TplOptions::default()).await;

    assert_eq!(outcome.local.len(), 2);
    assert_eq!(harness.transport.request_count(), 0);
    assert_eq!(harness.html("#promo-banner"), "<h1>Sale</h1>");
    assert_eq!(harness.html(".cart-summary"), "<p>2 item(s)</p>");

    let entries = harness.common.templates().local().entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.content_bytes.is_some() && entry.has_data));
    Ok(())
}

#[tokio::test]
async fn test_prefetch_data_survives_a_reload() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("store.json");
    let fixture = TemplateFixture::new().template("#greeting", "<p>Hello {{ name }}</p>");

    {
        let harness = Harness::new(fixture.csp_data(), &["#greeting"], open(&path)?)?;
        harness.transport.push_envelope(fixture.envelope());
        harness.common.tpl("#greeting", TemplateData::json(json!({ "name": "Ada" })), TplOptions::default()).await;
    }

    let harness = Harness::new(fixture.csp_data(), &["#greeting"], open(&path)?)?;
    harness.common.tpl("#greeting", TemplateData::None, TplOptions::default()).await;

    assert_eq!(harness.html("#greeting"), "<p>Hello Ada</p>");
    assert_eq!(harness.transport.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_new_release_invalidates_stored_templates() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("store.json");
    let before = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
    let after = TemplateFixture::new().template("#promo-banner", "<h2>{{ title }}</h2>");

    {
        let harness = Harness::new(before.csp_data(), &["#promo-banner"], open(&path)?)?;
        harness.transport.push_envelope(before.envelope());
        harness.common.tpl("#promo-banner", TemplateData::json(json!({ "title": "A" })), TplOptions::default()).await;
    }

    let store = open(&path)?;
    let harness = Harness::new(after.csp_data(), &["#promo-banner"], store.clone())?;
    harness.transport.push_envelope(after.envelope());
    harness.common.tpl("#promo-banner", TemplateData::json(json!({ "title": "B" })), TplOptions::default()).await;

    let old = before.checksum("#promo-banner").unwrap_or_default();
    let new = after.checksum("#promo-banner").unwrap_or_default();
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(harness.html("#promo-banner"), "<h2>B</h2>");
    assert_eq!(store.get(&format!("common-tpl-hash:{old}"))?, None);
    assert_eq!(store.get("common-tpl-mapping:#promo-banner")?, Some(new));

    // The rewrite reached the file as well.
    let reopened = open(&path)?;
    assert_eq!(reopened.get(&format!("common-tpl-hash:{old}"))?, None);
    Ok(())
}
