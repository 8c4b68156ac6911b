use common_tpl::ajax::FetchError;
use common_tpl::constants::{EVENT_AFTER_TPL_RENDER, TPL_MARKER_CLASS};
use common_tpl::dom::Element;
use common_tpl::storage::{KeyValueStore, MemoryStore};
use common_tpl::templating::{TemplateData, TemplateKey, TplOptions};
use common_tpl::test_utils::{MockTransport, TemplateFixture};
use serde_json::json;
use std::sync::Arc;

use super::Harness;

fn key(k: &str) -> TemplateKey {
    TemplateKey::new(k).unwrap()
}

#[tokio::test]
async fn test_end_to_end_promo_banner() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let harness = Harness::new(json!({ "tplChecksums": { "promo_banner": "abc123" } }), &["#promo-banner"], store.clone())?;
    harness.transport.push_envelope(json!({
        "error": 0,
        "payload": { "#promo-banner": { "content": "<h1>{{title}}</h1>", "checksum": "abc123" } }
    }));
    let mut events = harness.document.subscribe();

    let outcome = harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "Sale" })), TplOptions::default())
        .await;

    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(harness.requested_keys(0), vec!["#promo-banner"]);
    assert_eq!(harness.transport.requests()[0].endpoint, "/common/template");
    assert_eq!(outcome.rendered, vec![key("#promo-banner")]);
    assert_eq!(harness.html("#promo-banner"), "<h1>Sale</h1>");
    assert!(harness.document.classes("#promo-banner").contains(&TPL_MARKER_CLASS.to_string()));
    assert_eq!(store.get("common-tpl-mapping:#promo-banner")?.as_deref(), Some("abc123"));
    assert_eq!(store.get("common-tpl-hash:abc123")?.as_deref(), Some("<h1>{{title}}</h1>"));

    let event = events.try_recv()?;
    assert_eq!(event.name, EVENT_AFTER_TPL_RENDER);
    assert_eq!(event.data["data"], json!({ "title": "Sale" }));

    let outcome = harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "Clearance" })), TplOptions::default())
        .await;

    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(outcome.local, vec![key("#promo-banner")]);
    assert_eq!(harness.html("#promo-banner"), "<h1>Clearance</h1>");
    Ok(())
}

#[tokio::test]
async fn test_only_missing_keys_are_fetched_in_one_batch() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new()
        .template("#k1", "<p>1 {{ v }}</p>")
        .template("#k2", "<p>2 {{ v }}</p>")
        .template("#k3", "<p>3 {{ v }}</p>");
    let harness = Harness::new(fixture.csp_data(), &["#k1", "#k2", "#k3"], Arc::new(MemoryStore::new()))?;

    harness.transport.push_envelope(fixture.envelope());
    harness.common.tpl("#k1", TemplateData::json(json!({ "v": "a" })), TplOptions::default()).await;

    harness.transport.push_envelope(fixture.envelope());
    let outcome = harness
        .common
        .tpl(["#k3", "#k1", "#k2", "#k3"], TemplateData::json(json!({ "v": "b" })), TplOptions::default())
        .await;

    assert_eq!(harness.transport.request_count(), 2);
    assert_eq!(harness.requested_keys(1), vec!["#k2", "#k3"]);
    assert_eq!(outcome.local, vec![key("#k1")]);
    assert_eq!(outcome.fetched, vec![key("#k3"), key("#k2")]);
    assert_eq!(outcome.requests, 1);
    assert!(outcome.all_rendered());
    for (selector, expected) in [("#k1", "<p>1 b</p>"), ("#k2", "<p>2 b</p>"), ("#k3", "<p>3 b</p>")] {
        assert_eq!(harness.html(selector), expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_local_keys_render_before_the_fetch_resolves() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#cached", "<b>{{ n }}</b>").template("#remote", "<i>{{ n }}</i>");
    let store = Arc::new(MemoryStore::new());

    let first_visit = Harness::new(fixture.csp_data(), &["#cached"], store.clone())?;
    first_visit.transport.push_envelope(fixture.envelope());
    first_visit.common.tpl("#cached", TemplateData::json(json!({ "n": 0 })), TplOptions::default()).await;
    assert!(store.get("common-tpl-mapping:#cached")?.is_some());

    let gated = Arc::new(MockTransport::new().gated());
    gated.push_envelope(fixture.envelope());
    let harness = Harness::with_transport(fixture.csp_data(), &["#cached", "#remote"], store, gated.clone())?;

    let (outcome, (cached_first, remote_first)) = tokio::join!(
        harness.common.tpl(["#cached", "#remote"], TemplateData::json(json!({ "n": 1 })), TplOptions::default()),
        async {
            tokio::task::yield_now().await;
            let seen = (harness.html("#cached"), harness.html("#remote"));
            gated.release();
            seen
        }
    );

    assert_eq!(cached_first, "<b>1</b>");
    assert_eq!(remote_first, "");
    assert_eq!(harness.html("#remote"), "<i>1</i>");
    assert_eq!(outcome.local, vec![key("#cached")]);
    assert_eq!(outcome.fetched, vec![key("#remote")]);
    assert_eq!(harness.requested_keys(0), vec!["#remote"]);
    Ok(())
}

#[tokio::test]
async fn test_direct_html_bypasses_templates() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &["#notice", ".notice"], Arc::new(MemoryStore::new()))?;

    let outcome = harness.common.tpl(["#notice", ".notice"], "<b>hi</b>".into(), TplOptions::default()).await;

    assert_eq!(outcome.rendered.len(), 2);
    assert_eq!(harness.html("#notice"), "<b>hi</b>");
    assert_eq!(harness.html(".notice"), "<b>hi</b>");
    assert_eq!(harness.transport.request_count(), 0);
    assert_eq!(harness.common.templates().local().compiler().cache().compile_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_prefetch_without_data_warms_caches_only() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
    let harness = Harness::new(fixture.csp_data(), &["#promo-banner"], Arc::new(MemoryStore::new()))?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl("#promo-banner", TemplateData::None, TplOptions::default()).await;
    assert_eq!(outcome.fetched, vec![key("#promo-banner")]);
    assert!(outcome.rendered.is_empty());
    assert_eq!(harness.html("#promo-banner"), "");

    harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "A" })), TplOptions::default())
        .await;
    assert_eq!(harness.html("#promo-banner"), "<h1>A</h1>");

    let append = TplOptions::default().append(true);
    harness.common.tpl("#promo-banner", TemplateData::None, append).await;
    assert_eq!(harness.html("#promo-banner"), "<h1>A</h1><h1>A</h1>");

    harness.common.tpl("#promo-banner", TemplateData::None, append.allow_prefetch_render(false)).await;
    assert_eq!(harness.html("#promo-banner"), "<h1>A</h1><h1>A</h1>");
    assert_eq!(harness.transport.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_keys_sharing_a_checksum_compile_once() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#left", "<p>{{ v }}</p>").template(".right", "<p>{{ v }}</p>");
    assert_eq!(fixture.checksum("#left"), fixture.checksum(".right"));

    let harness = Harness::new(fixture.csp_data(), &["#left", ".right"], Arc::new(MemoryStore::new()))?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl(["#left", ".right"], TemplateData::json(json!({ "v": 1 })), TplOptions::default()).await;

    let cache = harness.common.templates().local().compiler().cache();
    assert!(outcome.all_rendered());
    assert_eq!(cache.compile_count(), 1);
    let (left, right) = (cache.get(&key("#left")), cache.get(&key(".right")));
    assert!(matches!((left, right), (Some(l), Some(r)) if Arc::ptr_eq(&l, &r)));
    Ok(())
}

#[tokio::test]
async fn test_stale_template_is_evicted_and_refetched() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}!</h1>");
    let store = Arc::new(MemoryStore::new());
    store.set("common-tpl-mapping:#promo-banner", "old")?;
    store.set("common-tpl-hash:old", "<h1>{{ title }}</h1>")?;

    let harness = Harness::new(fixture.csp_data(), &["#promo-banner"], store.clone())?;
    harness.transport.push_envelope(fixture.envelope());

    harness
        .common
        .tpl("#promo-banner", TemplateData::json(json!({ "title": "New" })), TplOptions::default())
        .await;

    let checksum = fixture.checksum("#promo-banner").unwrap();
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(harness.html("#promo-banner"), "<h1>New!</h1>");
    assert_eq!(store.get("common-tpl-hash:old")?, None);
    assert_eq!(store.get("common-tpl-mapping:#promo-banner")?, Some(checksum));
    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_is_retried() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#cart", "<span>{{ qty }}</span>");
    let store = Arc::new(MemoryStore::new());
    let harness = Harness::new(fixture.csp_data(), &["#cart"], store.clone())?;

    harness.transport.push_failure(FetchError::Transport {
        url: "/common/template".to_string(),
        reason: "connection refused".to_string(),
    });
    harness.transport.push_envelope(json!({ "payload": fixture.payload() }));
    harness.transport.push_envelope(fixture.envelope());

    let data = || TemplateData::json(json!({ "qty": 3 }));

    let outcome = harness.common.tpl("#cart", data(), TplOptions::default()).await;
    assert!(matches!(outcome.fetch_error, Some(FetchError::Transport { .. })));
    assert_eq!(outcome.unresolved, vec![key("#cart")]);
    assert_eq!(harness.html("#cart"), "");
    assert!(store.keys()?.is_empty());

    let outcome = harness.common.tpl("#cart", data(), TplOptions::default()).await;
    assert!(matches!(outcome.fetch_error, Some(FetchError::EnvelopeViolation { .. })));
    assert_eq!(harness.html("#cart"), "");

    let outcome = harness.common.tpl("#cart", data(), TplOptions::default()).await;
    assert!(outcome.fetch_error.is_none());
    assert_eq!(harness.html("#cart"), "<span>3</span>");
    assert_eq!(harness.transport.request_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_template_missing_from_response() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#present", "<p>{{ v }}</p>");
    let harness = Harness::new(json!({}), &["#present", "#absent"], Arc::new(MemoryStore::new()))?;
    harness.transport.push_envelope(fixture.envelope());
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl(["#present", "#absent"], TemplateData::json(json!({ "v": 1 })), TplOptions::default()).await;

    assert_eq!(outcome.rendered, vec![key("#present")]);
    assert_eq!(outcome.unresolved, vec![key("#absent")]);
    assert!(matches!(outcome.fetch_error, Some(FetchError::MissingTemplate { ref key }) if key == "#absent"));

    harness.common.tpl("#absent", TemplateData::json(json!({ "v": 1 })), TplOptions::default()).await;
    assert_eq!(harness.transport.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_broken_templates_are_skipped() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new()
        .template("#broken", "<p>{{ title </p>")
        .template("#strict", "<p>{{ title }}</p>")
        .template("#good", "<p>ok</p>");
    let store = Arc::new(MemoryStore::new());
    let harness = Harness::new(fixture.csp_data(), &["#broken", "#strict", "#good"], store.clone())?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome =
        harness.common.tpl(["#broken", "#strict", "#good"], TemplateData::json(json!({})), TplOptions::default()).await;

    assert_eq!(outcome.rendered, vec![key("#good")]);
    assert_eq!(outcome.failed, vec![key("#broken"), key("#strict")]);
    assert_eq!(harness.html("#broken"), "");
    assert_eq!(harness.html("#strict"), "");
    assert_eq!(store.get("common-tpl-mapping:#broken")?, None);
    assert!(store.get("common-tpl-mapping:#strict")?.is_some());
    assert_eq!(store.get("common-tpl-data:#strict")?, None);
    assert!(store.get("common-tpl-data:#good")?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_share_one_request() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
    let transport = Arc::new(MockTransport::new().gated());
    transport.push_envelope(fixture.envelope());
    let harness =
        Harness::with_transport(fixture.csp_data(), &["#promo-banner"], Arc::new(MemoryStore::new()), transport.clone())?;

    let (first, second, ()) = tokio::join!(
        harness.common.tpl("#promo-banner", TemplateData::json(json!({ "title": "A" })), TplOptions::default()),
        harness.common.tpl("#promo-banner", TemplateData::json(json!({ "title": "B" })), TplOptions::default()),
        async {
            tokio::task::yield_now().await;
            transport.release();
        }
    );

    assert_eq!(transport.request_count(), 1);
    assert_eq!(first.fetched, vec![key("#promo-banner")]);
    assert_eq!(second.fetched, vec![key("#promo-banner")]);
    assert_eq!(harness.common.templates().local().compiler().cache().compile_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_blank_keys_are_a_no_op() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &[], Arc::new(MemoryStore::new()))?;
    let outcome = harness.common.tpl(["", "   "], TemplateData::json(json!({})), TplOptions::default()).await;
    assert_eq!(outcome, Default::default());
    assert_eq!(harness.transport.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_data_without_a_target_is_not_stored() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#late", "<h1>{{ title }}</h1>");
    let store = Arc::new(MemoryStore::new());
    let harness = Harness::new(fixture.csp_data(), &[], store.clone())?;
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl("#late", TemplateData::json(json!({})), TplOptions::default()).await;
    assert_eq!(outcome.fetched, vec![key("#late")]);
    assert!(outcome.rendered.is_empty());
    assert!(outcome.failed.is_empty());
    assert_eq!(store.get("common-tpl-data:#late")?, None);

    // Once the region exists, a call without data has nothing stored to render.
    harness.document.push(Element::new(Some("late"), &[]));
    let outcome = harness.common.tpl("#late", TemplateData::None, TplOptions::default()).await;
    assert!(outcome.failed.is_empty());
    assert_eq!(harness.html("#late"), "");

    harness.common.tpl("#late", TemplateData::json(json!({ "title": "Now" })), TplOptions::default()).await;
    assert_eq!(harness.html("#late"), "<h1>Now</h1>");
    assert!(store.get("common-tpl-data:#late")?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_reported_error_caches_nothing() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#k", "<p>{{ v }}</p>");
    let store = Arc::new(MemoryStore::new());
    let harness = Harness::new(fixture.csp_data(), &["#k"], store.clone())?;
    harness.transport.push_envelope(json!({
        "error": 1,
        "feedback": { "message": "Maintenance" },
        "payload": fixture.payload()
    }));
    harness.transport.push_envelope(fixture.envelope());

    let outcome = harness.common.tpl("#k", TemplateData::json(json!({ "v": "x" })), TplOptions::default()).await;

    assert!(outcome.fetched.is_empty());
    assert_eq!(outcome.unresolved, vec![key("#k")]);
    assert_eq!(
        outcome.fetch_error,
        Some(FetchError::Reported {
            code: 1,
            message: Some("Maintenance".to_string()),
        })
    );
    assert_eq!(harness.html("#k"), "");
    assert!(store.keys()?.is_empty());
    assert_eq!(harness.common.client().memoized(), 0);
    assert_eq!(harness.common.templates().local().compiler().cache().compile_count(), 0);

    let outcome = harness.common.tpl("#k", TemplateData::json(json!({ "v": "x" })), TplOptions::default()).await;
    assert_eq!(outcome.fetched, vec![key("#k")]);
    assert_eq!(harness.html("#k"), "<p>x</p>");
    assert_eq!(harness.transport.request_count(), 2);
    Ok(())
}
