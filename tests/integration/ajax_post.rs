use common_tpl::ajax::{AjaxRequest, EnvelopeResult, FetchError, Method, PostCallbacks, TransportResponse};
use common_tpl::constants::{FEEDBACK_MARKER_CLASS, PAYLOAD_MARKER_CLASS};
use common_tpl::storage::MemoryStore;
use common_tpl::test_utils::TemplateFixture;
use serde_json::json;
use std::sync::{Arc, Mutex};

use super::Harness;

fn add_to_cart() -> AjaxRequest {
    AjaxRequest::new("/checkout/cart/add", Method::Post).param("product", "42")
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |step: &str| sink.lock().unwrap().push(step.to_string()))
}

#[tokio::test]
async fn test_post_fills_targets_and_renders_listed_templates() -> anyhow::Result<()> {
    let fixture =
        TemplateFixture::new().template("#mini-cart", "<ul>{{% for item in items %}}<li>{{ item }}</li>{{% endfor %}}</ul>");
    let targets = ["#mini-cart", "#cart-notice", "#feedback"];
    let harness = Harness::new(fixture.csp_data(), &targets, Arc::new(MemoryStore::new()))?;

    harness.transport.push_envelope(json!({
        "error": 0,
        "feedback": { "message": "Added to cart" },
        "payload": { "items": ["Tea", "Cups"], "#cart-notice": "<p>2 items</p>" },
        "target": { "payload": "#cart-notice", "feedback": "#feedback" },
        "tpl": ["#mini-cart"]
    }));
    harness.transport.push_envelope(fixture.envelope());

    let (log, record) = recorder();
    harness.common.client().add_before_post(Arc::new(|request: &mut AjaxRequest| {
        request.params.push(("form_key".to_string(), "k3y".to_string()));
    }));
    let after = record.clone();
    harness.common.client().add_after_post(Arc::new(move |_: &AjaxRequest, result: &EnvelopeResult| {
        after(if result.is_ok() { "after:ok" } else { "after:err" });
    }));

    let (limbo, valid, cleanup) = (record.clone(), record.clone(), record.clone());
    let callbacks = PostCallbacks::new()
        .on_limbo(move |_| limbo("limbo"))
        .on_valid(move |_| valid("valid"))
        .on_invalid(move |_| record("invalid"))
        .on_cleanup(move |_| cleanup("cleanup"));

    let envelope = harness.common.post(add_to_cart(), callbacks).await?;

    assert_eq!(envelope.tpl, vec!["#mini-cart"]);
    assert_eq!(*log.lock().unwrap(), vec!["limbo", "valid", "cleanup", "after:ok"]);

    let requests = harness.transport.requests();
    assert!(requests[0].params.contains(&("form_key".to_string(), "k3y".to_string())));
    assert_eq!(harness.requested_keys(1), vec!["#mini-cart"]);

    assert_eq!(harness.html("#cart-notice"), "<p>2 items</p>");
    assert!(harness.document.classes("#cart-notice").contains(&PAYLOAD_MARKER_CLASS.to_string()));
    assert_eq!(harness.html("#feedback"), "Added to cart");
    assert!(harness.document.classes("#feedback").contains(&FEEDBACK_MARKER_CLASS.to_string()));
    assert_eq!(harness.html("#mini-cart"), "<ul><li>Tea</li><li>Cups</li></ul>");
    Ok(())
}

#[tokio::test]
async fn test_post_reported_failure_runs_invalid() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &["#feedback"], Arc::new(MemoryStore::new()))?;
    harness.transport.push_envelope(json!({
        "error": 2,
        "feedback": { "message": "Out of stock" },
        "payload": { "product": "42" },
        "target": { "feedback": "#feedback" }
    }));

    let (log, record) = recorder();
    let (valid, invalid) = (record.clone(), record.clone());
    let callbacks = PostCallbacks::new().on_valid(move |_| valid("valid")).on_invalid(move |_| invalid("invalid"));

    let envelope = harness.common.post(add_to_cart(), callbacks).await?;

    assert_eq!(envelope.error, 2);
    assert_eq!(*log.lock().unwrap(), vec!["invalid"]);
    assert_eq!(harness.html("#feedback"), "Out of stock");
    assert!(harness.document.classes("#feedback").contains(&"feedback-error-2".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_post_http_error_runs_error_then_cleanup() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &[], Arc::new(MemoryStore::new()))?;
    harness.transport.push_response(TransportResponse {
        status: 503,
        body: "Service Unavailable".to_string(),
    });

    let (log, record) = recorder();
    let (error, cleanup) = (record.clone(), record.clone());
    let callbacks = PostCallbacks::new()
        .on_error(move |e| error(if matches!(e, FetchError::Http { status: 503, .. }) { "error:503" } else { "error" }))
        .on_cleanup(move |_| cleanup("cleanup"));

    let result = harness.common.post(add_to_cart(), callbacks).await;

    assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
    assert_eq!(*log.lock().unwrap(), vec!["error:503", "cleanup"]);
    Ok(())
}
