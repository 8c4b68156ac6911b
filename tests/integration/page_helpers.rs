use common_tpl::constants::{JS_HIDDEN_CLASS, JS_INVISIBLE_CLASS};
use common_tpl::dom::{Element, form_data, hide, invisible, show_until};
use common_tpl::storage::MemoryStore;
use common_tpl::templating::{TemplateData, TplOptions};
use common_tpl::test_utils::TemplateFixture;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::Harness;

#[tokio::test]
async fn test_prices_follow_page_locale() -> anyhow::Result<()> {
    let fixture = TemplateFixture::new().template("#cart-total", "<strong>{{ total }}</strong>");
    let mut csp = fixture.csp_data();
    csp["locale"] = json!("fr_FR");
    let harness = Harness::new(csp, &["#cart-total"], Arc::new(MemoryStore::new()))?;
    harness.transport.push_envelope(fixture.envelope());

    let accounting = harness.common.accounting();
    let total = accounting.subtotal_from_base_prices(["1 000,50 $", "298,75 $"]);
    harness
        .common
        .tpl("#cart-total", TemplateData::json(json!({ "total": accounting.format_money(total) })), TplOptions::default())
        .await;

    assert_eq!(harness.html("#cart-total"), "<strong>1 299,25 $</strong>");

    let default = Harness::new(json!({}), &[], Arc::new(MemoryStore::new()))?;
    assert_eq!(default.common.accounting().format_money(total), "$1,299.25");
    Ok(())
}

#[tokio::test]
async fn test_visibility_helpers_on_page() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &["#toast", ".promo"], Arc::new(MemoryStore::new()))?;
    let dom = harness.common.dom().clone();

    invisible(dom.as_ref(), ".promo");
    hide(dom.as_ref(), "#toast");
    assert_eq!(harness.document.classes(".promo"), vec!["promo".to_string(), JS_INVISIBLE_CLASS.to_string()]);

    let handle = show_until(dom, "#toast", Duration::from_millis(10));
    assert!(harness.document.classes("#toast").is_empty());
    handle.await?;
    assert_eq!(harness.document.classes("#toast"), vec![JS_HIDDEN_CLASS.to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_form_data_from_page() -> anyhow::Result<()> {
    let harness = Harness::new(json!({}), &[], Arc::new(MemoryStore::new()))?;
    let mut form = Element::new(Some("newsletter"), &[]);
    form.tag = "form".to_string();
    let form = harness.document.push(form);
    harness.document.push(Element::input(form, "email", "ada@example.com"));
    harness.document.push(Element::input(form, "list", "weekly"));

    let data = form_data(harness.common.dom().as_ref(), "#newsletter");

    assert_eq!(data.get("email"), Some(&json!("ada@example.com")));
    assert_eq!(data.get("list"), Some(&json!("weekly")));
    assert_eq!(data.len(), 2);
    Ok(())
}
