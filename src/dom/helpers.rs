//! Visibility and form helpers over any [`Dom`].
//!
//! Visibility is toggled through the `js-hidden` and `js-invisible` classes
//! so no inline style is ever written.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::Dom;
use crate::constants::{JS_HIDDEN_CLASS, JS_INVISIBLE_CLASS};

/// Remove every node matching `selector` from the page flow.
pub fn hide(dom: &dyn Dom, selector: &str) {
    for node in dom.select(selector) {
        dom.add_class(node, JS_HIDDEN_CLASS);
    }
}

/// Hide every node matching `selector` while keeping its space.
pub fn invisible(dom: &dyn Dom, selector: &str) {
    for node in dom.select(selector) {
        dom.add_class(node, JS_INVISIBLE_CLASS);
    }
}

/// Undo [`hide`] and [`invisible`].
pub fn show(dom: &dyn Dom, selector: &str) {
    for node in dom.select(selector) {
        dom.remove_class(node, JS_HIDDEN_CLASS);
        dom.remove_class(node, JS_INVISIBLE_CLASS);
    }
}

/// [`show`] now, then [`hide`] once `duration` has passed.
///
/// Must be called from within a tokio runtime.
pub fn show_until(dom: Arc<dyn Dom>, selector: impl Into<String>, duration: Duration) -> JoinHandle<()> {
    let selector = selector.into();
    show(dom.as_ref(), &selector);

    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        tracing::trace!("Hiding {} after {:?}", selector, duration);
        hide(dom.as_ref(), &selector);
    })
}

/// The submittable fields of every form matching `selector` as one object.
///
/// A name that repeats keeps its last value.
pub fn form_data(dom: &dyn Dom, selector: &str) -> Map<String, Value> {
    dom.select(selector)
        .into_iter()
        .flat_map(|form| dom.form_fields(form))
        .map(|(name, value)| (name, Value::String(value)))
        .collect()
}
