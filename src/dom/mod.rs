//! DOM port used for injection, CSP extraction and events.
//!
//! Rendering is the one place where the template pipeline touches a live page.
//! Everything behind the [`Dom`] trait can be swapped: the crate ships a
//! headless [`Document`] that is good enough for tests, tooling and
//! server-side pre-rendering, and an embedding application can implement the
//! trait over a real browser DOM.

mod document;
pub mod helpers;
mod selector;

pub use document::{Document, Element};
pub use helpers::{form_data, hide, invisible, show, show_until};
pub use selector::{CompoundSelector, SelectorList};

/// Opaque handle of a node inside a [`Dom`].
pub type NodeId = usize;

/// A custom event fired on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    /// Event name, e.g. `Common:afterTplRender`
    pub name: String,
    /// Selector the event was fired for
    pub target: String,
    /// Node the event was fired on
    pub node: NodeId,
    /// Data attached by the emitter
    pub data: serde_json::Value,
}

/// Operations the template pipeline needs from a document.
pub trait Dom: Send + Sync {
    /// All nodes matching `selector`, in document order.
    ///
    /// Unsupported or malformed selectors match nothing.
    fn select(&self, selector: &str) -> Vec<NodeId>;

    /// Replace a node's content.
    fn set_inner_html(&self, node: NodeId, html: &str);

    /// Append to a node's content.
    fn append_html(&self, node: NodeId, html: &str);

    /// Add a class to a node if it is not already present.
    fn add_class(&self, node: NodeId, class: &str);

    /// Remove a class from a node.
    fn remove_class(&self, node: NodeId, class: &str);

    /// `(name, value)` pairs a submission of the `form` node would send, in
    /// document order.
    fn form_fields(&self, form: NodeId) -> Vec<(String, String)>;

    /// Read the `value` of every node matching `selector`, then detach those nodes.
    fn take_values(&self, selector: &str) -> Vec<String>;

    /// Fire a custom event.
    fn trigger(&self, event: DomEvent);
}
