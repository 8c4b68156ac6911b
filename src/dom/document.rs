//! Headless in-memory document.

use regex::Regex;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::selector::SelectorList;
use super::{Dom, DomEvent, NodeId};
use crate::constants::DOM_EVENT_CHANNEL_CAPACITY;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)\b([^>]*)>").expect("tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][a-zA-Z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// One element of a [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// `id` attribute
    pub id: Option<String>,
    /// `class` attribute, split on whitespace
    pub classes: Vec<String>,
    /// `value` attribute
    pub value: Option<String>,
    /// `name` attribute of a form control
    pub name: Option<String>,
    /// `type` attribute of an `input`
    pub input_type: Option<String>,
    /// Whether the `checked` attribute is present
    pub checked: bool,
    /// Whether the `disabled` attribute is present
    pub disabled: bool,
    /// Enclosing `form`
    pub form: Option<NodeId>,
    /// Current content
    pub inner_html: String,
    detached: bool,
}

impl Element {
    /// Create a `div`-like element.
    pub fn new(id: Option<&str>, classes: &[&str]) -> Self {
        Self {
            tag: "div".to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Create a named `input` control belonging to `form`.
    pub fn input(form: NodeId, name: &str, value: &str) -> Self {
        Self {
            tag: "input".to_string(),
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            form: Some(form),
            ..Self::default()
        }
    }

    /// Whether a form submission would include this control.
    ///
    /// Disabled controls, buttons, file pickers and unchecked checkboxes or
    /// radios are left out.
    fn is_submittable(&self) -> bool {
        if self.name.is_none() || self.disabled || !matches!(self.tag.as_str(), "input" | "select" | "textarea") {
            return false;
        }
        match self.input_type.as_deref() {
            Some("checkbox" | "radio") => self.checked,
            Some("submit" | "button" | "reset" | "image" | "file") => false,
            _ => true,
        }
    }
}

/// In-memory implementation of [`Dom`].
///
/// Elements are a flat list: nesting is irrelevant to selector matching on ids
/// and classes. Events are broadcast to every [`Document::subscribe`]r.
pub struct Document {
    elements: Mutex<Vec<Element>>,
    events: broadcast::Sender<DomEvent>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("elements", &self.lock().len()).finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DOM_EVENT_CHANNEL_CAPACITY);
        Self {
            elements: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Builder-style [`Document::push`] of an element with an id and classes.
    #[must_use]
    pub fn with_element(self, id: Option<&str>, classes: &[&str]) -> Self {
        self.push(Element::new(id, classes));
        self
    }

    /// Builder-style addition of a hidden `input` carrying a value.
    #[must_use]
    pub fn with_input(self, classes: &[&str], value: &str) -> Self {
        let mut element = Element::new(None, classes);
        element.tag = "input".to_string();
        element.value = Some(value.to_string());
        self.push(element);
        self
    }

    /// Append an element and return its handle.
    pub fn push(&self, element: Element) -> NodeId {
        let mut elements = self.lock();
        elements.push(element);
        elements.len() - 1
    }

    /// Build a document skeleton from page markup.
    ///
    /// Every `form`, and every start tag carrying an `id`, a `class`, a
    /// `name` or a `value` attribute, becomes an element. Controls remember
    /// the form they sit in. Content is not parsed: elements start empty.
    pub fn from_html(html: &str) -> Self {
        let document = Self::new();
        let mut open_form = None;

        for tag in TAG.captures_iter(html) {
            let name = tag[2].to_ascii_lowercase();
            if !tag[1].is_empty() {
                if name == "form" {
                    open_form = None;
                }
                continue;
            }

            let mut element = Element {
                tag: name,
                form: open_form,
                ..Element::default()
            };

            let bare = ATTRIBUTE.replace_all(&tag[3], "");
            for flag in bare.split(|c: char| c.is_whitespace() || c == '/') {
                match flag.to_ascii_lowercase().as_str() {
                    "checked" => element.checked = true,
                    "disabled" => element.disabled = true,
                    _ => {}
                }
            }

            for attribute in ATTRIBUTE.captures_iter(&tag[3]) {
                let value = attribute
                    .get(2)
                    .or_else(|| attribute.get(3))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                match attribute[1].to_ascii_lowercase().as_str() {
                    "id" => element.id = Some(value),
                    "class" => {
                        element.classes = value.split_whitespace().map(str::to_string).collect();
                    }
                    "value" => element.value = Some(value),
                    "name" => element.name = Some(value),
                    "type" => element.input_type = Some(value.to_ascii_lowercase()),
                    "checked" => element.checked = true,
                    "disabled" => element.disabled = true,
                    _ => {}
                }
            }

            if element.tag == "form" {
                element.form = None;
                open_form = Some(document.push(element));
            } else if element.id.is_some()
                || !element.classes.is_empty()
                || element.value.is_some()
                || element.name.is_some()
            {
                document.push(element);
            }
        }

        tracing::debug!("Built document skeleton with {} elements", document.lock().len());
        document
    }

    /// Subscribe to events fired from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DomEvent> {
        self.events.subscribe()
    }

    /// Content of the first node matching `selector`.
    pub fn inner_html(&self, selector: &str) -> Option<String> {
        let first = *self.select(selector).first()?;
        self.lock().get(first).map(|element| element.inner_html.clone())
    }

    /// Classes of the first node matching `selector`.
    pub fn classes(&self, selector: &str) -> Vec<String> {
        self.select(selector)
            .first()
            .and_then(|node| self.lock().get(*node).map(|element| element.classes.clone()))
            .unwrap_or_default()
    }

    /// Snapshot of every attached element.
    pub fn elements(&self) -> Vec<Element> {
        self.lock().iter().filter(|element| !element.detached).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Element>> {
        // A panic while holding the lock cannot leave an element half-written,
        // so a poisoned lock is still safe to use.
        self.elements.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_element_mut(&self, node: NodeId, f: impl FnOnce(&mut Element)) {
        if let Some(element) = self.lock().get_mut(node)
            && !element.detached
        {
            f(element);
        }
    }
}

impl Dom for Document {
    fn select(&self, selector: &str) -> Vec<NodeId> {
        let Some(list) = SelectorList::parse(selector) else {
            tracing::debug!("Unsupported selector '{}' matches nothing", selector);
            return Vec::new();
        };

        self.lock()
            .iter()
            .enumerate()
            .filter(|(_, element)| {
                !element.detached
                    && list.matches(&element.tag, element.id.as_deref(), &element.classes)
            })
            .map(|(node, _)| node)
            .collect()
    }

    fn set_inner_html(&self, node: NodeId, html: &str) {
        self.with_element_mut(node, |element| element.inner_html = html.to_string());
    }

    fn append_html(&self, node: NodeId, html: &str) {
        self.with_element_mut(node, |element| element.inner_html.push_str(html));
    }

    fn add_class(&self, node: NodeId, class: &str) {
        self.with_element_mut(node, |element| {
            if !element.classes.iter().any(|c| c == class) {
                element.classes.push(class.to_string());
            }
        });
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        self.with_element_mut(node, |element| element.classes.retain(|c| c != class));
    }

    fn form_fields(&self, form: NodeId) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter(|element| !element.detached && element.form == Some(form) && element.is_submittable())
            .filter_map(|element| {
                let name = element.name.clone()?;
                let value = match (&element.value, element.input_type.as_deref()) {
                    (Some(value), _) => value.clone(),
                    (None, Some("checkbox" | "radio")) => "on".to_string(),
                    (None, _) => String::new(),
                };
                Some((name, value))
            })
            .collect()
    }

    fn take_values(&self, selector: &str) -> Vec<String> {
        let nodes = self.select(selector);
        let mut elements = self.lock();
        nodes
            .into_iter()
            .filter_map(|node| {
                let element = elements.get_mut(node)?;
                element.detached = true;
                element.value.clone()
            })
            .collect()
    }

    fn trigger(&self, event: DomEvent) {
        tracing::trace!("Event {} on {}", event.name, event.target);
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
