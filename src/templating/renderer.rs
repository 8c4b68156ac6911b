//! Template injection into the document.

use serde_json::{Value, json};
use std::sync::Arc;

use super::compiler::CompiledTemplate;
use super::diagnostics::Diagnostics;
use super::service::TplOptions;
use super::{TemplateError, TemplateKey};
use crate::constants::{EVENT_AFTER_TPL_RENDER, TPL_MARKER_CLASS};
use crate::dom::{Dom, DomEvent, NodeId};

/// What a single render did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The HTML was injected into this many nodes.
    Injected(usize),
    /// No node matched the key; nothing was rendered.
    NoTarget,
    /// The template failed to render; the document is unchanged.
    Failed(TemplateError),
}

impl RenderOutcome {
    /// Whether the template failed to render.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Renders templates into the nodes their keys select.
#[derive(Clone)]
pub struct TemplateRenderer {
    dom: Arc<dyn Dom>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Create a renderer over `dom`.
    pub fn new(dom: Arc<dyn Dom>, diagnostics: Diagnostics) -> Self {
        Self {
            dom,
            diagnostics,
        }
    }

    /// Inject ready-made HTML; no template is involved.
    pub fn render_html(&self, target: &TemplateKey, html: &str, options: &TplOptions) -> RenderOutcome {
        let nodes = self.dom.select(target.as_str());
        if nodes.is_empty() {
            return RenderOutcome::NoTarget;
        }
        self.inject(target, &nodes, html, Value::String(html.to_string()), options)
    }

    /// Render `compiled` with `data` and inject the result.
    ///
    /// A render failure is reported through the diagnostics and leaves every
    /// target node untouched.
    pub fn render_compiled(
        &self,
        target: &TemplateKey,
        compiled: &CompiledTemplate,
        data: &Value,
        options: &TplOptions,
    ) -> RenderOutcome {
        let nodes = self.dom.select(target.as_str());
        if nodes.is_empty() {
            tracing::trace!("No node matches {}, skipping render", target);
            return RenderOutcome::NoTarget;
        }

        match compiled.render_for(target, data) {
            Ok(html) => self.inject(target, &nodes, &html, data.clone(), options),
            Err(e) => {
                self.diagnostics.report(&e);
                RenderOutcome::Failed(e)
            }
        }
    }

    fn inject(
        &self,
        target: &TemplateKey,
        nodes: &[NodeId],
        html: &str,
        data: Value,
        options: &TplOptions,
    ) -> RenderOutcome {
        for &node in nodes {
            if options.append {
                self.dom.append_html(node, html);
            } else {
                self.dom.set_inner_html(node, html);
            }
            self.dom.add_class(node, TPL_MARKER_CLASS);
            self.dom.trigger(DomEvent {
                name: EVENT_AFTER_TPL_RENDER.to_string(),
                target: target.to_string(),
                node,
                data: json!({ "data": data, "target": target.as_str() }),
            });
        }

        tracing::debug!("Rendered {} into {} node(s)", target, nodes.len());
        RenderOutcome::Injected(nodes.len())
    }
}
