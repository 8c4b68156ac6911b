//! Developer-mode gated error reporting.

use std::sync::Arc;

use super::TemplateError;
use crate::csp::CspStore;

/// Decides whether template errors are worth a warning.
///
/// Developer mode is on when the configuration forces it or when the page's
/// CSP data sets `isDeveloperMode`. The CSP flag is read lazily, on the first
/// error, so constructing a pipeline never touches the document.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    forced: bool,
    csp: Option<Arc<CspStore>>,
}

impl Diagnostics {
    /// Diagnostics with a fixed setting.
    pub fn fixed(enabled: bool) -> Self {
        Self {
            forced: enabled,
            csp: None,
        }
    }

    /// Diagnostics following the page's CSP flag, unless `forced`.
    pub fn from_csp(csp: Arc<CspStore>, forced: bool) -> Self {
        Self {
            forced,
            csp: Some(csp),
        }
    }

    /// Whether developer mode is on.
    pub fn is_developer_mode(&self) -> bool {
        self.forced || self.csp.as_ref().is_some_and(|csp| csp.data().is_developer_mode())
    }

    /// Report a swallowed template error.
    pub fn report(&self, error: &TemplateError) {
        if self.is_developer_mode() {
            tracing::warn!("{}", error);
        } else {
            tracing::trace!("{}", error);
        }
    }
}
