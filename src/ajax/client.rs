//! Memoized envelope requests and the `post` lifecycle.

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::sync::{Arc, RwLock};

use super::envelope::Envelope;
use super::transport::{AjaxRequest, RequestKey, Transport, TransportResponse};
use super::FetchError;
use crate::constants::{
    EVENT_AFTER_TARGET_FEEDBACK_INSERT, EVENT_AFTER_TARGET_PAYLOAD_INSERT, FEEDBACK_MARKER_CLASS,
    PAYLOAD_MARKER_CLASS,
};
use crate::dom::{Dom, DomEvent};

/// Result of one envelope request, shared by every caller that awaited it.
pub type EnvelopeResult = Result<Arc<Envelope>, FetchError>;

type SharedRequest = Shared<BoxFuture<'static, EnvelopeResult>>;

/// Hook that may rewrite a request before it is sent.
pub type BeforePostHook = Arc<dyn Fn(&mut AjaxRequest) + Send + Sync>;

/// Hook that observes a finished `post`.
pub type AfterPostHook = Arc<dyn Fn(&AjaxRequest, &EnvelopeResult) + Send + Sync>;

/// Caller callbacks for [`AjaxClient::post`]. Every callback is optional.
#[derive(Default)]
pub struct PostCallbacks {
    limbo: Option<Box<dyn FnMut(&AjaxRequest) + Send>>,
    valid: Option<Box<dyn FnMut(&Value) + Send>>,
    invalid: Option<Box<dyn FnMut(&Value) + Send>>,
    cleanup: Option<Box<dyn FnMut(&Value) + Send>>,
    error: Option<Box<dyn FnMut(&FetchError) + Send>>,
}

impl std::fmt::Debug for PostCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostCallbacks")
            .field("limbo", &self.limbo.is_some())
            .field("valid", &self.valid.is_some())
            .field("invalid", &self.invalid.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl PostCallbacks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs with the (possibly rewritten) request right before it is sent.
    #[must_use]
    pub fn on_limbo(mut self, f: impl FnMut(&AjaxRequest) + Send + 'static) -> Self {
        self.limbo = Some(Box::new(f));
        self
    }

    /// Runs with the payload when the server reports `error == 0`.
    #[must_use]
    pub fn on_valid(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.valid = Some(Box::new(f));
        self
    }

    /// Runs with the payload when the server reports `error >= 1`.
    #[must_use]
    pub fn on_invalid(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.invalid = Some(Box::new(f));
        self
    }

    /// Always runs last, with the payload if there is one.
    #[must_use]
    pub fn on_cleanup(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.cleanup = Some(Box::new(f));
        self
    }

    /// Runs when the request failed.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&FetchError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

/// Envelope client with request memoization.
///
/// Identical requests (same endpoint, method and parameters, in any order)
/// share one in-flight future, and a successful response stays memoized for
/// the client's lifetime. A failed request evicts its own memo entry, so the
/// next identical request goes back to the network.
pub struct AjaxClient {
    transport: Arc<dyn Transport>,
    dom: Option<Arc<dyn Dom>>,
    memo: DashMap<RequestKey, SharedRequest>,
    before_post: RwLock<Vec<BeforePostHook>>,
    after_post: RwLock<Vec<AfterPostHook>>,
}

impl std::fmt::Debug for AjaxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AjaxClient")
            .field("memoized", &self.memo.len())
            .field("has_dom", &self.dom.is_some())
            .finish()
    }
}

impl AjaxClient {
    /// Create a client sending through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            dom: None,
            memo: DashMap::new(),
            before_post: RwLock::new(Vec::new()),
            after_post: RwLock::new(Vec::new()),
        }
    }

    /// Attach the document used for `target` injection in [`AjaxClient::post`].
    #[must_use]
    pub fn with_dom(mut self, dom: Arc<dyn Dom>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Send `request`, or join an identical request already memoized.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of the underlying request. Failures are never
    /// memoized.
    pub async fn request(&self, request: AjaxRequest) -> EnvelopeResult {
        let key = request.key();

        let shared = self
            .memo
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::debug!("Sending {} {}", request.method, request.endpoint);
                let response = self.transport.send(request);
                async move { decode(response.await?).map(Arc::new) }.boxed().shared()
            })
            .clone();

        let result = shared.clone().await;

        if let Err(e) = &result {
            tracing::debug!("Request failed, evicting memo entry {}: {}", key.hash(), e);
            self.memo.remove_if(&key, |_, existing| existing.ptr_eq(&shared));
        }

        result
    }

    /// Drop the memoized response of `request`, if any.
    pub fn forget(&self, request: &AjaxRequest) {
        let key = request.key();
        if self.memo.remove(&key).is_some() {
            tracing::trace!("Forgot memoized response {}", key.hash());
        }
    }

    /// Drop every memoized response.
    pub fn clear(&self) {
        self.memo.clear();
    }

    /// Number of memoized requests, in flight or settled.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Register a hook run on every request passed to [`AjaxClient::post`].
    pub fn add_before_post(&self, hook: BeforePostHook) {
        match self.before_post.write() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    /// Register a hook run after every [`AjaxClient::post`].
    pub fn add_after_post(&self, hook: AfterPostHook) {
        match self.after_post.write() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    /// Send a request through the full lifecycle.
    ///
    /// 1. before-post hooks may rewrite the request, then `limbo` runs
    /// 2. on success with a non-empty payload, `target.payload` selectors are
    ///    filled, then `valid` or `invalid` runs depending on `error`
    /// 3. on failure, `invalid` runs if the error response carried an envelope
    ///    payload, then `error` runs
    /// 4. always: the `target.feedback` selector receives the feedback message,
    ///    `cleanup` runs, then the after-post hooks
    ///
    /// The outcome is also returned to the caller.
    pub async fn post(&self, mut request: AjaxRequest, mut callbacks: PostCallbacks) -> EnvelopeResult {
        for hook in self.hooks(&self.before_post) {
            hook(&mut request);
        }

        if let Some(limbo) = callbacks.limbo.as_mut() {
            limbo(&request);
        }

        let result = self.request(request.clone()).await;

        match &result {
            Ok(envelope) => {
                if envelope.payload_size() > 0 {
                    self.inject_payload_targets(envelope);

                    if envelope.error == 0 {
                        if let Some(valid) = callbacks.valid.as_mut() {
                            valid(&envelope.payload);
                        }
                    } else if envelope.error >= 1
                        && let Some(invalid) = callbacks.invalid.as_mut()
                    {
                        invalid(&envelope.payload);
                    }
                }
            }
            Err(e) => {
                if let Some(payload) = e.response_payload()
                    && let Some(invalid) = callbacks.invalid.as_mut()
                {
                    invalid(payload);
                }
                if let Some(error) = callbacks.error.as_mut() {
                    error(e);
                }
            }
        }

        let standard = match &result {
            Ok(envelope) => Some(envelope.as_ref().clone()),
            Err(e) => e.response_envelope(),
        };

        match &standard {
            Some(envelope) => {
                self.inject_feedback_target(envelope);
                if let Some(cleanup) = callbacks.cleanup.as_mut() {
                    cleanup(&envelope.payload);
                }
            }
            None => {
                if let Some(cleanup) = callbacks.cleanup.as_mut() {
                    cleanup(&Value::Null);
                }
            }
        }

        for hook in self.hooks(&self.after_post) {
            hook(&request, &result);
        }

        if let Some(envelope) = &standard
            && envelope.feedback.has_debug()
        {
            tracing::debug!("Debug data for {}: {}", request.endpoint, envelope.feedback.debug);
        }

        result
    }

    fn hooks<T: Clone>(&self, hooks: &RwLock<Vec<T>>) -> Vec<T> {
        match hooks.read() {
            Ok(hooks) => hooks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn inject_payload_targets(&self, envelope: &Envelope) {
        let Some(dom) = &self.dom else {
            return;
        };

        for selector in &envelope.target.payload {
            let Some(html) = envelope.payload.get(selector).and_then(Value::as_str) else {
                continue;
            };

            for node in dom.select(selector) {
                dom.add_class(node, PAYLOAD_MARKER_CLASS);
                dom.set_inner_html(node, html);
                dom.trigger(DomEvent {
                    name: EVENT_AFTER_TARGET_PAYLOAD_INSERT.to_string(),
                    target: selector.clone(),
                    node,
                    data: Value::String(html.to_string()),
                });
            }
        }
    }

    fn inject_feedback_target(&self, envelope: &Envelope) {
        let (Some(dom), Some(selector), Some(message)) =
            (&self.dom, &envelope.target.feedback, envelope.feedback.message())
        else {
            return;
        };

        let error_class = format!("feedback-error-{}", envelope.error);
        for node in dom.select(selector) {
            dom.add_class(node, FEEDBACK_MARKER_CLASS);
            dom.add_class(node, &error_class);
            dom.set_inner_html(node, message);
            dom.trigger(DomEvent {
                name: EVENT_AFTER_TARGET_FEEDBACK_INSERT.to_string(),
                target: selector.clone(),
                node,
                data: Value::String(message.to_string()),
            });
        }
    }
}

fn decode(response: TransportResponse) -> Result<Envelope, FetchError> {
    if !(200..300).contains(&response.status) {
        return Err(FetchError::Http {
            status: response.status,
            body: serde_json::from_str(&response.body).ok(),
        });
    }
    Envelope::from_body(&response.body)
}
