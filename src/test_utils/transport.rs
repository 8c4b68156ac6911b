use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

use crate::ajax::{AjaxRequest, FetchError, Transport, TransportResponse};

/// Scripted [`Transport`].
///
/// Each `send` takes the next scripted result; an exhausted script answers
/// with a transport error. A gated transport holds every response until
/// [`MockTransport::release`] is called.
pub struct MockTransport {
    script: Mutex<VecDeque<Result<TransportResponse, FetchError>>>,
    requests: Mutex<Vec<AjaxRequest>>,
    count: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").field("count", &self.request_count()).finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// An ungated transport with an empty script.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
            gate,
        }
    }

    /// Hold responses until [`MockTransport::release`].
    #[must_use]
    pub fn gated(self) -> Self {
        self.gate.send_replace(false);
        self
    }

    /// Let held and future responses through.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Script a `200 OK` with `envelope` as body.
    pub fn push_envelope(&self, envelope: Value) {
        self.push_response(TransportResponse::ok(envelope.to_string()));
    }

    /// Script a raw response.
    pub fn push_response(&self, response: TransportResponse) {
        lock(&self.script).push_back(Ok(response));
    }

    /// Script a failure.
    pub fn push_failure(&self, error: FetchError) {
        lock(&self.script).push_back(Err(error));
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<AjaxRequest> {
        lock(&self.requests).clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: AjaxRequest) -> BoxFuture<'static, Result<TransportResponse, FetchError>> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let url = request.endpoint.clone();
        lock(&self.requests).push(request);

        let scripted = lock(&self.script).pop_front().unwrap_or_else(|| {
            Err(FetchError::Transport {
                url,
                reason: "no scripted response left".to_string(),
            })
        });
        let mut gate = self.gate.subscribe();

        async move {
            let _ = gate.wait_for(|open| *open).await;
            scripted
        }
        .boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
