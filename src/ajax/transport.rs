//! Request types and the network port.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::FetchError;

/// HTTP method of an envelope request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Parameters travel in the query string
    #[default]
    Get,
    /// Parameters travel as a form body
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// An outgoing envelope request.
///
/// Parameters are an ordered list of pairs so a field may repeat, which is
/// how arrays travel (`tpl[]=#a&tpl[]=#b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxRequest {
    /// Endpoint path or absolute URL
    pub endpoint: String,
    /// HTTP method
    pub method: Method,
    /// Request parameters
    pub params: Vec<(String, String)>,
}

impl AjaxRequest {
    /// Create a request with no parameters.
    pub fn new(endpoint: impl Into<String>, method: Method) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            params: Vec::new(),
        }
    }

    /// Add one parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add a list parameter, sent as repeated `name[]` fields.
    #[must_use]
    pub fn list_param<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = format!("{name}[]");
        self.params.extend(values.into_iter().map(|value| (field.clone(), value.into())));
        self
    }

    /// Memoization key of this request.
    pub fn key(&self) -> RequestKey {
        let mut params = self.params.clone();
        params.sort();
        RequestKey {
            endpoint: self.endpoint.clone(),
            method: self.method,
            params,
        }
    }
}

/// Normalized `(endpoint, method, sorted params)` identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    endpoint: String,
    method: Method,
    params: Vec<(String, String)>,
}

impl RequestKey {
    /// Stable string form of the key, for logs and external caches.
    pub fn hash(&self) -> String {
        let params: Vec<Value> = self
            .params
            .iter()
            .map(|(name, value)| Value::from(vec![name.as_str(), value.as_str()]))
            .collect();
        generate_hash(&[Value::from(self.endpoint.as_str()), Value::from(self.method.to_string()), Value::from(params)])
    }
}

/// Join any number of values into one string, `{"0":a,"1":b,...}`.
///
/// Equal argument lists always give equal strings.
pub fn generate_hash(args: &[Value]) -> String {
    let fields: Vec<String> = args.iter().enumerate().map(|(i, arg)| format!("\"{i}\":{arg}")).collect();
    format!("{{{}}}", fields.join(","))
}

/// Raw response handed back by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// A `200 OK` response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Sends envelope requests over some network.
///
/// The returned future must not borrow the transport, so memoized requests
/// can outlive the call that started them.
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response.
    fn send(&self, request: AjaxRequest) -> BoxFuture<'static, Result<TransportResponse, FetchError>>;
}

/// [`Transport`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport resolving relative endpoints against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Absolute URL of `endpoint`.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: AjaxRequest) -> BoxFuture<'static, Result<TransportResponse, FetchError>> {
        let url = self.url_for(&request.endpoint);
        let builder = match request.method {
            Method::Get => self.client.get(&url).query(&request.params),
            Method::Post => self.client.post(&url).form(&request.params),
        };
        let timeout = self.timeout;

        async move {
            tracing::debug!("{} {} ({} params)", request.method, url, request.params.len());

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        seconds: timeout.as_secs(),
                    }
                } else {
                    FetchError::Transport {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| FetchError::Transport {
                url: url.clone(),
                reason: format!("failed to read response body: {e}"),
            })?;

            Ok(TransportResponse {
                status,
                body,
            })
        }
        .boxed()
    }
}
