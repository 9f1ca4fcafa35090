//! HTTP client abstraction.
//!
//! The core never talks to a socket directly; every Zotero API call and
//! attachment download goes through [`HttpClient`]. Hosts provide the
//! implementation (desktop ships a reqwest one), which keeps the core
//! portable and lets tests substitute canned responses.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Request verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// A platform-neutral HTTP request, assembled with builder methods.
///
/// ```
/// use bridge_traits::http::HttpRequest;
/// use std::time::Duration;
///
/// let request = HttpRequest::get("https://api.zotero.org/users/12345/items")
///     .header("Zotero-API-Version", "3")
///     .timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Shorthand for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Per-request timeout, overriding whatever default the client carries.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Status, headers and body of a completed exchange.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Deserializes the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Returns the body as a UTF-8 string.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// How an implementation should retry transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries. Used for downloads where the caller
    /// already tolerates per-item failure.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Async HTTP transport provided by the host.
///
/// The error contract matters more than the transport details:
///
/// - A response with a non-2xx status is still `Ok(HttpResponse)`. Status
///   handling (401 vs 404 vs 500) belongs to the protocol layer.
/// - `Err` means the exchange never completed. Connectivity failures (DNS,
///   connect, timeout) must be reported as [`BridgeError::Network`]; the
///   shelf aggregator keys its offline-cache fallback on that variant.
///
/// Implementations are also expected to validate TLS certificates and retry
/// 429/5xx responses per the supplied [`RetryPolicy`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes a request with the implementation's default retry policy.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Executes a request under an explicit retry policy.
    ///
    /// The default implementation ignores the policy and delegates to
    /// [`execute`](HttpClient::execute); implementations with real retry
    /// machinery override it.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }
}
