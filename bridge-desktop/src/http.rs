//! Reqwest-backed HTTP bridge.
//!
//! Desktop implementation of [`HttpClient`]. Retries are handled here, close
//! to the socket: 429 and 5xx responses are retried with exponential backoff,
//! while any other status is returned to the caller as a normal
//! [`HttpResponse`] for protocol-level handling.
//!
//! Transport failures (connect refused, DNS, timeout) surface as
//! [`BridgeError::Network`] so callers can tell "offline" apart from an HTTP
//! error status. The shelf aggregator keys its offline-cache fallback on
//! exactly that distinction.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based [`HttpClient`] with connection pooling and rustls TLS.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with a 30 second request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with a custom request timeout.
    ///
    /// Per-request timeouts on [`HttpRequest`] still override this; the
    /// Zotero connector relies on that for long attachment downloads.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("zotero-shelf-core/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wraps an externally configured `reqwest::Client`.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(Self::convert_method(request.method), &request.url);

        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder
    }

    fn classify_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Network("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::Network(format!("Connection failed: {}", e))
        } else if e.is_request() && e.url().is_some() {
            // DNS and proxy resolution failures land here
            BridgeError::Network(e.to_string())
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Delay before the next attempt, given how many attempts have completed.
    fn backoff_delay(policy: &RetryPolicy, completed_attempts: u32) -> Duration {
        if policy.use_exponential_backoff {
            let doubled = policy.base_delay * 2u32.pow(completed_attempts.saturating_sub(1));
            doubled.min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }

    async fn send_with_retries(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts {
            debug!(
                attempt,
                max_attempts = policy.max_attempts,
                url = %request.url,
                "Sending HTTP request"
            );

            match self.build_request(request.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status >= 500 || status == 429 {
                        warn!(status, attempt, "Retryable HTTP status");
                        last_error =
                            Some(BridgeError::OperationFailed(format!("HTTP {} error", status)));
                    } else {
                        return Self::into_response(response).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    last_error = Some(Self::classify_send_error(e));
                }
            }

            if attempt < policy.max_attempts {
                let delay = Self::backoff_delay(&policy, attempt);
                debug!(delay_ms = delay.as_millis(), "Backing off before retry");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.send_with_retries(request, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_constructs_with_defaults() {
        let _client = ReqwestHttpClient::default();
    }

    #[test]
    fn test_method_conversion_covers_all_verbs() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Delete),
            reqwest::Method::DELETE
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Head),
            reqwest::Method::HEAD
        );
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            use_exponential_backoff: true,
        };

        let delays: Vec<u64> = (1..=4)
            .map(|n| ReqwestHttpClient::backoff_delay(&policy, n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 250, 250]);
    }

    #[test]
    fn test_constant_backoff_when_exponential_disabled() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            use_exponential_backoff: false,
        };

        assert_eq!(
            ReqwestHttpClient::backoff_delay(&policy, 1),
            Duration::from_millis(50)
        );
        assert_eq!(
            ReqwestHttpClient::backoff_delay(&policy, 2),
            Duration::from_millis(50)
        );
    }
}
