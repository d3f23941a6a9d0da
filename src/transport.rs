//! Transport strategies for direct external calls.
//!
//! The CWA open-data endpoints are fetched directly first; on any failure
//! (network-level or non-2xx) the same logical request is retried once
//! through a public CORS relay with a cache-busting parameter. Strategies
//! are an ordered list behind a trait so the relay can be swapped without
//! touching call sites.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::WxsentryError;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("wxsentry/", env!("CARGO_PKG_VERSION"));

/// Public CORS relay used as the sole fallback transport.
const DEFAULT_RELAY_URL: &str = "https://api.allorigins.win/raw";

/// One way of reaching a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the logical URL, returning the response body on 2xx.
    async fn fetch(&self, client: &Client, url: &str) -> Result<String, WxsentryError>;
}

/// Plain GET against the original URL.
#[derive(Debug, Default)]
pub struct DirectTransport;

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, client: &Client, url: &str) -> Result<String, WxsentryError> {
        get_body(client, url).await
    }
}

/// GET through a CORS relay, original URL embedded as a query parameter.
#[derive(Debug)]
pub struct ProxyTransport {
    relay_url: String,
}

impl ProxyTransport {
    #[must_use]
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
        }
    }

    /// Build the relayed URL: `<relay>?url=<encoded original>&t=<token>`.
    pub fn proxied_url(&self, original: &str, token: i64) -> Result<String, WxsentryError> {
        let token = token.to_string();
        let url = Url::parse_with_params(
            &self.relay_url,
            &[("url", original), ("t", token.as_str())],
        )
        .map_err(|e| WxsentryError::InvalidResponse(format!("bad relay URL: {e}")))?;
        Ok(url.into())
    }
}

impl Default for ProxyTransport {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_URL)
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn fetch(&self, client: &Client, url: &str) -> Result<String, WxsentryError> {
        let relayed = self.proxied_url(url, Utc::now().timestamp_millis())?;
        get_body(client, &relayed).await
    }
}

/// Shared GET with status check before returning the body.
async fn get_body(client: &Client, url: &str) -> Result<String, WxsentryError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WxsentryError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response.text().await?)
}

/// Ordered list of transport strategies tried in sequence.
///
/// This is a binary direct→proxy escalation, not a resilience framework:
/// no backoff, no circuit breaking, one pass through the list.
pub struct TransportResolver {
    client: Client,
    strategies: Vec<Box<dyn Transport>>,
}

impl TransportResolver {
    /// Create a resolver with the default direct→proxy strategy order.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, WxsentryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::with_strategies(
            client,
            vec![
                Box::new(DirectTransport),
                Box::new(ProxyTransport::default()),
            ],
        ))
    }

    /// Create a resolver with an explicit strategy list.
    #[must_use]
    pub fn with_strategies(client: Client, strategies: Vec<Box<dyn Transport>>) -> Self {
        Self { client, strategies }
    }

    /// Fetch and deserialize a JSON document, escalating through the
    /// strategy list on failure.
    ///
    /// # Errors
    ///
    /// Returns [`WxsentryError::TransportExhausted`] carrying the first
    /// (direct) failure's description when every strategy fails, or a parse
    /// error if a strategy succeeded but the body is not valid JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, WxsentryError> {
        let mut first_failure: Option<String> = None;

        for strategy in &self.strategies {
            match strategy.fetch(&self.client, url).await {
                Ok(body) => {
                    debug!("fetched {} bytes via {}", body.len(), strategy.name());
                    return Ok(serde_json::from_str(&body)?);
                }
                Err(e) => {
                    warn!("{} transport failed: {}", strategy.name(), e);
                    if first_failure.is_none() {
                        first_failure = Some(e.to_string());
                    }
                }
            }
        }

        Err(WxsentryError::TransportExhausted {
            url: url.to_string(),
            reason: first_failure.unwrap_or_else(|| "no transport strategies".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct FailingTransport {
        reason: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for FailingTransport {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch(&self, _client: &Client, _url: &str) -> Result<String, WxsentryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(WxsentryError::InvalidResponse(self.reason.to_string()))
        }
    }

    struct CannedTransport {
        body: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, _client: &Client, _url: &str) -> Result<String, WxsentryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.to_string())
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_proxied_url_embeds_original_and_token() {
        let proxy = ProxyTransport::default();
        let url = proxy
            .proxied_url("https://opendata.cwa.gov.tw/api?Authorization=key", 1234)
            .expect("failed to build proxied URL");

        assert!(url.starts_with("https://api.allorigins.win/raw?url="));
        assert!(url.contains("url=https%3A%2F%2Fopendata.cwa.gov.tw%2Fapi%3FAuthorization%3Dkey"));
        assert!(url.contains("t=1234"));
    }

    #[tokio::test]
    async fn test_fallback_attempted_exactly_once_after_direct_failure() {
        let direct_calls = counter();
        let proxy_calls = counter();

        let resolver = TransportResolver::with_strategies(
            Client::new(),
            vec![
                Box::new(FailingTransport {
                    reason: "connection refused",
                    calls: direct_calls.clone(),
                }),
                Box::new(CannedTransport {
                    body: r#"{"ok": true}"#,
                    calls: proxy_calls.clone(),
                }),
            ],
        );

        let value: serde_json::Value = resolver
            .fetch_json("https://example.invalid/data")
            .await
            .expect("fallback should succeed");

        assert_eq!(value["ok"], true);
        assert_eq!(direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(proxy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_error_carries_direct_failure_reason() {
        let resolver = TransportResolver::with_strategies(
            Client::new(),
            vec![
                Box::new(FailingTransport {
                    reason: "connection refused",
                    calls: counter(),
                }),
                Box::new(FailingTransport {
                    reason: "relay down",
                    calls: counter(),
                }),
            ],
        );

        let err = resolver
            .fetch_json::<serde_json::Value>("https://example.invalid/data")
            .await
            .expect_err("all strategies fail");

        let msg = err.to_string();
        assert!(msg.contains("https://example.invalid/data"));
        assert!(msg.contains("connection refused"));
        assert!(!msg.contains("relay down"));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let second_calls = counter();

        let resolver = TransportResolver::with_strategies(
            Client::new(),
            vec![
                Box::new(CannedTransport {
                    body: "[1, 2, 3]",
                    calls: counter(),
                }),
                Box::new(CannedTransport {
                    body: "[]",
                    calls: second_calls.clone(),
                }),
            ],
        );

        let value: Vec<i32> = resolver
            .fetch_json("https://example.invalid/data")
            .await
            .expect("first strategy succeeds");

        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }
}
