//! Backend REST client (primary variant).
//!
//! Talks JSON over HTTP to the broadcast backend: config, the current
//! snapshot (read-through or forced regeneration), manual broadcast, and
//! the three paginated historical record feeds.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::errors::WxsentryError;
use crate::models::{SystemConfig, WeatherSnapshot};

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("wxsentry/", env!("CARGO_PKG_VERSION"));

/// Rows per history page.
pub const PAGE_SIZE: usize = 10;

/// The three historical record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Forecasts,
    Warnings,
    Earthquakes,
}

impl RecordKind {
    /// URL path segment for this record kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forecasts => "forecasts",
            Self::Warnings => "warnings",
            Self::Earthquakes => "earthquakes",
        }
    }

    /// Whether the backend exposes a re-report endpoint for this kind.
    /// Forecasts are regenerated wholesale by the hourly job instead.
    #[must_use]
    pub const fn supports_re_report(self) -> bool {
        !matches!(self, Self::Forecasts)
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forecasts" | "forecast" => Ok(Self::Forecasts),
            "warnings" | "warning" => Ok(Self::Warnings),
            "earthquakes" | "earthquake" => Ok(Self::Earthquakes),
            _ => Err(format!(
                "unknown record kind: {s} (expected: forecasts, warnings, earthquakes)"
            )),
        }
    }
}

/// Per-view pagination state.
///
/// End-of-data is a heuristic: a page shorter than `limit` disables forward
/// pagination. No total count is ever fetched.
#[derive(Debug, Clone)]
pub struct Pager {
    pub page: usize,
    pub limit: usize,
    pub query: String,
    last_len: Option<usize>,
}

impl Pager {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            page: 0,
            limit,
            query: String::new(),
            last_len: None,
        }
    }

    /// Row offset for the current page.
    #[must_use]
    pub fn skip(&self) -> usize {
        self.page * self.limit
    }

    /// Start a new search: stores the query and resets to page 0.
    pub fn search(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 0;
        self.last_len = None;
    }

    /// Record how many rows the last fetch returned.
    pub fn record_fetch(&mut self, rows: usize) {
        self.last_len = Some(rows);
    }

    /// Backward pagination is possible (disabled at page 0).
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// Forward pagination is possible (disabled once a short page arrives).
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.last_len.is_some_and(|len| len >= self.limit)
    }

    /// Advance one page if the heuristic allows it.
    pub fn next_page(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page if not already at the first.
    pub fn prev_page(&mut self) -> bool {
        if self.has_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

/// Query-string pairs for a history fetch; `q` only when non-empty.
#[must_use]
pub fn history_query(pager: &Pager) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("limit", pager.limit.to_string()),
        ("skip", pager.skip().to_string()),
    ];
    if !pager.query.is_empty() {
        pairs.push(("q", pager.query.clone()));
    }
    pairs.push(("t", Utc::now().timestamp_millis().to_string()));
    pairs
}

/// Client for the broadcast backend.
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>) -> Result<Self, WxsentryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the backend AI configuration. Called once per invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn fetch_config(&self) -> Result<SystemConfig, WxsentryError> {
        self.get_json(&format!("{}/api/config", self.base_url), &[])
            .await
    }

    /// Fetch the current snapshot.
    ///
    /// `refresh = false` is a read-through of the backend cache; the `t`
    /// cache-bust token defeats intermediary caching only, never the
    /// backend's own cache. `refresh = true` forces regeneration.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn fetch_weather(&self, refresh: bool) -> Result<WeatherSnapshot, WxsentryError> {
        let url = format!("{}/api/weather", self.base_url);
        let token = Utc::now().timestamp_millis().to_string();
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if refresh {
            pairs.push(("refresh", "true".to_string()));
        }
        pairs.push(("t", token));

        self.get_json(&url, &pairs).await
    }

    /// Trigger a broadcast (forced regeneration + voice/text side effect),
    /// then re-read through the cache. The POST response body is not
    /// trusted; the follow-up read is the source of truth.
    ///
    /// # Errors
    ///
    /// Returns an error if either request fails.
    #[instrument(skip(self))]
    pub async fn broadcast(&self) -> Result<WeatherSnapshot, WxsentryError> {
        let url = format!("{}/api/weather/broadcast", self.base_url);
        let response = self.client.post(&url).send().await?;
        Self::check_status(response).await?;

        debug!("broadcast accepted, re-reading snapshot");
        self.fetch_weather(false).await
    }

    /// Fetch one page of historical records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a row cannot be parsed.
    #[instrument(skip(self, pager), fields(kind = kind.as_str(), page = pager.page))]
    pub async fn fetch_records<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        pager: &Pager,
    ) -> Result<Vec<T>, WxsentryError> {
        let url = format!("{}/api/{}", self.base_url, kind.as_str());
        let rows: Vec<T> = self.get_json(&url, &history_query(pager)).await?;
        debug!("fetched {} rows", rows.len());
        Ok(rows)
    }

    /// Ask the backend to regenerate one record's AI annotation.
    ///
    /// Fire-and-forget: the row list is not refreshed afterwards, the user
    /// re-runs the history fetch to see the committed result.
    ///
    /// # Errors
    ///
    /// Returns an error for record kinds without a re-report endpoint, or
    /// if the request fails.
    #[instrument(skip(self), fields(kind = kind.as_str()))]
    pub async fn re_report(&self, kind: RecordKind, id: i64) -> Result<(), WxsentryError> {
        if !kind.supports_re_report() {
            return Err(WxsentryError::InvalidResponse(format!(
                "{} records have no re-report endpoint",
                kind.as_str()
            )));
        }

        let url = format!("{}/api/{}/{}/re-report", self.base_url, kind.as_str(), id);
        let response = self.client.post(&url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        pairs: &[(&str, String)],
    ) -> Result<T, WxsentryError> {
        let response = self.client.get(url).query(pairs).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, WxsentryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WxsentryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}
