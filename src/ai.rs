//! AI bulletin generation via the Gemini `generateContent` endpoint.
//!
//! Generation degrades, never fails: on timeout, transport error, missing
//! key, or an empty candidate list the caller gets the forecaster-written
//! overview verbatim, or a generic fallback line when no overview exists.

use std::time::Duration;

use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::WxsentryError;
use crate::models::{CityForecast, GeminiRequest, GeminiResponse};

/// Hard bound on one generation call.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Gemini API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Shown when generation fails and no overview text exists.
const GENERIC_FALLBACK: &str = "AI 分析暫時無法使用，請參考各縣市預報數據。";

/// Shown when no Gemini key is configured.
const MISSING_KEY_NOTE: &str = "未設定 Gemini API Key，僅顯示原始預報資料。";

/// Client for Gemini narrative generation.
pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AiClient {
    /// Create a client. A missing key is tolerated here; [`Self::generate`]
    /// degrades to raw data instead of erroring.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, WxsentryError> {
        let client = Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .user_agent(concat!("wxsentry/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate an hourly bulletin from the overview and city observations.
    ///
    /// Always returns a displayable, non-empty string. Failures are logged
    /// and degrade to [`fallback_text`].
    pub async fn generate(&self, overview: &str, cities: &[CityForecast]) -> String {
        let Some(api_key) = &self.api_key else {
            warn!("no Gemini API key configured, skipping generation");
            if overview.is_empty() {
                return MISSING_KEY_NOTE.to_string();
            }
            return overview.to_string();
        };

        let prompt = build_prompt(overview, cities);
        debug!("prompt length: {} chars", prompt.chars().count());

        match timeout(GENERATION_TIMEOUT, self.request(api_key, prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!("generation returned empty candidate text");
                fallback_text(overview)
            }
            Ok(Err(e)) => {
                // Never echo the key if it leaked into the error text
                warn!("generation failed: {}", redact_key(&e.to_string()));
                fallback_text(overview)
            }
            Err(_) => {
                warn!(
                    "generation timed out after {}s",
                    GENERATION_TIMEOUT.as_secs()
                );
                fallback_text(overview)
            }
        }
    }

    async fn request(&self, api_key: &str, prompt: String) -> Result<String, WxsentryError> {
        let url = format!("{}/{}:generateContent?key={}", self.base_url, self.model, api_key);
        let body = GeminiRequest::from_prompt(prompt);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WxsentryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        Ok(parsed.first_text().unwrap_or_default().to_string())
    }
}

/// Build the generation prompt: forecaster register, no greetings, leads
/// with the dominant weather system, short-term guidance, 100-150 chars.
#[must_use]
pub fn build_prompt(overview: &str, cities: &[CityForecast]) -> String {
    let cities_summary: Vec<String> = cities
        .iter()
        .map(|c| {
            format!(
                "{}: 天氣{}, 氣溫{}-{}度, 降雨機率{}%",
                c.name, c.wx, c.min_t, c.max_t, c.pop
            )
        })
        .collect();

    let mut prompt = String::from(
        "你現在是一位專業且精準的氣象分析師。請根據以下資料撰寫最新的整點氣象快訊。\n\
         \n\
         【嚴格要求】:\n\
         1. 絕對不要使用任何寒暄語或開場白。\n\
         2. 直接切入天氣重點。\n\
         3. 語氣簡潔有力但保有專業度。\n\
         4. 請根據數據指出目前受什麼天氣系統（如東北季風、鋒面）影響。\n\
         5. 針對接下來 1-3 小時給出簡單的穿著或攜帶雨具建議。\n\
         6. 字數約 100-150 字。\n",
    );

    if !overview.is_empty() {
        prompt.push_str("\n【天氣概況】:\n");
        prompt.push_str(overview);
        prompt.push('\n');
    }

    prompt.push_str("\n【觀測數據】:\n");
    prompt.push_str(&cities_summary.join("\n"));
    prompt
}

/// Degraded bulletin: the overview verbatim, or a generic line without it.
#[must_use]
pub fn fallback_text(overview: &str) -> String {
    if overview.is_empty() {
        GENERIC_FALLBACK.to_string()
    } else {
        overview.to_string()
    }
}

/// Strip anything after a `?key=` marker from an error string.
fn redact_key(message: &str) -> &str {
    message.split("?key=").next().unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_city() -> CityForecast {
        CityForecast {
            name: "臺北市".to_string(),
            wx: "多雲時晴".to_string(),
            pop: "20".to_string(),
            min_t: "18".to_string(),
            max_t: "26".to_string(),
        }
    }

    #[test]
    fn test_prompt_includes_city_summary_without_overview() {
        let prompt = build_prompt("", &[sample_city()]);
        assert!(prompt.contains("臺北市: 天氣多雲時晴, 氣溫18-26度, 降雨機率20%"));
        assert!(!prompt.contains("【天氣概況】"));
    }

    #[test]
    fn test_prompt_includes_overview_when_present() {
        let prompt = build_prompt("鋒面通過。", &[sample_city()]);
        assert!(prompt.contains("【天氣概況】"));
        assert!(prompt.contains("鋒面通過。"));
        assert!(prompt.contains("【觀測數據】"));
    }

    #[test]
    fn test_fallback_prefers_overview_verbatim() {
        assert_eq!(fallback_text("東北季風影響。"), "東北季風影響。");
        assert_eq!(fallback_text(""), GENERIC_FALLBACK);
        assert!(!fallback_text("").is_empty());
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(
            redact_key("error for url (https://host/x?key=secret)"),
            "error for url (https://host/x"
        );
        assert_eq!(redact_key("plain error"), "plain error");
    }

    #[tokio::test]
    async fn test_generate_without_key_returns_displayable_string() {
        let client = AiClient::new(None, "gemini-1.5-flash").expect("client init");

        let report = client.generate("東北季風影響。", &[sample_city()]).await;
        assert_eq!(report, "東北季風影響。");

        let report = client.generate("", &[sample_city()]).await;
        assert!(!report.is_empty());
    }

    #[tokio::test]
    async fn test_generate_degrades_on_transport_failure() {
        // Unroutable base URL: the request errors and generation degrades
        let client = AiClient::new(Some("test-key".to_string()), "gemini-1.5-flash")
            .expect("client init")
            .with_base_url("http://127.0.0.1:1/v1beta/models");

        let report = client.generate("鋒面通過。", &[sample_city()]).await;
        assert_eq!(report, "鋒面通過。");

        let report = client.generate("", &[]).await;
        assert_eq!(report, GENERIC_FALLBACK);
    }
}
