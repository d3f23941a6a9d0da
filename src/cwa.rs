//! CWA (Central Weather Administration) open-data client.
//!
//! Direct-call variant: hits the public datastore endpoints through the
//! transport resolver, so a failed direct call falls back to the CORS relay.

use tracing::{debug, instrument};

use crate::errors::WxsentryError;
use crate::models::{CityForecast, CwaLocation, CwaResponse};
use crate::transport::TransportResolver;

/// CWA open-data base URL.
const CWA_BASE_URL: &str = "https://opendata.cwa.gov.tw/api/v1/rest/datastore";

/// Dataset id for the nationwide weather synopsis.
const OVERVIEW_DATASET: &str = "F-A0003-001";

/// Dataset id for 36-hour city/county forecasts.
const FORECAST_DATASET: &str = "F-C0032-001";

/// The 22 cities and counties requested from the forecast dataset.
/// CWA requires the exact official spellings ("臺", not "台").
pub const TARGET_CITIES: [&str; 22] = [
    "基隆市", "臺北市", "新北市", "桃園市", "新竹市", "新竹縣", "苗栗縣", "臺中市",
    "彰化縣", "南投縣", "雲林縣", "嘉義市", "嘉義縣", "臺南市", "高雄市", "屏東縣",
    "宜蘭縣", "花蓮縣", "臺東縣", "澎湖縣", "金門縣", "連江縣",
];

/// Client for CWA open-data forecasts.
pub struct CwaClient {
    resolver: TransportResolver,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for CwaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CwaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CwaClient {
    /// Create a client with the default transport strategy order.
    ///
    /// # Errors
    ///
    /// Returns [`WxsentryError::MissingKey`] if the key is empty, or an
    /// error if the HTTP client cannot be initialized.
    pub fn new(api_key: Option<String>) -> Result<Self, WxsentryError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or(WxsentryError::MissingKey("CWA_API_KEY"))?;

        Ok(Self {
            resolver: TransportResolver::new()?,
            base_url: CWA_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Fetch the forecaster-written nationwide synopsis.
    ///
    /// Returns an empty string when the dataset carries no
    /// `WeatherDescription` element; the caller proceeds without it.
    ///
    /// # Errors
    ///
    /// Returns an error when every transport strategy fails.
    #[instrument(skip(self))]
    pub async fn fetch_overview(&self) -> Result<String, WxsentryError> {
        let url = format!(
            "{}/{}?Authorization={}&format=JSON",
            self.base_url, OVERVIEW_DATASET, self.api_key
        );

        let response: CwaResponse = self.resolver.fetch_json(&url).await?;
        let overview = response.overview_text();
        debug!("overview length: {}", overview.chars().count());
        Ok(overview)
    }

    /// Fetch first-slot forecasts for the target cities.
    ///
    /// # Errors
    ///
    /// Returns an error when every transport strategy fails.
    #[instrument(skip(self))]
    pub async fn fetch_city_forecasts(&self) -> Result<Vec<CityForecast>, WxsentryError> {
        let locations = TARGET_CITIES.join(",");
        let url = format!(
            "{}/{}?Authorization={}&format=JSON&locationName={}",
            self.base_url, FORECAST_DATASET, self.api_key, locations
        );

        let response: CwaResponse = self.resolver.fetch_json(&url).await?;
        let cities: Vec<CityForecast> = response
            .records
            .location
            .iter()
            .map(CwaLocation::to_city_forecast)
            .collect();

        debug!("fetched {} city forecasts", cities.len());
        Ok(cities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_terminal() {
        let err = CwaClient::new(None).expect_err("no key must fail");
        assert!(matches!(err, WxsentryError::MissingKey("CWA_API_KEY")));

        let err = CwaClient::new(Some(String::new())).expect_err("empty key must fail");
        assert!(matches!(err, WxsentryError::MissingKey(_)));
    }

    #[test]
    fn test_target_cities_use_official_spelling() {
        assert_eq!(TARGET_CITIES.len(), 22);
        assert!(TARGET_CITIES.contains(&"臺北市"));
        assert!(!TARGET_CITIES.iter().any(|c| c.contains('台')));
    }
}
