//! Data models for backend, CWA open-data, and Gemini API payloads.
//!
//! Backend rows are deserialized optimistically: unknown fields are ignored
//! and nullable columns map to `Option`.

use serde::{Deserialize, Serialize};

/// Backend AI configuration, fetched once at startup and read-only after.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    /// AI provider name (e.g. "gemini", "openai", "groq")
    pub ai_provider: String,

    /// Model identifier in use
    pub ai_model: String,
}

/// Per-city forecast values, string-typed as the CWA API delivers them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CityForecast {
    /// City or county name
    pub name: String,

    /// Weather description text (Wx)
    pub wx: String,

    /// Precipitation probability in percent (PoP)
    pub pop: String,

    /// Minimum temperature in °C
    #[serde(rename = "minT")]
    pub min_t: String,

    /// Maximum temperature in °C
    #[serde(rename = "maxT")]
    pub max_t: String,
}

/// Point-in-time weather bundle. Replaced wholesale on each fetch,
/// no merge semantics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherSnapshot {
    /// Forecaster-written synopsis, may be empty
    #[serde(default)]
    pub overview: String,

    /// Per-city forecasts
    #[serde(default)]
    pub cities: Vec<CityForecast>,

    /// AI-generated bulletin text
    #[serde(default)]
    pub ai_report: String,
}

/// Historical hourly forecast row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastRecord {
    pub id: i64,
    pub report_time: Option<String>,
    #[serde(default)]
    pub overview: String,
    pub ai_report: Option<String>,
    pub created_at: Option<String>,
}

/// Severe-weather warning row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarningRecord {
    pub id: i64,
    pub title: String,
    pub issue_time: Option<String>,
    #[serde(default)]
    pub content: String,
    pub affected_areas: Option<String>,
    pub ai_report: Option<String>,
    pub created_at: Option<String>,
}

/// Earthquake report row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EarthquakeRecord {
    pub id: i64,
    pub earthquake_no: Option<String>,
    pub origin_time: Option<String>,
    pub magnitude: Option<f64>,
    pub location: Option<String>,
    #[serde(default)]
    pub content: String,
    pub intensity_summary: Option<String>,
    pub ai_report: Option<String>,
    pub created_at: Option<String>,
}

// ============================================================================
// CWA open-data response structures
// ============================================================================

/// Top-level CWA datastore response.
#[derive(Debug, Clone, Deserialize)]
pub struct CwaResponse {
    #[serde(default)]
    pub records: CwaRecords,
}

/// `records` container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CwaRecords {
    #[serde(default)]
    pub location: Vec<CwaLocation>,
}

/// One forecast location with its weather elements.
#[derive(Debug, Clone, Deserialize)]
pub struct CwaLocation {
    #[serde(rename = "locationName")]
    pub location_name: String,

    #[serde(rename = "weatherElement", default)]
    pub weather_element: Vec<CwaElement>,
}

/// A named weather element; forecast datasets carry `time` slots,
/// the overview dataset carries `elementValue` entries instead.
#[derive(Debug, Clone, Deserialize)]
pub struct CwaElement {
    #[serde(rename = "elementName")]
    pub element_name: String,

    #[serde(default)]
    pub time: Vec<CwaTimeSlot>,

    #[serde(rename = "elementValue", default)]
    pub element_value: Vec<CwaElementValue>,
}

/// One forecast time window.
#[derive(Debug, Clone, Deserialize)]
pub struct CwaTimeSlot {
    pub parameter: CwaParameter,
}

/// Parameter payload of a time slot.
#[derive(Debug, Clone, Deserialize)]
pub struct CwaParameter {
    #[serde(rename = "parameterName")]
    pub parameter_name: String,
}

/// Free-form element value (overview dataset).
#[derive(Debug, Clone, Deserialize)]
pub struct CwaElementValue {
    pub value: String,
}

impl CwaLocation {
    /// First available time-slot value for the named element, or `"-"`.
    #[must_use]
    pub fn first_value(&self, name: &str) -> String {
        self.weather_element
            .iter()
            .find(|e| e.element_name == name)
            .and_then(|e| e.time.first())
            .map_or_else(|| "-".to_string(), |t| t.parameter.parameter_name.clone())
    }

    /// Convert to a [`CityForecast`] using the first slot of each element.
    #[must_use]
    pub fn to_city_forecast(&self) -> CityForecast {
        CityForecast {
            name: self.location_name.clone(),
            wx: self.first_value("Wx"),
            pop: self.first_value("PoP"),
            min_t: self.first_value("MinT"),
            max_t: self.first_value("MaxT"),
        }
    }
}

impl CwaResponse {
    /// Extract the forecaster-written synopsis from the overview dataset.
    ///
    /// Returns an empty string when the `WeatherDescription` element is
    /// absent; downstream AI generation proceeds on the city summary alone.
    #[must_use]
    pub fn overview_text(&self) -> String {
        self.records
            .location
            .first()
            .and_then(|loc| {
                loc.weather_element
                    .iter()
                    .find(|e| e.element_name == "WeatherDescription")
            })
            .and_then(|e| e.element_value.first())
            .map_or_else(String::new, |v| v.value.clone())
    }
}

// ============================================================================
// Gemini generateContent payloads
// ============================================================================

/// Request body for the Gemini `generateContent` endpoint.
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
pub struct GeminiPart {
    pub text: String,
}

impl GeminiRequest {
    /// Single-turn request wrapping one text prompt.
    #[must_use]
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        }
    }
}

/// Response body for the Gemini `generateContent` endpoint.
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiResponsePart {
    #[serde(default)]
    pub text: String,
}

impl GeminiResponse {
    /// Text of the first candidate, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FORECAST: &str = r#"{
        "records": {
            "location": [{
                "locationName": "臺北市",
                "weatherElement": [
                    {"elementName": "Wx", "time": [
                        {"parameter": {"parameterName": "多雲時晴"}},
                        {"parameter": {"parameterName": "晴"}}
                    ]},
                    {"elementName": "PoP", "time": [
                        {"parameter": {"parameterName": "20"}}
                    ]},
                    {"elementName": "MinT", "time": [
                        {"parameter": {"parameterName": "18"}}
                    ]},
                    {"elementName": "MaxT", "time": [
                        {"parameter": {"parameterName": "26"}}
                    ]}
                ]
            }]
        }
    }"#;

    #[test]
    fn test_city_forecast_uses_first_time_slot() {
        let resp: CwaResponse =
            serde_json::from_str(SAMPLE_FORECAST).expect("failed to parse sample");
        let city = resp.records.location[0].to_city_forecast();

        assert_eq!(city.name, "臺北市");
        assert_eq!(city.wx, "多雲時晴");
        assert_eq!(city.pop, "20");
        assert_eq!(city.min_t, "18");
        assert_eq!(city.max_t, "26");
    }

    #[test]
    fn test_missing_element_yields_dash() {
        let json = r#"{
            "records": {"location": [{
                "locationName": "基隆市",
                "weatherElement": [
                    {"elementName": "Wx", "time": [
                        {"parameter": {"parameterName": "陰短暫雨"}}
                    ]}
                ]
            }]}
        }"#;
        let resp: CwaResponse = serde_json::from_str(json).expect("failed to parse");
        let city = resp.records.location[0].to_city_forecast();

        assert_eq!(city.wx, "陰短暫雨");
        assert_eq!(city.pop, "-");
        assert_eq!(city.min_t, "-");
    }

    #[test]
    fn test_overview_text_extraction() {
        let json = r#"{
            "records": {"location": [{
                "locationName": "臺灣",
                "weatherElement": [
                    {"elementName": "WeatherDescription", "elementValue": [
                        {"value": "東北季風影響，北部及東北部天氣較涼。"}
                    ]}
                ]
            }]}
        }"#;
        let resp: CwaResponse = serde_json::from_str(json).expect("failed to parse");
        assert_eq!(resp.overview_text(), "東北季風影響，北部及東北部天氣較涼。");
    }

    #[test]
    fn test_overview_missing_description_is_empty() {
        let resp: CwaResponse =
            serde_json::from_str(SAMPLE_FORECAST).expect("failed to parse sample");
        assert_eq!(resp.overview_text(), "");

        let empty: CwaResponse = serde_json::from_str("{}").expect("failed to parse empty");
        assert_eq!(empty.overview_text(), "");
    }

    #[test]
    fn test_record_rows_tolerate_nulls_and_unknown_fields() {
        let json = r#"{
            "id": 7,
            "title": "陸上強風特報",
            "issue_time": "2025-11-02 10:00:00",
            "content": "東北風明顯偏強",
            "affected_areas": null,
            "ai_report": null,
            "created_at": "2025-11-02T10:05:00",
            "is_reported": true,
            "dataset_id": "W-C0033-002"
        }"#;
        let row: WarningRecord = serde_json::from_str(json).expect("failed to parse warning");
        assert_eq!(row.id, 7);
        assert!(row.ai_report.is_none());
        assert_eq!(row.affected_areas, None);
    }

    #[test]
    fn test_gemini_response_first_text() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "鋒面通過，外出請攜帶雨具。"}], "role": "model"}
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).expect("failed to parse");
        assert_eq!(resp.first_text(), Some("鋒面通過，外出請攜帶雨具。"));

        let empty: GeminiResponse = serde_json::from_str("{}").expect("failed to parse empty");
        assert_eq!(empty.first_text(), None);
    }
}
