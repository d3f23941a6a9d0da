//! Error types for wxsentry.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in wxsentry operations.
#[derive(Error, Debug)]
pub enum WxsentryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an error status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Required API key is not configured.
    /// Terminal for the current fetch cycle; never retried automatically.
    #[error("Missing API key: {0}")]
    MissingKey(&'static str),

    /// Every transport strategy failed; carries the direct attempt's reason
    #[error("All transports failed for {url}: {reason}")]
    TransportExhausted { url: String, reason: String },
}
