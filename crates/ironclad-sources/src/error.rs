//! Error types for source adapters

use thiserror::Error;

/// Errors that can occur while fetching from a backend
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body returned by the backend
        message: String,
    },

    /// Credentials were rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SourceError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;
