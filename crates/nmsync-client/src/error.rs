//! Error types for the monitoring API client

use nmsync_api::MissingField;
use thiserror::Error;

/// Errors that can occur when talking to the monitoring service
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed, including timeouts
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Non-success HTTP status without a decodable body
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The service reported an application-level error
    #[error("{0}")]
    Remote(String),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<MissingField> for ClientError {
    fn from(err: MissingField) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
