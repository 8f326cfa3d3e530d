//! Error types for the observer client.

use std::time::Duration;

/// Observer API errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Token missing, invalid or expired.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure or 5xx.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body did not have the expected shape.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Whether the request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
