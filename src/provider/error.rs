//! Provider error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    #[error("failed to parse response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("response contained no message")]
    EmptyResponse,
}

impl ProviderError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }
}
