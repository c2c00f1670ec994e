//! Transport error type and its mapping onto [`ApiError`].
use thiserror::Error;

use runtime::{ApiError, StatusCode};

pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    /// Non-success HTTP status, with the server's error message when present.
    #[error("status {code}: {message}")]
    Status { code: StatusCode, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Shutdown was requested before the request could finish.
    #[error("request cancelled")]
    Cancelled,
}

impl HttpError {
    /// Conditions worth another attempt after a short pause.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Status { code, .. } => code.is_retryable(),
            HttpError::Request(error) => error.is_connect() || error.is_timeout(),
            HttpError::Decode(_) | HttpError::Cancelled => false,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Status { code, message } => ApiError::Rejected { code, message },
            HttpError::Request(error) => ApiError::Transport(error.to_string()),
            HttpError::Decode(error) => ApiError::Decode(error.to_string()),
            HttpError::Cancelled => ApiError::Transport("request cancelled".into()),
        }
    }
}
