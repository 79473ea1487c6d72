use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::PipelineError;
use crate::infrastructure::logging::scrub_secrets;

/// Errors that can occur when talking to the chat-completions service
#[derive(Error, Debug)]
pub enum ModelApiError {
    /// No credential in the environment
    #[error("Missing credential: environment variable {0} is not set")]
    MissingToken(String),

    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing token (HTTP 401)
    #[error("Invalid token - authentication failed")]
    InvalidToken,

    /// Forbidden - permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Model or route not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Server error (HTTP 5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Request timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Unknown or unexpected status
    #[error("Unexpected status ({0}): {1}")]
    UnknownError(StatusCode, String),
}

impl ModelApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let body = scrub_secrets(&body);
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 => Self::InvalidToken,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimitExceeded(body),
            500..=599 => Self::ServerError(status, body),
            _ => Self::UnknownError(status, body),
        }
    }

    /// Returns true if this error is transient and a later call may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded(_)
                | Self::ServerError(_, _)
                | Self::Timeout(_)
                | Self::NetworkError(_)
        )
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidRequest(_) => Some(400),
            Self::InvalidToken => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimitExceeded(_) => Some(429),
            Self::ServerError(status, _) | Self::UnknownError(status, _) => Some(status.as_u16()),
            Self::MissingToken(_)
            | Self::Timeout(_)
            | Self::NetworkError(_)
            | Self::MalformedResponse(_) => None,
        }
    }
}

impl From<ModelApiError> for PipelineError {
    fn from(err: ModelApiError) -> Self {
        match err {
            ModelApiError::MissingToken(_)
            | ModelApiError::InvalidToken
            | ModelApiError::Forbidden(_) => Self::ServiceAuth(err.to_string()),
            other => Self::ServiceCall {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
