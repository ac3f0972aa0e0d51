//! Client error types.

use sigdash_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx status with a body.
    #[error("Server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// Refused before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ClientError {
    /// Whether the request never left the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<CoreError> for ClientError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::MalformedResponse(msg) => Self::Malformed(msg),
            CoreError::Json(e) => Self::Malformed(e.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
