//! View-model error types.

use sigdash_client::ClientError;
use sigdash_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Another operation of the same kind is still running.
    #[error("Busy: {0}")]
    Busy(&'static str),

    #[error("Preference store error: {0}")]
    Preferences(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CoreError> for ViewError {
    fn from(e: CoreError) -> Self {
        Self::Client(e.into())
    }
}

impl ViewError {
    /// Whether the action was refused before any network call.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Client(e) => e.is_validation(),
            _ => false,
        }
    }
}

pub type ViewResult<T> = Result<T, ViewError>;
