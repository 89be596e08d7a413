use crudstack_core::ValidationErrors;
use thiserror::Error;

/// Failure of a call against the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// 422 with a structured field error map.
    #[error("{}", .0.message)]
    Validation(ValidationErrors),
    #[error("resource not found")]
    NotFound,
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ClientError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// 401/419: no (or an expired) session.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Status { status: 401 | 419, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
