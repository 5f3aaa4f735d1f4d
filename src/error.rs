use reqwest::StatusCode;

use crate::models::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} has not been saved yet")]
    PendingId(EntityId),

    #[error("Card {0} already has a pending completion")]
    CompletionPending(EntityId),
}

impl AppError {
    /// Map a non-success status and its body to an error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => AppError::NotFound,
            StatusCode::UNAUTHORIZED => AppError::Unauthorized,
            StatusCode::BAD_REQUEST => AppError::BadRequest(body),
            _ => AppError::Status { status, body },
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
