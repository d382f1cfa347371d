use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn reply(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (status, Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.into(),
        }))
    }
}

/// Everything that can go wrong while serving a collaboration session.
///
/// Only `AuthenticationFailure` ends a connection, and it does so before a
/// session exists. Every other variant is reported to the originating
/// session as an `error` event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollabError {
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("access denied: {0}")]
    AuthorizationDenied(String),

    #[error("note not found: {0}")]
    NotFound(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("not joined to note {0}")]
    NotJoined(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl CollabError {
    /// Stable code carried by the outbound `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            CollabError::AuthenticationFailure(_) => "authentication_failed",
            CollabError::AuthorizationDenied(_) => "forbidden",
            CollabError::NotFound(_) => "not_found",
            CollabError::Conflict(_) => "conflict",
            CollabError::UpstreamFailure(_) => "upstream_failure",
            CollabError::NotJoined(_) => "not_joined",
            CollabError::InvalidEvent(_) => "invalid_event",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CollabError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            CollabError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            CollabError::NotFound(_) => StatusCode::NOT_FOUND,
            CollabError::Conflict(_) => StatusCode::CONFLICT,
            CollabError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            CollabError::NotJoined(_) => StatusCode::CONFLICT,
            CollabError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<CollabError> for (StatusCode, Json<ErrorResponse>) {
    fn from(e: CollabError) -> Self {
        ErrorResponse::reply(e.status_code(), e.to_string())
    }
}
