//! The `{success:false, error}` envelope and its status mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use domains::DomainError;

/// Message shown for failures whose details stay in the logs.
pub const GENERIC_FAILURE: &str = "Unable to process request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// `success:false` with HTTP 200, used by ticket lookup.
    pub fn soft(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn invalid_ticket() -> Self {
        Self::bad_request("Invalid Ticket")
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(entity, id) => {
                warn!(entity = %entity, id = %id, "lookup failed");
                Self::bad_request(format!("Invalid {entity}"))
            }
            DomainError::Validation(message) => Self::bad_request(message),
            DomainError::Unauthorized(message) => Self::unauthorized(message),
            DomainError::Conflict(message) => Self::new(StatusCode::CONFLICT, message),
            DomainError::Storage(detail) | DomainError::Internal(detail) => {
                error!(error = %detail, "request failed");
                Self::bad_request(GENERIC_FAILURE)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request("Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
