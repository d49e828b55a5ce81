use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{sanitizer::Sanitizer, services::RoomError};

/// Message returned for every 5xx response; details only go to the logs.
pub const GENERIC_SERVER_ERROR: &str = "Something went wrong";

/// Standard error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
    /// Filled in by the request ID middleware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo {
                code: code.into(),
                message: message.into(),
                request_id: None,
            },
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    /// The chat platform rejected or never answered a call.
    Upstream(String),
    Database(String),
    Internal(String),
}

impl ApiError {
    /// Convert a service error, logging the sanitized upstream body when the
    /// platform returned one.
    pub fn from_room_error(err: RoomError, sanitizer: &Sanitizer) -> Self {
        if let RoomError::Omnichannel(client_error) = &err
            && let Some(body) = client_error.raw_body()
        {
            tracing::debug!(
                status = ?client_error.status(),
                body = %sanitizer.sanitize_json(body.as_bytes()),
                "Upstream error body"
            );
        }
        err.into()
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound => ApiError::NotFound("Room not found".to_string()),
            RoomError::Validation(msg) => ApiError::BadRequest(msg),
            RoomError::Omnichannel(_) => ApiError::Upstream(err.to_string()),
            RoomError::Storage { .. } => ApiError::Database(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "Omnichannel platform error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    GENERIC_SERVER_ERROR.to_string(),
                )
            }
            ApiError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    GENERIC_SERVER_ERROR.to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    GENERIC_SERVER_ERROR.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
