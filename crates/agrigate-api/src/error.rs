//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use agrigate_core::{Error, ErrorKind};

use crate::services::gateway::rejection_details;

/// `error` field of a failed chat response.
pub const MSG_CHAT_FAILED: &str = "Failed to process message";

/// Stand-in for `details` outside development.
pub const MSG_DETAILS_HIDDEN: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{error}")]
    BadRequest { error: String, details: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// A chat request failed after validation.
    #[error("{kind}: {details}")]
    Chat { kind: ErrorKind, details: String },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a gateway error. `expose_details` controls whether the error
    /// message reaches the client on 500 responses.
    pub fn from_gateway(err: Error, expose_details: bool) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => {
                let message = err.message();
                ApiError::BadRequest {
                    details: rejection_details(&message).to_string(),
                    error: message,
                }
            }
            kind => ApiError::Chat {
                kind,
                details: if expose_details {
                    err.message()
                } else {
                    MSG_DETAILS_HIDDEN.to_string()
                },
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::BadRequest {
            details: message.clone(),
            error: message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest { error, details } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": error, "details": details }),
            ),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg })),
            ApiError::Chat { kind, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": MSG_CHAT_FAILED,
                    "kind": kind,
                    "details": details,
                }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
