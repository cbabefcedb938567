//! Chat HTTP handlers.
//!
//! `POST /api/chat` answers a message (optionally with an image),
//! `POST /api/chat/image` turns an uploaded file into an inline image
//! reference, and `/api/chat/history/:user_id` reads or clears a
//! user's transcript.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use agrigate_core::{validate_upload, HistoryEntry};

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::services::ChatRequest;
use crate::state::AppState;

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    /// `data:<mime>;base64,<data>` reference accepted by `POST /api/chat`.
    pub data_url: String,
    pub mime_type: String,
    /// Size of the uploaded file in bytes.
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// Answer a chat message.
///
/// # Returns
/// - 200 OK with `{ reply }`
/// - 400 Bad Request for invalid input
/// - 401 Unauthorized without a valid bearer token
/// - 403 Forbidden if `userId` is not the authenticated user
/// - 500 with `{ error, kind, details }` for provider failures
pub async fn chat(
    State(state): State<AppState>,
    auth: RequireAuth,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    auth.ensure_user(&request.user_id)?;

    let reply = state
        .gateway
        .handle(&request)
        .await
        .map_err(|e| ApiError::from_gateway(e, state.config.is_development()))?;

    Ok(Json(ChatResponse { reply }))
}

/// Accept an image upload and return it as an inline data reference.
pub async fn upload_image(
    _auth: RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let declared = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        let image = validate_upload(&bytes, declared.as_deref())
            .map_err(|e| ApiError::bad_request(e.message()))?;

        info!(
            subsystem = "api",
            component = "chat",
            op = "upload_image",
            mime_type = %image.mime_type(),
            size = bytes.len(),
            "Image upload accepted"
        );

        return Ok(Json(UploadImageResponse {
            data_url: image.to_data_url(),
            mime_type: image.mime_type().to_string(),
            size: bytes.len(),
        }));
    }

    Err(ApiError::bad_request(format!(
        "Missing '{}' file field",
        UPLOAD_FIELD
    )))
}

/// Get a user's chat transcript.
pub async fn get_history(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    auth.ensure_user(&user_id)?;
    let history = state.gateway.history().history(&user_id).await.map_err(|e| {
        warn!(user_id = %user_id, error = %e, "Failed to fetch chat history");
        ApiError::Internal("Failed to fetch chat history".to_string())
    })?;
    Ok(Json(HistoryResponse { history }))
}

/// Clear a user's chat transcript.
pub async fn delete_history(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.ensure_user(&user_id)?;
    state.gateway.clear_history(&user_id).await.map_err(|e| {
        warn!(user_id = %user_id, error = %e, "Failed to clear chat history");
        ApiError::Internal("Failed to clear chat history".to_string())
    })?;
    Ok(Json(serde_json::json!({ "success": true })))
}
