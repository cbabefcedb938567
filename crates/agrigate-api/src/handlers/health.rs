//! Liveness endpoint. Also reports whether the model provider is
//! reachable; the server itself stays `ok` either way.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.gateway.provider_healthy().await;
    Json(serde_json::json!({
        "status": "ok",
        "provider": provider,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
