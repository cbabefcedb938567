//! Ingress throttle in front of every route.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use governor::{Quota, RateLimiter};
use tracing::{info, warn};

use crate::config::IngressLimit;
use crate::state::{AppState, GlobalRateLimiter};

/// Build the throttle, or `None` when disabled or misconfigured.
pub fn build_limiter(limit: Option<IngressLimit>) -> Option<Arc<GlobalRateLimiter>> {
    let Some(limit) = limit else {
        info!("Rate limiting: disabled");
        return None;
    };
    let burst = NonZeroU32::new(limit.requests)?;
    let Some(quota) = Quota::with_period(limit.period / limit.requests) else {
        warn!("Rate limit period too small, rate limiting disabled");
        return None;
    };
    info!(
        "Rate limiting: enabled ({} requests per {} seconds)",
        limit.requests,
        limit.period.as_secs()
    );
    Some(Arc::new(RateLimiter::direct(quota.allow_burst(burst))))
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // If rate limiting is disabled, pass through
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}
