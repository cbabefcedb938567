//! Bearer-token authentication.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use tracing::{debug, warn};

use agrigate_core::defaults;
use agrigate_core::{AuthPrincipal, Result, TokenVerifier};

use crate::error::ApiError;
use crate::state::AppState;

pub const MSG_AUTH_REQUIRED: &str = "Authentication required";
pub const MSG_INVALID_TOKEN: &str = "Invalid or expired token";

/// Fixed token table, read from `AUTH_TOKENS` as `token:user_id,...`.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Parse `token:user_id` pairs separated by commas. Malformed entries
    /// are skipped.
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once(':') {
                    Some((token, user_id)) if !token.trim().is_empty() && !user_id.trim().is_empty() => {
                        Some((token.trim().to_string(), user_id.trim().to_string()))
                    }
                    _ => {
                        warn!("Ignoring malformed {} entry", defaults::ENV_AUTH_TOKENS);
                        None
                    }
                }
            })
            .collect();
        Self { tokens }
    }

    pub fn from_env() -> Self {
        let verifier = Self::parse(&std::env::var(defaults::ENV_AUTH_TOKENS).unwrap_or_default());
        if verifier.is_empty() {
            warn!(
                "{} is empty; every chat request will be rejected",
                defaults::ENV_AUTH_TOKENS
            );
        }
        verifier
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<AuthPrincipal>> {
        Ok(self.tokens.get(token).map(|user_id| AuthPrincipal {
            user_id: user_id.clone(),
        }))
    }
}

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub principal: AuthPrincipal,
}

impl RequireAuth {
    /// Reject access to another user's data.
    pub fn ensure_user(&self, user_id: &str) -> std::result::Result<(), ApiError> {
        if user_id.is_empty() || user_id == self.principal.user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Access to another user's chat is not allowed".to_string(),
            ))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(MSG_AUTH_REQUIRED.to_string()))?;

        match state.verifier.verify(token).await {
            Ok(Some(principal)) => {
                debug!(user_id = %principal.user_id, "Request authenticated");
                Ok(RequireAuth { principal })
            }
            Ok(None) => Err(ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string())),
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                Err(ApiError::Internal("Token verification failed".to_string()))
            }
        }
    }
}
