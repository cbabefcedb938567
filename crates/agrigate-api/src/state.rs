//! Shared application state.

use std::sync::Arc;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, RateLimiter};

use agrigate_core::TokenVerifier;

use crate::config::ServerConfig;
use crate::services::Gateway;

/// Global rate limiter type (direct quota, no keyed bucketing).
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub config: Arc<ServerConfig>,
    /// Ingress throttle (None if disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(
        gateway: Arc<Gateway>,
        verifier: Arc<dyn TokenVerifier>,
        config: ServerConfig,
    ) -> Self {
        let rate_limiter = crate::middleware::rate_limit::build_limiter(config.ingress_limit);
        Self {
            gateway,
            verifier,
            config: Arc::new(config),
            rate_limiter,
        }
    }
}
