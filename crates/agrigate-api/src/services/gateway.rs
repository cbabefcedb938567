//! Chat request orchestration.
//!
//! [`Gateway::handle`] validates a request, analyzes an attached image,
//! composes the final prompt, and forwards it to the chat session, charging
//! one unit of upstream budget per provider call. Every failure leaving the
//! gateway is a normalized domain error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use agrigate_core::defaults;
use agrigate_core::normalize::MSG_TIMEOUT;
use agrigate_core::{
    compose, validate_image_ref, BudgetConfig, ChatBackend, ChatTurn, Error, HistoryEntry,
    HistoryStore, ImagePayload, Result, Scope, UpstreamBudget, VisionBackend,
};
use agrigate_inference::{RetryPolicy, SessionConfig, SessionManager, VisionAnalyzer};

pub const MSG_MISSING_CONTENT: &str = "Message or image is required";
pub const DETAILS_MISSING_CONTENT: &str = "Please provide either a message or an image";
pub const MSG_MISSING_USER: &str = "User ID is required";
pub const DETAILS_MISSING_USER: &str = "Please provide a valid user ID";

/// Client-facing hint for a validation failure.
pub fn rejection_details(message: &str) -> &str {
    match message {
        MSG_MISSING_CONTENT => DETAILS_MISSING_CONTENT,
        MSG_MISSING_USER => DETAILS_MISSING_USER,
        other => other,
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub user_id: String,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub budget: BudgetConfig,
    pub sessions: SessionConfig,
    pub retry: RetryPolicy,
    /// Deadline for one whole `handle` call.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            sessions: SessionConfig::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var(defaults::ENV_REQUEST_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::REQUEST_TIMEOUT_SECS);
        Self {
            budget: BudgetConfig::from_env(),
            sessions: SessionConfig::from_env(),
            retry: RetryPolicy::from_env(),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Owns the upstream budget, the vision analyzer, and the chat sessions.
pub struct Gateway {
    budget: UpstreamBudget,
    vision: VisionAnalyzer,
    sessions: Arc<SessionManager>,
    history: Arc<dyn HistoryStore>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        vision: Arc<dyn VisionBackend>,
        history: Arc<dyn HistoryStore>,
        config: GatewayConfig,
    ) -> Self {
        info!(
            subsystem = "api",
            component = "gateway",
            chat_model = %chat.model_name(),
            vision_model = %vision.model_name(),
            budget = config.budget.max_requests,
            budget_window_secs = config.budget.window.as_secs(),
            budget_scope = ?config.budget.scope,
            session_scope = ?config.sessions.scope,
            session_max_turns = config.sessions.max_turns,
            request_timeout_secs = config.request_timeout.as_secs(),
            "Gateway initialized"
        );
        Self {
            budget: UpstreamBudget::new(config.budget),
            vision: VisionAnalyzer::new(vision, config.retry),
            sessions: Arc::new(SessionManager::new(chat, config.sessions)),
            history,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Budget units left for `user_id` in the current window.
    pub fn remaining_budget(&self, user_id: &str) -> usize {
        self.budget.remaining(user_id)
    }

    /// Whether the upstream provider answers its health probe. Probe
    /// errors count as unhealthy.
    pub async fn provider_healthy(&self) -> bool {
        match self.vision.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(
                    subsystem = "api",
                    component = "gateway",
                    op = "health_check",
                    error = %e,
                    "Provider health check failed"
                );
                false
            }
        }
    }

    /// Answer one chat request.
    pub async fn handle(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.request_timeout, self.process(request)).await;

        let (text, image, reply) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                let err = e.normalize();
                warn!(
                    subsystem = "api",
                    component = "gateway",
                    op = "handle",
                    user_id = %request.user_id,
                    error_kind = %err.kind(),
                    error = %err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Chat request failed"
                );
                return Err(err);
            }
            Err(_) => {
                warn!(
                    subsystem = "api",
                    component = "gateway",
                    op = "handle",
                    user_id = %request.user_id,
                    timeout_secs = self.config.request_timeout.as_secs(),
                    "Chat request exceeded deadline"
                );
                return Err(Error::UpstreamTimeout(MSG_TIMEOUT.to_string()));
            }
        };

        self.record(&request.user_id, text, image, &reply).await;

        info!(
            subsystem = "api",
            component = "gateway",
            op = "handle",
            user_id = %request.user_id,
            response_len = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat request complete"
        );
        Ok(reply)
    }

    async fn process(
        &self,
        request: &ChatRequest,
    ) -> Result<(String, Option<ImagePayload>, String)> {
        let message = request.message.as_deref().filter(|m| !m.is_empty());
        let image_ref = request.image_url.as_deref().filter(|u| !u.is_empty());

        if message.is_none() && image_ref.is_none() {
            return Err(Error::InvalidInput(MSG_MISSING_CONTENT.to_string()));
        }
        if request.user_id.is_empty() {
            return Err(Error::InvalidInput(MSG_MISSING_USER.to_string()));
        }

        debug!(
            subsystem = "api",
            component = "gateway",
            user_id = %request.user_id,
            prompt_len = message.map_or(0, str::len),
            has_image = image_ref.is_some(),
            "Processing chat request"
        );

        let image = validate_image_ref(image_ref)?;

        let text = match &image {
            Some(image) => {
                self.budget.admit(&request.user_id)?;
                let analysis = self.vision.analyze(image).await?;
                compose(message, Some(analysis.as_str()))
            }
            None => compose(message, None),
        };

        self.budget.admit(&request.user_id)?;
        let reply = self
            .sessions
            .send(&request.user_id, &text, image.as_ref())
            .await?;

        Ok((text, image, reply))
    }

    /// Best-effort transcript write; failures are logged only.
    async fn record(&self, user_id: &str, text: String, image: Option<ImagePayload>, reply: &str) {
        let entries = vec![
            HistoryEntry::from_turn(&ChatTurn::user(text, image)),
            HistoryEntry::from_turn(&ChatTurn::model(reply)),
        ];
        if let Err(e) = self.history.append(user_id, entries).await {
            warn!(
                subsystem = "api",
                component = "gateway",
                op = "record_history",
                user_id = %user_id,
                error = %e,
                "Failed to record chat history"
            );
        }
    }

    /// Clear a user's transcript. In per-user session scope the user's
    /// chat session is reset as well.
    pub async fn clear_history(&self, user_id: &str) -> Result<()> {
        self.history.clear(user_id).await?;
        if self.sessions.scope() == Scope::PerUser {
            self.sessions.reset(user_id).await;
        }
        Ok(())
    }
}
