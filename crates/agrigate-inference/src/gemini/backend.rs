//! Gemini REST inference backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use agrigate_core::defaults;
use agrigate_core::{
    ChatBackend, ChatTurn, Error, GenerationConfig, ImagePayload, Result, Role, SafetySetting,
    VisionBackend,
};

use super::error::{from_status, from_transport};
use super::types::*;

/// Header carrying the API key, so it never appears in a URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL including the API version segment.
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Model used for chat sessions.
    pub chat_model: String,
    /// Model used for image analysis.
    pub vision_model: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            api_key: String::new(),
            chat_model: defaults::GEMINI_CHAT_MODEL.to_string(),
            vision_model: defaults::GEMINI_VISION_MODEL.to_string(),
            timeout_seconds: defaults::GEMINI_TIMEOUT_SECS,
        }
    }
}

impl GeminiConfig {
    /// Create from environment variables. `GEMINI_API_KEY` is required.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(defaults::ENV_GEMINI_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::AuthenticationFailed(format!(
                    "{} is not set. Get an API key from https://ai.google.dev/",
                    defaults::ENV_GEMINI_API_KEY
                ))
            })?;

        Ok(Self {
            base_url: std::env::var(defaults::ENV_GEMINI_BASE_URL)
                .unwrap_or_else(|_| defaults::GEMINI_BASE_URL.to_string()),
            api_key,
            chat_model: std::env::var(defaults::ENV_GEMINI_CHAT_MODEL)
                .unwrap_or_else(|_| defaults::GEMINI_CHAT_MODEL.to_string()),
            vision_model: std::env::var(defaults::ENV_GEMINI_VISION_MODEL)
                .unwrap_or_else(|_| defaults::GEMINI_VISION_MODEL.to_string()),
            timeout_seconds: std::env::var(defaults::ENV_GEMINI_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GEMINI_TIMEOUT_SECS),
        })
    }
}

/// Gemini backend serving both chat and vision requests.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Create a new Gemini backend with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Unknown(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            url = %config.base_url,
            chat_model = %config.chat_model,
            vision_model = %config.vision_model,
            timeout_secs = config.timeout_seconds,
            "Initializing Gemini backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn model_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}:generateContent", self.model_url(model));
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Upstream(from_transport(e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upstream(from_transport(e)))?;

        if !status.is_success() {
            let err = from_status(status.as_u16(), &body);
            warn!(
                subsystem = "inference",
                component = "gemini",
                op = "generate_content",
                model = %model,
                status = status.as_u16(),
                error = %err.message,
                duration_ms = start.elapsed().as_millis() as u64,
                "Gemini request failed"
            );
            return Err(Error::Upstream(err));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate_content",
            model = %model,
            candidates = parsed.candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini request complete"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        turn: &ChatTurn,
        config: &GenerationConfig,
        safety: &[SafetySetting],
    ) -> Result<String> {
        let contents = history
            .iter()
            .chain(std::iter::once(turn))
            .map(Content::from_turn)
            .collect();

        let request = GenerateContentRequest {
            contents,
            generation_config: *config,
            safety_settings: safety.to_vec(),
        };

        let response = self
            .generate_content(&self.config.chat_model, &request)
            .await?;

        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => Err(Error::InvalidResponse(match response.block_reason() {
                Some(reason) => format!("Response blocked: {}", reason),
                None => "Gemini returned no text".to_string(),
            })),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    async fn describe_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Role::User.as_str().to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::from_image(image),
                ],
            }],
            generation_config: *config,
            safety_settings: Vec::new(),
        };

        let response = self
            .generate_content(&self.config.vision_model, &request)
            .await?;

        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidResponse("Invalid analysis response format".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.model_url(&self.config.vision_model))
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("Gemini health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Gemini health check error: {}", e.without_url());
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.config.vision_model
    }
}
