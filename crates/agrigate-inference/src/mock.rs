//! Mock inference backend for deterministic testing.
//!
//! Implements both [`ChatBackend`] and [`VisionBackend`] with fixed
//! replies, optional latency, and a scripted queue of failures that are
//! returned, in order, before any success.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agrigate_core::{ImagePayload, UpstreamError, VisionBackend, GenerationConfig};
//! use agrigate_inference::mock::MockBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockBackend::new()
//!         .with_description("Maize leaves look healthy")
//!         .fail_vision_with(UpstreamError::http(503, "unavailable"));
//!
//!     let image = ImagePayload::remote("https://farm.example/maize.jpg");
//!     let config = GenerationConfig::vision();
//!     assert!(backend.describe_image(&image, "Describe", &config).await.is_err());
//!     assert!(backend.describe_image(&image, "Describe", &config).await.is_ok());
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use agrigate_core::{
    ChatBackend, ChatTurn, Error, GenerationConfig, ImagePayload, Result, SafetySetting,
    UpstreamError, VisionBackend,
};

/// Mock backend for testing. Clones share the same call log and scripts.
#[derive(Clone)]
pub struct MockBackend {
    config: Arc<MockConfig>,
    state: Arc<MockState>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    reply: String,
    description: String,
    latency_ms: u64,
    healthy: bool,
}

#[derive(Default)]
struct MockState {
    chat_failures: Mutex<VecDeque<Error>>,
    vision_failures: Mutex<VecDeque<Error>>,
    chat_calls: Mutex<Vec<ChatCall>>,
    vision_calls: Mutex<Vec<VisionCall>>,
}

/// A recorded `generate_reply` call.
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub history: Vec<ChatTurn>,
    pub turn: ChatTurn,
    pub config: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

/// A recorded `describe_image` call.
#[derive(Debug, Clone)]
pub struct VisionCall {
    pub image: ImagePayload,
    pub prompt: String,
    pub config: GenerationConfig,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            reply: "Mock reply".to_string(),
            description: "Mock image description".to_string(),
            latency_ms: 0,
            healthy: true,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            state: Arc::new(MockState::default()),
        }
    }

    /// Set the chat reply.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).reply = reply.into();
        self
    }

    /// Set the image description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).description = description.into();
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make `health_check` report unhealthy.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// Queue an upstream failure for the next chat call.
    pub fn fail_chat_with(self, err: UpstreamError) -> Self {
        self.fail_chat_with_error(Error::Upstream(err))
    }

    /// Queue any error for the next chat call.
    pub fn fail_chat_with_error(self, err: Error) -> Self {
        lock(&self.state.chat_failures).push_back(err);
        self
    }

    /// Queue an upstream failure for the next vision call.
    pub fn fail_vision_with(self, err: UpstreamError) -> Self {
        self.fail_vision_with_error(Error::Upstream(err))
    }

    /// Queue any error for the next vision call.
    pub fn fail_vision_with_error(self, err: Error) -> Self {
        lock(&self.state.vision_failures).push_back(err);
        self
    }

    /// Get all recorded chat calls for assertion.
    pub fn chat_calls(&self) -> Vec<ChatCall> {
        lock(&self.state.chat_calls).clone()
    }

    /// Get all recorded vision calls for assertion.
    pub fn vision_calls(&self) -> Vec<VisionCall> {
        lock(&self.state.vision_calls).clone()
    }

    /// Clear both call logs.
    pub fn clear_calls(&self) {
        lock(&self.state.chat_calls).clear();
        lock(&self.state.vision_calls).clear();
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        turn: &ChatTurn,
        config: &GenerationConfig,
        safety: &[SafetySetting],
    ) -> Result<String> {
        lock(&self.state.chat_calls).push(ChatCall {
            history: history.to_vec(),
            turn: turn.clone(),
            config: *config,
            safety: safety.to_vec(),
        });
        self.simulate_latency().await;

        if let Some(err) = lock(&self.state.chat_failures).pop_front() {
            return Err(err);
        }
        Ok(self.config.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

#[async_trait]
impl VisionBackend for MockBackend {
    async fn describe_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        lock(&self.state.vision_calls).push(VisionCall {
            image: image.clone(),
            prompt: prompt.to_string(),
            config: *config,
        });
        self.simulate_latency().await;

        if let Some(err) = lock(&self.state.vision_failures).pop_front() {
            return Err(err);
        }
        Ok(self.config.description.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
