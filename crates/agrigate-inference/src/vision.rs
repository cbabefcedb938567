//! Image analysis with bounded retry.
//!
//! [`VisionAnalyzer`] sends an image with a fixed agricultural instruction
//! to a [`VisionBackend`] and returns the description. Transient upstream
//! failures (timeouts, connection errors, HTTP 429 and 5xx) are retried
//! with exponential backoff; everything else fails on the first attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use agrigate_core::defaults;
use agrigate_core::{Error, GenerationConfig, ImagePayload, Result, VisionBackend};

/// How often and how far apart failed analyses are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::VISION_MAX_RETRIES,
            base_delay: Duration::from_millis(defaults::VISION_BACKOFF_BASE_MS),
            max_delay: Duration::from_millis(defaults::VISION_BACKOFF_CAP_MS),
        }
    }
}

impl RetryPolicy {
    /// Read `VISION_MAX_RETRIES`, keeping the default delays.
    pub fn from_env() -> Self {
        let max_retries = std::env::var(defaults::ENV_VISION_MAX_RETRIES)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::VISION_MAX_RETRIES);
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Whether another attempt could succeed.
fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Upstream(e) => e.is_transient(),
        _ => false,
    }
}

/// Describes farm images through a vision backend.
pub struct VisionAnalyzer {
    backend: Arc<dyn VisionBackend>,
    prompt: String,
    config: GenerationConfig,
    retry: RetryPolicy,
}

impl VisionAnalyzer {
    pub fn new(backend: Arc<dyn VisionBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            prompt: defaults::VISION_PROMPT.to_string(),
            config: GenerationConfig::vision(),
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Whether the vision provider is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    /// Analyze an image and return the plain-text description.
    ///
    /// Errors are returned raw; callers normalize them.
    pub async fn analyze(&self, image: &ImagePayload) -> Result<String> {
        let start = Instant::now();
        let mut retry = 0;

        loop {
            match self
                .backend
                .describe_image(image, &self.prompt, &self.config)
                .await
            {
                Ok(description) => {
                    debug!(
                        subsystem = "inference",
                        component = "vision",
                        op = "analyze",
                        model = %self.backend.model_name(),
                        attempt = retry + 1,
                        response_len = description.len(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Image analysis complete"
                    );
                    return Ok(description);
                }
                Err(e) if retry < self.retry.max_retries && is_retryable(&e) => {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        subsystem = "inference",
                        component = "vision",
                        op = "analyze",
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Image analysis failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    warn!(
                        subsystem = "inference",
                        component = "vision",
                        op = "analyze",
                        attempt = retry + 1,
                        error = %e,
                        "Image analysis failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use agrigate_core::{ErrorKind, TransportFailure, UpstreamError};

    fn analyzer(mock: &MockBackend) -> VisionAnalyzer {
        VisionAnalyzer::new(Arc::new(mock.clone()), RetryPolicy::default())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_analyze_sends_fixed_prompt_and_config() {
        let mock = MockBackend::new().with_description("Leaf rust on wheat");
        let image = ImagePayload::remote("https://farm.example/wheat.jpg");

        let description = analyzer(&mock).analyze(&image).await.unwrap();
        assert_eq!(description, "Leaf rust on wheat");

        let calls = mock.vision_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("agricultural aspects"));
        assert_eq!(calls[0].config, GenerationConfig::vision());
        assert_eq!(calls[0].image, image);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let mock = MockBackend::new()
            .with_description("Healthy")
            .fail_vision_with(UpstreamError::http(503, "unavailable"))
            .fail_vision_with(UpstreamError::transport(TransportFailure::Timeout, "timed out"));

        let start = tokio::time::Instant::now();
        let description = analyzer(&mock).analyze(&ImagePayload::remote("u")).await.unwrap();

        assert_eq!(description, "Healthy");
        assert_eq!(mock.vision_calls().len(), 3);
        // 500 ms + 1000 ms of backoff on the paused clock.
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let mut mock = MockBackend::new();
        for _ in 0..5 {
            mock = mock.fail_vision_with(UpstreamError::http(429, "quota"));
        }

        let err = analyzer(&mock)
            .analyze(&ImagePayload::remote("u"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimited);
        // One attempt plus three retries.
        assert_eq!(mock.vision_calls().len(), 4);
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let mock = MockBackend::new().fail_vision_with(UpstreamError::http(401, "bad key"));

        let err = analyzer(&mock)
            .analyze(&ImagePayload::remote("u"))
            .await
            .unwrap_err();

        assert!(err.is_upstream());
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(mock.vision_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_response_is_not_retried() {
        let mock = MockBackend::new().fail_vision_with_error(Error::InvalidResponse(
            "Invalid analysis response format".to_string(),
        ));

        let err = analyzer(&mock)
            .analyze(&ImagePayload::remote("u"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(mock.vision_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_policy() {
        let mock = MockBackend::new().fail_vision_with(UpstreamError::http(500, "boom"));
        let analyzer = VisionAnalyzer::new(
            Arc::new(mock.clone()),
            RetryPolicy {
                max_retries: 0,
                ..Default::default()
            },
        );

        assert!(analyzer.analyze(&ImagePayload::remote("u")).await.is_err());
        assert_eq!(mock.vision_calls().len(), 1);
    }
}
