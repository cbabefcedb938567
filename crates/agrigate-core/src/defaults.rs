//! Centralized default constants for agrigate.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Environment variable names live next to the value they override.

// =============================================================================
// UPSTREAM REQUEST BUDGET
// =============================================================================

/// Admissions allowed per sliding window.
pub const UPSTREAM_RATE_LIMIT: usize = 60;

/// Sliding window length in seconds.
pub const UPSTREAM_RATE_WINDOW_SECS: u64 = 60;

pub const ENV_UPSTREAM_RATE_LIMIT: &str = "UPSTREAM_RATE_LIMIT";
pub const ENV_UPSTREAM_RATE_WINDOW_SECS: &str = "UPSTREAM_RATE_WINDOW_SECS";
pub const ENV_UPSTREAM_RATE_SCOPE: &str = "UPSTREAM_RATE_SCOPE";

// =============================================================================
// IMAGES
// =============================================================================

/// Largest decoded inline image accepted with a chat message (4 MiB).
pub const CHAT_IMAGE_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Largest image accepted at the upload/selection step (5 MiB).
pub const UPLOAD_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// MIME type assumed for URL-form images, which are never inspected.
pub const REMOTE_IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// GEMINI PROVIDER
// =============================================================================

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model backing chat sessions.
pub const GEMINI_CHAT_MODEL: &str = "gemini-2.0-flash";

/// Model backing image analysis.
pub const GEMINI_VISION_MODEL: &str = "gemini-1.5-flash";

/// Per-call HTTP timeout in seconds.
pub const GEMINI_TIMEOUT_SECS: u64 = 60;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_CHAT_MODEL: &str = "GEMINI_CHAT_MODEL";
pub const ENV_GEMINI_VISION_MODEL: &str = "GEMINI_VISION_MODEL";
pub const ENV_GEMINI_TIMEOUT: &str = "GEMINI_TIMEOUT";

// =============================================================================
// CHAT GENERATION
// =============================================================================

pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_TOP_K: u32 = 40;
pub const CHAT_TOP_P: f32 = 0.95;
pub const CHAT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Threshold applied to every safety category of a chat session.
pub const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Harm categories filtered on chat sessions.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// =============================================================================
// VISION ANALYSIS
// =============================================================================

pub const VISION_TEMPERATURE: f32 = 0.4;
pub const VISION_TOP_K: u32 = 32;
pub const VISION_TOP_P: f32 = 0.95;
pub const VISION_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Instruction sent alongside every analyzed image.
pub const VISION_PROMPT: &str = "Analyze this image and provide detailed information about any plants, their health, and potential issues. Focus on agricultural aspects.";

/// Retries after the first attempt.
pub const VISION_MAX_RETRIES: u32 = 3;

/// First backoff delay; doubles per retry.
pub const VISION_BACKOFF_BASE_MS: u64 = 500;

/// Ceiling for a single backoff delay.
pub const VISION_BACKOFF_CAP_MS: u64 = 4_000;

pub const ENV_VISION_MAX_RETRIES: &str = "VISION_MAX_RETRIES";

// =============================================================================
// SESSIONS
// =============================================================================

/// Idle time after which a session is reaped (seconds). Zero disables reaping.
pub const SESSION_IDLE_SECS: u64 = 1800;

/// How often the reaper wakes up (seconds).
pub const SESSION_REAP_INTERVAL_SECS: u64 = 60;

/// Turns kept in a session's history (user and model turns counted
/// separately). The oldest exchanges are dropped first.
pub const SESSION_MAX_TURNS: usize = 40;

/// Key of the process-wide session in shared scope.
pub const SHARED_SESSION_KEY: &str = "__shared__";

pub const ENV_SESSION_SCOPE: &str = "SESSION_SCOPE";
pub const ENV_SESSION_IDLE_SECS: &str = "SESSION_IDLE_SECS";
pub const ENV_SESSION_MAX_TURNS: &str = "SESSION_MAX_TURNS";

// =============================================================================
// GATEWAY
// =============================================================================

/// Deadline for one full gateway call (analysis + chat), in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

/// Entries kept per user by the in-memory history store.
pub const HISTORY_MAX_ENTRIES: usize = 50;

// =============================================================================
// HTTP SERVER
// =============================================================================

pub const SERVER_HOST: &str = "0.0.0.0";
pub const SERVER_PORT: u16 = 3001;

/// Environment name reported by `/health`. Error details are only exposed
/// in `development`.
pub const APP_ENV: &str = "production";
pub const APP_ENV_DEVELOPMENT: &str = "development";

/// Browser origins allowed by CORS, comma-separated.
pub const ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Maximum request body (inline images travel as JSON).
pub const REQUEST_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Ingress throttle: requests per period, across all clients.
pub const RATE_LIMIT_REQUESTS: u32 = 100;
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const ENV_AUTH_TOKENS: &str = "AUTH_TOKENS";
pub const ENV_RATE_LIMIT_ENABLED: &str = "RATE_LIMIT_ENABLED";
pub const ENV_RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
pub const ENV_RATE_LIMIT_PERIOD_SECS: &str = "RATE_LIMIT_PERIOD_SECS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ceilings_are_distinct() {
        assert_eq!(CHAT_IMAGE_MAX_BYTES, 4_194_304);
        assert_eq!(UPLOAD_IMAGE_MAX_BYTES, 5_242_880);
        assert!(CHAT_IMAGE_MAX_BYTES < UPLOAD_IMAGE_MAX_BYTES);
    }

    #[test]
    fn test_backoff_cap_above_base() {
        assert!(VISION_BACKOFF_CAP_MS > VISION_BACKOFF_BASE_MS);
    }
}
