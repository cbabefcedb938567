//! Structured logging field name constants for agrigate.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names in every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (retry, rejected request, store failure) |
//! | INFO  | Lifecycle events (startup, session created/reset) |
//! | DEBUG | Decision points, per-call sizes and durations |
//! | TRACE | Window pruning and other per-item detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "gateway", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "rate_limiter", "vision", "session", "gemini"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "admit", "analyze", "send", "handle"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Authenticated user the request is made for.
pub const USER_ID: &str = "user_id";

/// Session identity (UUIDv7).
pub const SESSION_ID: &str = "session_id";

/// Session registry key (user id or the shared key).
pub const SESSION_KEY: &str = "session_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

/// Number of turns held by a session.
pub const HISTORY_LEN: &str = "history_len";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Backoff delay before the next attempt, in milliseconds.
pub const DELAY_MS: &str = "delay_ms";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// HTTP status returned by the provider.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Normalized error kind.
pub const ERROR_KIND: &str = "error_kind";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case() {
        let fields = [
            REQUEST_ID, SUBSYSTEM, COMPONENT, OPERATION, USER_ID, SESSION_ID, SESSION_KEY,
            DURATION_MS, PROMPT_LEN, RESPONSE_LEN, HISTORY_LEN, ATTEMPT, DELAY_MS, MODEL,
            STATUS, SUCCESS, ERROR_MSG, ERROR_KIND,
        ];
        for field in fields {
            assert!(
                field.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{} is not snake_case",
                field
            );
        }
    }
}
