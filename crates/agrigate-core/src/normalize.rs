//! Mapping of raw upstream failures onto the domain error taxonomy.
//!
//! Rules are checked in order and the first match wins:
//!
//! | upstream signal | kind |
//! |---|---|
//! | HTTP 429, or message contains "rate limit" | `RateLimited` |
//! | HTTP 400, or "invalid" | `InvalidInput` |
//! | HTTP 401, or "authentication" | `AuthenticationFailed` |
//! | HTTP 403, or "permission" | `PermissionDenied` |
//! | "model" | `ModelUnavailable` |
//! | transport timeout | `UpstreamTimeout` |
//! | anything else | `Unknown` (message passed through) |
//!
//! Substring checks ignore ASCII case.

use crate::error::{Error, ErrorKind, TransportFailure, UpstreamError};

pub const MSG_RATE_LIMITED: &str = "Rate limit exceeded. Please try again in a minute.";
pub const MSG_INVALID_INPUT: &str = "Invalid request. Please check your input and try again.";
pub const MSG_AUTHENTICATION: &str = "Authentication failed. Please check your API key.";
pub const MSG_PERMISSION: &str = "Access denied. Please check your API permissions.";
pub const MSG_MODEL: &str =
    "Model not found. Please check if the Gemini API is enabled for this project.";
pub const MSG_TIMEOUT: &str = "Request timed out. Please try again.";
pub const MSG_UNKNOWN: &str = "Failed to get response from the AI provider";

/// Classify a raw upstream failure without building an error.
pub fn classify(raw: &UpstreamError) -> ErrorKind {
    let message = raw.message.to_ascii_lowercase();
    let has = |needle: &str| message.contains(needle);

    if raw.status == Some(429) || has("rate limit") {
        ErrorKind::RateLimited
    } else if raw.status == Some(400) || has("invalid") {
        ErrorKind::InvalidInput
    } else if raw.status == Some(401) || has("authentication") {
        ErrorKind::AuthenticationFailed
    } else if raw.status == Some(403) || has("permission") {
        ErrorKind::PermissionDenied
    } else if has("model") {
        ErrorKind::ModelUnavailable
    } else if raw.transport == Some(TransportFailure::Timeout) {
        ErrorKind::UpstreamTimeout
    } else {
        ErrorKind::Unknown
    }
}

/// Turn a raw upstream failure into the domain error callers see.
pub fn normalize(raw: &UpstreamError) -> Error {
    match classify(raw) {
        ErrorKind::RateLimited => Error::RateLimited(MSG_RATE_LIMITED.to_string()),
        ErrorKind::InvalidInput => Error::InvalidInput(MSG_INVALID_INPUT.to_string()),
        ErrorKind::AuthenticationFailed => {
            Error::AuthenticationFailed(MSG_AUTHENTICATION.to_string())
        }
        ErrorKind::PermissionDenied => Error::PermissionDenied(MSG_PERMISSION.to_string()),
        ErrorKind::ModelUnavailable => Error::ModelUnavailable(MSG_MODEL.to_string()),
        ErrorKind::UpstreamTimeout => Error::UpstreamTimeout(MSG_TIMEOUT.to_string()),
        // classify never yields InvalidResponse for a raw error; treat it as unknown.
        ErrorKind::InvalidResponse | ErrorKind::Unknown => {
            if raw.message.is_empty() {
                Error::Unknown(MSG_UNKNOWN.to_string())
            } else {
                Error::Unknown(raw.message.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_429_is_rate_limited() {
        let err = normalize(&UpstreamError::http(429, "Resource has been exhausted"));
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.message(), MSG_RATE_LIMITED);
    }

    #[test]
    fn test_rate_limit_message_without_status() {
        let raw = UpstreamError::transport(TransportFailure::Other, "Rate Limit hit");
        assert_eq!(classify(&raw), ErrorKind::RateLimited);
    }

    #[test]
    fn test_http_400_is_invalid_input() {
        assert_eq!(
            classify(&UpstreamError::http(400, "bad payload")),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_http_401_is_authentication_failed() {
        assert_eq!(
            classify(&UpstreamError::http(401, "unauthorized")),
            ErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn test_http_403_is_permission_denied() {
        assert_eq!(
            classify(&UpstreamError::http(403, "forbidden")),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_model_message_is_model_unavailable() {
        let raw = UpstreamError::http(404, "models/gemini-x is not found");
        assert_eq!(classify(&raw), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_transport_timeout_is_upstream_timeout() {
        let raw = UpstreamError::transport(TransportFailure::Timeout, "operation timed out");
        let err = normalize(&raw);
        assert_eq!(err.kind(), ErrorKind::UpstreamTimeout);
        assert_eq!(err.message(), MSG_TIMEOUT);
    }

    #[test]
    fn test_unknown_passes_message_through() {
        let raw = UpstreamError::http(500, "backend exploded");
        match normalize(&raw) {
            Error::Unknown(msg) => assert_eq!(msg, "backend exploded"),
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_with_empty_message_gets_default() {
        let raw = UpstreamError::transport(TransportFailure::Connect, "");
        assert_eq!(normalize(&raw).message(), MSG_UNKNOWN);
    }

    #[test]
    fn test_precedence_status_429_beats_invalid_text() {
        let raw = UpstreamError::http(429, "invalid quota project");
        assert_eq!(classify(&raw), ErrorKind::RateLimited);
    }

    #[test]
    fn test_precedence_invalid_beats_authentication() {
        let raw = UpstreamError::http(401, "invalid authentication credentials");
        assert_eq!(classify(&raw), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_precedence_model_text_beats_timeout() {
        let raw = UpstreamError::transport(TransportFailure::Timeout, "model overloaded");
        assert_eq!(classify(&raw), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_matching_ignores_case() {
        let raw = UpstreamError::transport(TransportFailure::Other, "PERMISSION missing");
        assert_eq!(classify(&raw), ErrorKind::PermissionDenied);
    }
}
