//! Conversion of Gemini HTTP and transport failures into [`UpstreamError`].

use agrigate_core::{TransportFailure, UpstreamError};

use super::types::GeminiErrorResponse;

/// Longest raw body kept in an error message when the body is not JSON.
const MAX_RAW_BODY: usize = 200;

/// Classify a `reqwest` failure. The request URL is stripped first: it
/// names the model path and must not leak into messages or classification.
pub fn from_transport(e: reqwest::Error) -> UpstreamError {
    let kind = if e.is_timeout() {
        TransportFailure::Timeout
    } else if e.is_connect() {
        TransportFailure::Connect
    } else if e.is_body() || e.is_decode() {
        TransportFailure::Body
    } else {
        TransportFailure::Other
    };

    let e = e.without_url();
    let message = match std::error::Error::source(&e) {
        Some(source) => format!("{}: {}", e, source),
        None => e.to_string(),
    };
    UpstreamError::transport(kind, message)
}

/// Build an error from a non-success response.
pub fn from_status(status: u16, body: &str) -> UpstreamError {
    let message = match serde_json::from_str::<GeminiErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("Gemini returned status {}", status)
            } else {
                trimmed.chars().take(MAX_RAW_BODY).collect()
            }
        }
    };
    UpstreamError::http(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_error_message() {
        let body = r#"{"error":{"code":403,"message":"Permission denied on resource project","status":"PERMISSION_DENIED"}}"#;
        let err = from_status(403, body);
        assert_eq!(err.status, Some(403));
        assert_eq!(err.message, "Permission denied on resource project");
    }

    #[test]
    fn test_from_status_falls_back_to_raw_body() {
        let err = from_status(502, "<html>Bad Gateway</html>");
        assert_eq!(err.message, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_from_status_truncates_raw_body() {
        let err = from_status(500, &"x".repeat(1000));
        assert_eq!(err.message.len(), MAX_RAW_BODY);
    }

    #[test]
    fn test_from_status_empty_body() {
        let err = from_status(503, "");
        assert_eq!(err.message, "Gemini returned status 503");
        assert!(err.is_transient());
    }
}
