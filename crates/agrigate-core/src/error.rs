//! Error types for agrigate.
//!
//! [`Error`] is the closed domain taxonomy returned across the gateway
//! boundary, plus one transitional variant, [`Error::Upstream`], holding a
//! raw provider failure that has not been normalized yet. The gateway
//! always calls [`Error::normalize`] before handing an error to a caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using agrigate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for agrigate operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an unusable message, image, or identity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local request budget or provider quota exhausted.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider rejected the API credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Credentials are valid but lack access to the resource.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Requested model is missing or disabled.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Upstream call exceeded its deadline.
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Provider answered but the expected content was absent.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Anything else; the message is passed through.
    #[error("{0}")]
    Unknown(String),

    /// Raw provider failure, not yet normalized.
    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),
}

/// Stable classification of an [`Error`], used in HTTP bodies and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    RateLimited,
    AuthenticationFailed,
    PermissionDenied,
    ModelUnavailable,
    UpstreamTimeout,
    InvalidResponse,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure categories reported by the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Deadline elapsed before a response arrived.
    Timeout,
    /// Connection could not be established.
    Connect,
    /// Request body or response body could not be transferred.
    Body,
    Other,
}

/// Raw failure from the AI provider or the transport beneath it.
///
/// Carries whatever the upstream told us: an HTTP status when a response
/// arrived, a transport category when it did not, and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub transport: Option<TransportFailure>,
    pub message: String,
}

impl UpstreamError {
    /// Provider answered with a non-success HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            transport: None,
            message: message.into(),
        }
    }

    /// No usable response arrived.
    pub fn transport(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            status: None,
            transport: Some(kind),
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match (self.status, self.transport) {
            (Some(429), _) | (Some(500..=599), _) => true,
            (None, Some(TransportFailure::Timeout | TransportFailure::Connect)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<UpstreamError> for Error {
    fn from(e: UpstreamError) -> Self {
        Error::Upstream(e)
    }
}

impl Error {
    /// Classify this error. Raw upstream errors are classified the same way
    /// [`normalize`](crate::normalize::normalize) would.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::RateLimited(_) => ErrorKind::RateLimited,
            Error::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Error::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::Unknown(_) => ErrorKind::Unknown,
            Error::Upstream(e) => crate::normalize::classify(e),
        }
    }

    /// Replace a raw upstream failure with its domain error. Domain errors
    /// are returned unchanged.
    pub fn normalize(self) -> Self {
        match self {
            Error::Upstream(e) => crate::normalize::normalize(&e),
            other => other,
        }
    }

    /// Whether this error is still a raw upstream failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidInput(m)
            | Error::RateLimited(m)
            | Error::AuthenticationFailed(m)
            | Error::PermissionDenied(m)
            | Error::ModelUnavailable(m)
            | Error::UpstreamTimeout(m)
            | Error::InvalidResponse(m)
            | Error::Unknown(m) => m.clone(),
            Error::Upstream(e) => e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidResponse(e.to_string())
    }
}
