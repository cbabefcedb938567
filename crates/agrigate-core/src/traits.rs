//! Core traits for agrigate abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for multi-turn chat generation.
///
/// Backends are stateless: the caller owns the conversation and passes
/// the prior turns with each request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the model's reply to `turn`, given the earlier `history`.
    ///
    /// Provider failures are returned as [`crate::Error::Upstream`].
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        turn: &ChatTurn,
        config: &GenerationConfig,
        safety: &[SafetySetting],
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for describing images with a vision-capable model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Describe an image following `prompt`.
    async fn describe_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String>;

    /// Check if the vision backend is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// EXTERNAL COLLABORATORS
// =============================================================================

/// A chat turn as kept by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub has_image: bool,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_turn(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
            has_image: turn.image.is_some(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-user chat transcript storage (document database in production).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append entries to a user's transcript.
    async fn append(&self, user_id: &str, entries: Vec<HistoryEntry>) -> Result<()>;

    /// Full transcript for a user, oldest first.
    async fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>>;

    /// Remove a user's transcript.
    async fn clear(&self, user_id: &str) -> Result<()>;
}

/// Identity established from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPrincipal {
    pub user_id: String,
}

/// Bearer-token identity verification.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve a token to its principal. `None` means the token is not valid.
    async fn verify(&self, token: &str) -> Result<Option<AuthPrincipal>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_from_turn() {
        let turn = ChatTurn::user("What is wrong with my maize?", Some(ImagePayload::remote("u")));
        let entry = HistoryEntry::from_turn(&turn);
        assert_eq!(entry.role, Role::User);
        assert_eq!(entry.content, "What is wrong with my maize?");
        assert!(entry.has_image);
    }

    #[test]
    fn test_history_entry_serializes_camel_case() {
        let entry = HistoryEntry::from_turn(&ChatTurn::model("Looks like rust fungus"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["hasImage"], false);
        assert!(json.get("timestamp").is_some());
    }
}
