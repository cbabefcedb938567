//! Domain types shared by the gateway, the session manager, and backends.

use serde::{Deserialize, Serialize};

use crate::defaults;

// =============================================================================
// IMAGES
// =============================================================================

/// A validated image reference, ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePayload {
    /// Bytes carried in the request, still base64-encoded.
    Inline { data: String, mime_type: String },
    /// Image fetched by the provider. The MIME type is assumed, not inspected.
    Remote { url: String, mime_type: String },
}

impl ImagePayload {
    pub fn inline(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ImagePayload::Inline {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        ImagePayload::Remote {
            url: url.into(),
            mime_type: defaults::REMOTE_IMAGE_MIME.to_string(),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ImagePayload::Inline { mime_type, .. } | ImagePayload::Remote { mime_type, .. } => {
                mime_type
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImagePayload::Inline { .. })
    }

    /// Inline-data reference form (`data:<mime>;base64,<payload>`).
    /// Remote images are returned as their URL.
    pub fn to_data_url(&self) -> String {
        match self {
            ImagePayload::Inline { data, mime_type } => {
                format!("data:{};base64,{}", mime_type, data)
            }
            ImagePayload::Remote { url, .. } => url.clone(),
        }
    }
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>, image: Option<ImagePayload>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image,
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            image: None,
        }
    }
}

// =============================================================================
// GENERATION PARAMETERS
// =============================================================================

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Parameters of a chat session.
    pub fn chat() -> Self {
        Self {
            temperature: defaults::CHAT_TEMPERATURE,
            top_k: defaults::CHAT_TOP_K,
            top_p: defaults::CHAT_TOP_P,
            max_output_tokens: defaults::CHAT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Parameters of a one-shot image analysis.
    pub fn vision() -> Self {
        Self {
            temperature: defaults::VISION_TEMPERATURE,
            top_k: defaults::VISION_TOP_K,
            top_p: defaults::VISION_TOP_P,
            max_output_tokens: defaults::VISION_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Content-safety threshold for one harm category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    /// The four categories filtered on chat sessions, each at
    /// "block medium and above".
    pub fn chat_defaults() -> Vec<SafetySetting> {
        defaults::SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: defaults::SAFETY_THRESHOLD.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_payload_assumes_jpeg() {
        let image = ImagePayload::remote("https://example.com/leaf.png");
        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(!image.is_inline());
    }

    #[test]
    fn test_inline_payload_data_url() {
        let image = ImagePayload::inline("aGVsbG8=", "image/png");
        assert_eq!(image.to_data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_chat_turn_serialization_omits_missing_image() {
        let turn = ChatTurn::model("Looks healthy");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["content"], "Looks healthy");
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_generation_config_serializes_camel_case() {
        let json = serde_json::to_value(GenerationConfig::chat()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_chat_and_vision_configs_differ() {
        let chat = GenerationConfig::chat();
        let vision = GenerationConfig::vision();
        assert!((chat.temperature - 0.7).abs() < f32::EPSILON);
        assert!((vision.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(vision.top_k, 32);
    }

    #[test]
    fn test_chat_safety_defaults() {
        let settings = SafetySetting::chat_defaults();
        assert_eq!(settings.len(), 4);
        assert!(settings
            .iter()
            .all(|s| s.threshold == "BLOCK_MEDIUM_AND_ABOVE"));
        assert_eq!(settings[1].category, "HARM_CATEGORY_HATE_SPEECH");
    }
}
