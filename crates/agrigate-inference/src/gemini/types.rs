//! Gemini `generateContent` request and response types.

use serde::{Deserialize, Serialize};

use agrigate_core::{ChatTurn, GenerationConfig, ImagePayload, SafetySetting};

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

/// One conversation turn on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// Text part first, image part (if any) second.
    pub fn from_turn(turn: &ChatTurn) -> Self {
        let mut parts = vec![Part::Text {
            text: turn.content.clone(),
        }];
        if let Some(image) = &turn.image {
            parts.push(Part::from_image(image));
        }
        Self {
            role: turn.role.as_str().to_string(),
            parts,
        }
    }
}

/// A content part: text, inline bytes, or a URI the provider fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

impl Part {
    pub fn from_image(image: &ImagePayload) -> Self {
        match image {
            ImagePayload::Inline { data, mime_type } => Part::InlineData {
                inline_data: Blob {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                },
            },
            ImagePayload::Remote { url, mime_type } => Part::FileData {
                file_data: FileData {
                    mime_type: mime_type.clone(),
                    file_uri: url.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Response from `generateContent`. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// Why the prompt was blocked, if it was.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiError,
}

#[derive(Debug, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_turn_serialization() {
        let content = Content::from_turn(&ChatTurn::user("How much water for tomatoes?", None));
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["parts"][0]["text"], "How much water for tomatoes?");
        assert_eq!(json["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_inline_image_part_serialization() {
        let turn = ChatTurn::user("Leaf spots?", Some(ImagePayload::inline("AAAA", "image/png")));
        let json = serde_json::to_value(Content::from_turn(&turn)).unwrap();
        assert_eq!(json["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["parts"][1]["inlineData"]["data"], "AAAA");
    }

    #[test]
    fn test_remote_image_part_serialization() {
        let turn = ChatTurn::user("Leaf spots?", Some(ImagePayload::remote("https://x/y.jpg")));
        let json = serde_json::to_value(Content::from_turn(&turn)).unwrap();
        assert_eq!(json["parts"][1]["fileData"]["fileUri"], "https://x/y.jpg");
        assert_eq!(json["parts"][1]["fileData"]["mimeType"], "image/jpeg");
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![],
            generation_config: GenerationConfig::chat(),
            safety_settings: SafetySetting::chat_defaults(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(
            json["safetySettings"][0]["threshold"],
            "BLOCK_MEDIUM_AND_ABOVE"
        );
    }

    #[test]
    fn test_vision_request_omits_empty_safety_settings() {
        let request = GenerateContentRequest {
            contents: vec![],
            generation_config: GenerationConfig::vision(),
            safety_settings: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("safetySettings").is_none());
    }

    #[test]
    fn test_first_text_extraction() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Healthy maize"},{"text":"ignored"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), Some("Healthy maize"));
    }

    #[test]
    fn test_first_text_absent() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(response.first_text(), None);

        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(response.first_text(), None);
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let response: GeminiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.code, 429);
        assert_eq!(response.error.status, "RESOURCE_EXHAUSTED");
    }
}
