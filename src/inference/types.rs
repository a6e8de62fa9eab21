//! Serde wire types for the Ollama HTTP API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider-specific generation options. `num_predict` is Ollama's name for
/// the max-token budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'a GenerationOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequestBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'a GenerationOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Reply from `/api/chat`. The real payload is embedded in
/// `message.content` as free-form text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub message: ResponseMessage,
    #[serde(default)]
    pub done: bool,
}

impl ChatResponse {
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Reply from the legacy `/api/generate` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

impl GenerateResponse {
    pub fn text(&self) -> &str {
        &self.response
    }
}

/// Reply from `/api/tags`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTags {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl ModelTags {
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    /// True when any available model name contains `needle` (case-insensitive),
    /// e.g. `has_model_matching("llava")` to check for a vision model.
    pub fn has_model_matching(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.models
            .iter()
            .any(|m| m.name.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_omits_absent_fields() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("usr")];
        let body = ChatRequestBody {
            model: "llava:latest",
            messages: &messages,
            stream: false,
            images: None,
            options: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "llava:latest");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert!(value.get("images").is_none());
        assert!(value.get("options").is_none());
    }

    #[test]
    fn options_omit_unset_sampling_fields() {
        let options = GenerationOptions {
            temperature: 0.0,
            num_predict: 2048,
            top_p: None,
            top_k: None,
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["num_predict"], 2048);
        assert!(value.get("top_p").is_none());
        assert!(value.get("top_k").is_none());
    }

    #[test]
    fn chat_response_tolerates_missing_fields() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"message": {"content": "hello"}}"#).unwrap();
        assert_eq!(response.text(), "hello");
        assert!(!response.done);
    }

    #[test]
    fn model_tags_match_case_insensitively() {
        let tags: ModelTags =
            serde_json::from_str(r#"{"models": [{"name": "LLaVA:13b"}, {"name": "qwen2.5"}]}"#)
                .unwrap();
        assert_eq!(tags.names(), vec!["LLaVA:13b", "qwen2.5"]);
        assert!(tags.has_model_matching("llava"));
        assert!(!tags.has_model_matching("gemma"));
    }
}
