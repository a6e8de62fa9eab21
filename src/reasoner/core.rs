//! Shared composition embedded by every task reasoner.

use std::path::Path;

use serde_json::Value;

use crate::config::{RetryPolicy, SolverConfig};
use crate::errors::CapClawResult;
use crate::inference::client::OllamaClient;
use crate::inference::types::{ChatMessage, ChatResponse, GenerationOptions};

/// Holds the endpoint binding, the retry policy, and the transient
/// last-response diagnostic. A reasoner is bound to one base endpoint for
/// its lifetime; each invocation opens its own scoped client session.
pub struct ReasonerCore {
    base_url: String,
    retry: RetryPolicy,
    /// Raw reply from the most recent chat call, kept for diagnostics and
    /// the optional snapshot. Overlapping calls on the same reasoner race on
    /// this field; last writer wins.
    last_response: Option<Value>,
}

impl ReasonerCore {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            retry: config.retry.clone(),
            last_response: None,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    /// Encode the given images and send one chat request, all within a
    /// single client session that is released when this call returns.
    pub async fn chat_with_images(
        &mut self,
        model: &str,
        messages: &[ChatMessage],
        image_paths: &[&Path],
        options: &GenerationOptions,
    ) -> CapClawResult<ChatResponse> {
        let client = OllamaClient::new(&self.base_url)?;

        let mut images = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            images.push(client.encode_image(path).await?);
        }

        let response = client
            .chat(model, messages, Some(&images), Some(options))
            .await?;
        self.last_response = serde_json::to_value(&response).ok();
        Ok(response)
    }

    /// Provider-specific options mapping for one call.
    pub fn format_options(
        temperature: f32,
        max_tokens: u32,
        top_p: Option<f32>,
        top_k: Option<u32>,
    ) -> GenerationOptions {
        GenerationOptions {
            temperature,
            num_predict: max_tokens,
            top_p,
            top_k,
        }
    }

    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    /// Write the latest raw response as pretty-printed JSON to `path`,
    /// creating parent directories as needed. This is a diagnostic path:
    /// failures are logged and swallowed and never affect the primary
    /// result.
    pub fn cache_response(&self, path: &Path) {
        if let Err(error) = self.write_snapshot(path) {
            tracing::warn!(path = %path.display(), error = %error, "failed to write response snapshot");
        }
    }

    fn write_snapshot(&self, path: &Path) -> CapClawResult<()> {
        let snapshot = self
            .last_response
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "response": null }));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}
