//! Async HTTP client for the Ollama-compatible inference endpoint.
//!
//! One client is built per reasoner invocation and dropped with it; there is
//! no pooling across calls. Each call is already inference-latency-bound, so
//! connection reuse buys nothing, and the scoped lifetime guarantees the
//! session is released on every exit path, including cancellation.

use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;

use crate::errors::{CapClawError, CapClawResult};
use crate::inference::types::{
    ChatMessage, ChatRequestBody, ChatResponse, GenerateRequestBody, GenerateResponse,
    GenerationOptions, ModelTags,
};

/// Wall-clock ceiling per HTTP call. Local vision models can be slow; a
/// request still running after this long is treated as a Timeout failure,
/// distinct from a non-success status.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> CapClawResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Send a chat request. The reply's `message.content` carries the text
    /// the interpreter will work on.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        images: Option<&[String]>,
        options: Option<&GenerationOptions>,
    ) -> CapClawResult<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequestBody {
            model,
            messages,
            stream: false,
            images,
            options,
        };
        tracing::debug!(
            model,
            url = %url,
            messages = messages.len(),
            images = images.map_or(0, <[String]>::len),
            "sending chat request"
        );
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::handle(response).await
    }

    /// Legacy single-prompt form of `chat`.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        images: Option<&[String]>,
        options: Option<&GenerationOptions>,
    ) -> CapClawResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequestBody {
            model,
            prompt,
            stream: false,
            images,
            options,
        };
        tracing::debug!(
            model,
            url = %url,
            images = images.map_or(0, <[String]>::len),
            "sending generate request"
        );
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::handle(response).await
    }

    /// List the models available on the endpoint.
    pub async fn list_models(&self) -> CapClawResult<ModelTags> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await.map_err(map_reqwest_error)?;
        Self::handle(response).await
    }

    /// Read an image file and encode it as a base64 blob for transport.
    pub async fn encode_image(&self, path: &Path) -> CapClawResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| CapClawError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(BASE64.encode(bytes))
    }

    async fn handle<T: DeserializeOwned>(response: reqwest::Response) -> CapClawResult<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CapClawError::Transport { status, body });
        }
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(error: reqwest::Error) -> CapClawError {
    if error.is_timeout() {
        CapClawError::Timeout {
            elapsed: REQUEST_TIMEOUT,
        }
    } else {
        CapClawError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encode_image_round_trips_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        tokio::fs::write(&path, b"fake png bytes").await.unwrap();

        let client = OllamaClient::new("http://localhost:11434").unwrap();
        let blob = client.encode_image(&path).await.unwrap();
        assert_eq!(BASE64.decode(blob).unwrap(), b"fake png bytes");
    }

    #[tokio::test]
    async fn encode_image_reports_the_unreadable_path() {
        let client = OllamaClient::new("http://localhost:11434").unwrap();
        let missing = Path::new("/nonexistent/shot.png");
        let error = client.encode_image(missing).await.unwrap_err();
        match error {
            CapClawError::Encode { path, .. } => assert_eq!(path, missing),
            other => panic!("expected Encode error, got {other:?}"),
        }
        assert!(!CapClawError::Encode {
            path: missing.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_retryable());
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
