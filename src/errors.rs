use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference endpoint returned {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("Inference request exceeded the {}s ceiling", elapsed.as_secs())]
    Timeout { elapsed: Duration },

    #[error("Failed to encode image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl CapClawError {
    /// Transient transport-level failures are worth retrying; everything else
    /// (unreadable inputs, bad config) fails fast so the reasoner can
    /// substitute its fallback answer immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CapClawError::Transport { .. } | CapClawError::Timeout { .. } | CapClawError::Http(_)
        )
    }
}

pub type CapClawResult<T> = Result<T, CapClawError>;
