use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CapClawError, CapClawResult};
use crate::models::{FastShotModel, SpatialModel};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// All tunables for the solving pipeline in one place. Reasoners take a
/// reference at construction; there are no process-wide implicit defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Base URL of the Ollama-compatible inference endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for fast classification/routing calls.
    #[serde(default)]
    pub fast_shot_model: FastShotModel,
    /// Model used for spatial reasoning calls (points, boxes, paths).
    #[serde(default)]
    pub spatial_model: SpatialModel,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fast_shot_model: FastShotModel::default(),
            spatial_model: SpatialModel::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Applied uniformly across all reasoners: transport failures are retried up
/// to `max_attempts` total with a fixed delay between attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> u64 {
    3
}

fn resolve_config_path() -> CapClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(CapClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> CapClawResult<SolverConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: SolverConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), base_url = %config.base_url, "config loaded");
    Ok(config)
}

pub fn save_config(config: &SolverConfig) -> CapClawResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
