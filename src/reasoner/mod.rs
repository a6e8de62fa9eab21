//! The retrying task-reasoner abstraction and the concrete per-task
//! reasoners.
//!
//! Every reasoner follows the same composition: build a fixed system
//! instruction plus user content, encode the input image(s), call the
//! inference endpoint at near-zero temperature, feed the raw reply text
//! through the interpretation cascade, and reshape the generic payload into
//! a typed answer with documented defaults for anything missing.
//!
//! Only transport-level failures are retried. A payload that parses but
//! fails validation is not an error at all; it resolves immediately to the
//! task's defaults. No error ever escapes `invoke_async`.

pub mod challenge_classifier;
pub mod core;
pub mod image_classifier;
pub mod spatial_bbox;
pub mod spatial_path;
pub mod spatial_point;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::RetryPolicy;
use crate::errors::CapClawResult;

pub use challenge_classifier::{ChallengeClassifier, ChallengeRouter};
pub use self::core::ReasonerCore;
pub use image_classifier::ImageClassifier;
pub use spatial_bbox::SpatialBboxReasoner;
pub use spatial_path::SpatialPathReasoner;
pub use spatial_point::SpatialPointReasoner;

/// Input for reasoners that look at a single challenge screenshot.
#[derive(Debug, Clone)]
pub struct ScreenshotRequest {
    pub screenshot: PathBuf,
    /// Per-call override of the reasoner's default model.
    pub model: Option<String>,
}

impl ScreenshotRequest {
    pub fn new(screenshot: impl Into<PathBuf>) -> Self {
        Self {
            screenshot: screenshot.into(),
            model: None,
        }
    }
}

/// Input for spatial reasoners: the challenge screenshot plus the
/// coordinate-grid overlay that helps the model report absolute pixels.
#[derive(Debug, Clone)]
pub struct SpatialRequest {
    pub screenshot: PathBuf,
    pub grid_overlay: PathBuf,
    /// Free-text context appended to the user content (e.g. the challenge
    /// prompt read from the page).
    pub auxiliary: Option<String>,
    pub model: Option<String>,
}

impl SpatialRequest {
    pub fn new(screenshot: impl Into<PathBuf>, grid_overlay: impl Into<PathBuf>) -> Self {
        Self {
            screenshot: screenshot.into(),
            grid_overlay: grid_overlay.into(),
            auxiliary: None,
            model: None,
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: impl Into<String>) -> Self {
        self.auxiliary = Some(auxiliary.into());
        self
    }
}

/// A retrying invocation wrapper around one task.
///
/// Implementors supply a single `attempt` plus a `fallback`; the provided
/// `invoke_async` owns the retry loop and the fail-soft contract: it always
/// returns a well-typed answer, possibly the documented fallback, never an
/// error.
#[async_trait]
pub trait Reasoner: Send + Sync {
    type Request: Send + Sync;
    type Output: Send;

    fn retry_policy(&self) -> RetryPolicy;

    /// The documented answer substituted when attempts are exhausted or a
    /// non-retryable failure occurs.
    fn fallback(&self, request: &Self::Request) -> Self::Output;

    /// One request/interpret/reshape round trip.
    async fn attempt(&mut self, request: &Self::Request) -> CapClawResult<Self::Output>;

    /// Canonical entry point. Retries retryable failures up to
    /// `max_attempts` total with a fixed delay, logging a warning per retry;
    /// anything else resolves to the fallback answer.
    async fn invoke_async(&mut self, request: Self::Request) -> Self::Output {
        let policy = self.retry_policy();
        let mut attempt_no: u32 = 1;
        loop {
            match self.attempt(&request).await {
                Ok(answer) => return answer,
                Err(error) if error.is_retryable() && attempt_no < policy.max_attempts => {
                    tracing::warn!(
                        attempt = attempt_no,
                        max_attempts = policy.max_attempts,
                        delay_secs = policy.delay_secs,
                        error = %error,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(policy.delay()).await;
                    attempt_no += 1;
                }
                Err(error) => {
                    tracing::warn!(error = %error, "substituting fallback answer");
                    return self.fallback(&request);
                }
            }
        }
    }

    /// Blocking form of `invoke_async` for synchronous callers.
    fn invoke(&mut self, request: Self::Request) -> Self::Output {
        crate::bridge::run_sync(self.invoke_async(request))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::errors::CapClawError;

    /// Replays a scripted sequence of attempt outcomes.
    struct ScriptedReasoner {
        outcomes: VecDeque<CapClawResult<u32>>,
        attempts_made: u32,
        policy: RetryPolicy,
    }

    impl ScriptedReasoner {
        fn new(outcomes: Vec<CapClawResult<u32>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                attempts_made: 0,
                policy: RetryPolicy::default(),
            }
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        type Request = ();
        type Output = u32;

        fn retry_policy(&self) -> RetryPolicy {
            self.policy.clone()
        }

        fn fallback(&self, _request: &()) -> u32 {
            999
        }

        async fn attempt(&mut self, _request: &()) -> CapClawResult<u32> {
            self.attempts_made += 1;
            self.outcomes.pop_front().expect("script exhausted")
        }
    }

    fn transport_failure() -> CapClawError {
        CapClawError::Transport {
            status: 502,
            body: "bad gateway".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_transport_failures() {
        let mut reasoner = ScriptedReasoner::new(vec![
            Err(transport_failure()),
            Err(transport_failure()),
            Ok(7),
        ]);
        assert_eq!(reasoner.invoke_async(()).await, 7);
        assert_eq!(reasoner.attempts_made, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_resolve_to_the_fallback() {
        let mut reasoner = ScriptedReasoner::new(vec![
            Err(transport_failure()),
            Err(transport_failure()),
            Err(transport_failure()),
        ]);
        assert_eq!(reasoner.invoke_async(()).await, 999);
        assert_eq!(reasoner.attempts_made, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_failures_are_retried() {
        let mut reasoner = ScriptedReasoner::new(vec![
            Err(CapClawError::Timeout {
                elapsed: Duration::from_secs(300),
            }),
            Ok(11),
        ]);
        assert_eq!(reasoner.invoke_async(()).await, 11);
        assert_eq!(reasoner.attempts_made, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failures_fall_back_immediately() {
        let mut reasoner = ScriptedReasoner::new(vec![Err(CapClawError::Encode {
            path: "missing.png".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })]);
        assert_eq!(reasoner.invoke_async(()).await, 999);
        assert_eq!(reasoner.attempts_made, 1);
    }

    #[test]
    fn blocking_invoke_bridges_to_the_async_path() {
        let mut reasoner = ScriptedReasoner::new(vec![Ok(5)]);
        assert_eq!(reasoner.invoke(()), 5);
    }
}
