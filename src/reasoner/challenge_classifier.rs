//! Fast-shot reasoners: challenge classification and routing.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{RetryPolicy, SolverConfig};
use crate::errors::CapClawResult;
use crate::inference::types::ChatMessage;
use crate::interpreter;
use crate::models::{ChallengeType, FastShotModel, RouterResult};
use crate::reasoner::{Reasoner, ReasonerCore, ScreenshotRequest};

const CLASSIFIER_INSTRUCTIONS: &str = r#"
Your task is to classify challenge questions into one of four types:

1. `image_label_single_select`: Requires clicking on a SINGLE specific area/object of an image based on a prompt
2. `image_label_multi_select`: Requires clicking on MULTIPLE areas/objects of an image based on a prompt
3. `image_drag_single`: Requires dragging a SINGLE puzzle piece/element to a specific location on an image
4. `image_drag_multi`: Requires dragging MULTIPLE puzzle pieces/elements to specific locations on an image

Rules:
- Output ONLY one of the four classification types listed above
- If the question implies selecting ONE item/area, output `image_label_single_select`
- If the question implies selecting MULTIPLE items/areas (including 9-grid selection), output `image_label_multi_select`
- If the question implies dragging ONE item/element, output `image_drag_single`
- If the question implies dragging MULTIPLE items/elements, output `image_drag_multi`
"#;

const ROUTER_INSTRUCTIONS: &str = r#"
Analyze the provided challenge image and identify:
1. The challenge prompt/task description
2. The appropriate challenge type

Return your response in this JSON format:
```json
{
    "challenge_prompt": "description of what the challenge is asking",
    "challenge_type": "one of: image_label_single_select, image_label_multi_select, image_drag_single, image_drag_multi"
}
```
"#;

/// Classifies a challenge screenshot into one of the four category labels by
/// substring search over the raw reply.
pub struct ChallengeClassifier {
    core: ReasonerCore,
    model: FastShotModel,
}

impl ChallengeClassifier {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            core: ReasonerCore::new(config),
            model: config.fast_shot_model.clone(),
        }
    }

    pub fn cache_response(&self, path: &Path) {
        self.core.cache_response(path);
    }
}

#[async_trait]
impl Reasoner for ChallengeClassifier {
    type Request = ScreenshotRequest;
    type Output = ChallengeType;

    fn retry_policy(&self) -> RetryPolicy {
        self.core.retry_policy()
    }

    fn fallback(&self, _request: &ScreenshotRequest) -> ChallengeType {
        ChallengeType::ALL[0]
    }

    async fn attempt(&mut self, request: &ScreenshotRequest) -> CapClawResult<ChallengeType> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.model.as_str().to_string());
        let messages = [
            ChatMessage::system(CLASSIFIER_INSTRUCTIONS),
            ChatMessage::user("Analyze this challenge image and classify it into one of the four types."),
        ];
        let options = ReasonerCore::format_options(0.0, 2048, None, None);

        let response = self
            .core
            .chat_with_images(&model, &messages, &[&request.screenshot], &options)
            .await?;

        Ok(classify_from_text(response.text()))
    }
}

fn classify_from_text(text: &str) -> ChallengeType {
    ChallengeType::from_text(text).unwrap_or_else(|| {
        tracing::warn!("no challenge type found in reply, defaulting to first label");
        ChallengeType::ALL[0]
    })
}

/// Extracts both the challenge prompt and type from a screenshot in one
/// call, via the interpretation cascade.
pub struct ChallengeRouter {
    core: ReasonerCore,
    model: FastShotModel,
}

impl ChallengeRouter {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            core: ReasonerCore::new(config),
            model: config.fast_shot_model.clone(),
        }
    }

    pub fn cache_response(&self, path: &Path) {
        self.core.cache_response(path);
    }
}

#[async_trait]
impl Reasoner for ChallengeRouter {
    type Request = ScreenshotRequest;
    type Output = RouterResult;

    fn retry_policy(&self) -> RetryPolicy {
        self.core.retry_policy()
    }

    fn fallback(&self, _request: &ScreenshotRequest) -> RouterResult {
        RouterResult::fallback()
    }

    async fn attempt(&mut self, request: &ScreenshotRequest) -> CapClawResult<RouterResult> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.model.as_str().to_string());
        let messages = [
            ChatMessage::system(ROUTER_INSTRUCTIONS),
            ChatMessage::user("Analyze this challenge image and extract the prompt and challenge type."),
        ];
        let options = ReasonerCore::format_options(0.0, 2048, None, None);

        let response = self
            .core
            .chat_with_images(&model, &messages, &[&request.screenshot], &options)
            .await?;

        let payload = interpreter::interpret(response.text());
        Ok(reshape_router(&payload))
    }
}

/// Fill missing required fields with the router's documented defaults.
fn reshape_router(payload: &Map<String, Value>) -> RouterResult {
    let challenge_prompt = payload
        .get("challenge_prompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or("unknown challenge")
        .to_string();

    let challenge_type = payload
        .get("challenge_type")
        .and_then(Value::as_str)
        .and_then(ChallengeType::from_text)
        .unwrap_or(ChallengeType::ALL[0]);

    RouterResult {
        challenge_prompt,
        challenge_type,
    }
}
