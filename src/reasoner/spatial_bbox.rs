//! Bounding-box reasoning over a screenshot plus coordinate-grid overlay.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{RetryPolicy, SolverConfig};
use crate::errors::CapClawResult;
use crate::inference::types::ChatMessage;
use crate::interpreter;
use crate::models::{BoundingBox, BoundingBoxAnswer, SpatialModel};
use crate::reasoner::{Reasoner, ReasonerCore, SpatialRequest};

const SYSTEM_INSTRUCTIONS: &str = r#"
Analyze the input image (which includes a visible coordinate grid) and the accompanying challenge prompt text.

Tasks:
1. Interpret the challenge prompt to understand what needs to be identified
2. Identify the precise target area on the main challenge canvas
3. Determine the minimal bounding box that encloses the target
4. Output the absolute pixel coordinates based on the coordinate grid

Response format:
```json
{
    "challenge_prompt": "description of the task",
    "bounding_boxes": {
      "top_left_x": 148,
      "top_left_y": 260,
      "bottom_right_x": 235,
      "bottom_right_y": 345
    }
}
```
"#;

pub struct SpatialBboxReasoner {
    core: ReasonerCore,
    model: SpatialModel,
}

impl SpatialBboxReasoner {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            core: ReasonerCore::new(config),
            model: config.spatial_model.clone(),
        }
    }

    pub fn cache_response(&self, path: &Path) {
        self.core.cache_response(path);
    }
}

#[async_trait]
impl Reasoner for SpatialBboxReasoner {
    type Request = SpatialRequest;
    type Output = BoundingBoxAnswer;

    fn retry_policy(&self) -> RetryPolicy {
        self.core.retry_policy()
    }

    fn fallback(&self, _request: &SpatialRequest) -> BoundingBoxAnswer {
        BoundingBoxAnswer::fallback()
    }

    async fn attempt(&mut self, request: &SpatialRequest) -> CapClawResult<BoundingBoxAnswer> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.model.as_str().to_string());

        let mut user_content = String::from(
            "Analyze these images to identify the target area and provide bounding box \
             coordinates. The first image shows the challenge, the second shows the \
             coordinate grid.",
        );
        if let Some(auxiliary) = request.auxiliary.as_deref().filter(|s| !s.is_empty()) {
            user_content.push_str("\n\nAdditional information: ");
            user_content.push_str(auxiliary);
        }

        let messages = [
            ChatMessage::system(SYSTEM_INSTRUCTIONS),
            ChatMessage::user(user_content),
        ];
        let options = ReasonerCore::format_options(0.1, 1024, None, None);

        let response = self
            .core
            .chat_with_images(
                &model,
                &messages,
                &[&request.screenshot, &request.grid_overlay],
                &options,
            )
            .await?;

        let payload = interpreter::interpret(response.text());
        Ok(reshape_bbox(&payload))
    }
}

fn reshape_bbox(payload: &Map<String, Value>) -> BoundingBoxAnswer {
    let challenge_prompt = payload
        .get("challenge_prompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or("bounding box challenge")
        .to_string();

    let bounding_boxes = payload
        .get("bounding_boxes")
        .and_then(|value| serde_json::from_value::<BoundingBox>(value.clone()).ok())
        .unwrap_or_else(|| {
            tracing::warn!("no valid bounding box in payload, using default rectangle");
            BoundingBox::fallback()
        });

    BoundingBoxAnswer {
        challenge_prompt,
        bounding_boxes,
    }
}
