//! Drag-path reasoning: where to pick an element up and where to drop it.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{RetryPolicy, SolverConfig};
use crate::errors::CapClawResult;
use crate::inference::types::ChatMessage;
use crate::interpreter;
use crate::models::{DragPath, DragPathsAnswer, Point, SpatialModel};
use crate::reasoner::{Reasoner, ReasonerCore, SpatialRequest};

const SYSTEM_INSTRUCTIONS: &str = r#"
You are an expert at solving drag-and-drop puzzle challenges. Analyze the provided images to determine where objects should be dragged.

Rules for Drag-Drop Analysis:
1. Identify what needs to be dragged (usually on the right side)
2. Identify where it should be placed (usually on the left canvas)
3. Determine start and end coordinates based on the coordinate grid
4. Consider the shape, pattern, and context clues

Response format:
```json
{
  "challenge_prompt": "Task description",
  "paths": [
    {"start_point": {"x": x1, "y": y1}, "end_point": {"x": x2, "y": y2}}
  ]
}
```

Analyze both the challenge image and coordinate grid to determine precise pixel coordinates for the drag path.
"#;

pub struct SpatialPathReasoner {
    core: ReasonerCore,
    model: SpatialModel,
}

impl SpatialPathReasoner {
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
impl Reasoner for SpatialPathReasoner {
    type Request = SpatialRequest;
    type Output = DragPathsAnswer;

    fn retry_policy(&self) -> RetryPolicy {
        self.core.retry_policy()
    }

    fn fallback(&self, _request: &SpatialRequest) -> DragPathsAnswer {
        DragPathsAnswer::fallback()
    }

    async fn attempt(&mut self, request: &SpatialRequest) -> CapClawResult<DragPathsAnswer> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.model.as_str().to_string());

        let mut user_content = String::from(
            "Analyze these drag-and-drop challenge images. The first shows the challenge, \
             the second shows the coordinate grid. Determine the drag path from source to \
             destination.",
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
        Ok(reshape_paths(&payload))
    }
}

fn reshape_paths(payload: &Map<String, Value>) -> DragPathsAnswer {
    let challenge_prompt = payload
        .get("challenge_prompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or("drag and drop challenge")
        .to_string();

    let mut paths: Vec<DragPath> = payload
        .get("paths")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    if paths.is_empty() {
        tracing::warn!("no valid drag paths in payload, using default path");
        paths = vec![DragPath {
            start_point: Point { x: 500, y: 200 },
            end_point: Point { x: 300, y: 300 },
        }];
    }

    DragPathsAnswer {
        challenge_prompt,
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn reshape_keeps_valid_paths() {
        let answer = reshape_paths(&payload(json!({
            "challenge_prompt": "complete the puzzle",
            "paths": [
                {"start_point": {"x": 610, "y": 240}, "end_point": {"x": 220, "y": 310}},
            ],
        })));
        assert_eq!(answer.challenge_prompt, "complete the puzzle");
        assert_eq!(
            answer.paths,
            vec![DragPath {
                start_point: Point { x: 610, y: 240 },
                end_point: Point { x: 220, y: 310 },
            }]
        );
    }

    #[test]
    fn reshape_defaults_missing_paths() {
        let answer = reshape_paths(&payload(json!({"challenge_prompt": "drag it"})));
        assert_eq!(
            answer.paths,
            vec![DragPath {
                start_point: Point { x: 500, y: 200 },
                end_point: Point { x: 300, y: 300 },
            }]
        );
    }

    #[test]
    fn reshape_defaults_when_every_path_is_malformed() {
        let answer = reshape_paths(&payload(json!({
            "paths": [{"start_point": {"x": 1}}, 42],
        })));
        assert_eq!(answer.challenge_prompt, "drag and drop challenge");
        assert_eq!(answer.paths.len(), 1);
        assert_eq!(answer.paths[0].start_point, Point { x: 500, y: 200 });
    }
}
