//! Grid-image classification: which tiles of a 3x3 grid match the prompt.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{RetryPolicy, SolverConfig};
use crate::errors::CapClawResult;
use crate::inference::types::ChatMessage;
use crate::interpreter;
use crate::models::{GridCell, GridSelection, SpatialModel};
use crate::reasoner::{Reasoner, ReasonerCore, ScreenshotRequest};

const SYSTEM_INSTRUCTIONS: &str = r#"
You are an AI assistant that solves image-based challenges. You need to analyze a 3x3 grid of images and identify which images match the given prompt.

The grid is arranged as follows:
[0,0] [0,1] [0,2]
[1,0] [1,1] [1,2]
[2,0] [2,1] [2,2]

You must return your answer in the following JSON format:
```json
{
  "challenge_prompt": "description of the challenge",
  "coordinates": [
    {"box_2d": [row, col]},
    {"box_2d": [row, col]}
  ]
}
```

Only return coordinates for images that match the prompt. Analyze carefully and be precise in your selections.
"#;

pub struct ImageClassifier {
    core: ReasonerCore,
    model: SpatialModel,
}

impl ImageClassifier {
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
impl Reasoner for ImageClassifier {
    type Request = ScreenshotRequest;
    type Output = GridSelection;

    fn retry_policy(&self) -> RetryPolicy {
        self.core.retry_policy()
    }

    fn fallback(&self, _request: &ScreenshotRequest) -> GridSelection {
        GridSelection::fallback()
    }

    async fn attempt(&mut self, request: &ScreenshotRequest) -> CapClawResult<GridSelection> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.model.as_str().to_string());
        let messages = [
            ChatMessage::system(SYSTEM_INSTRUCTIONS),
            ChatMessage::user(
                "Please analyze this 3x3 grid image and identify which images match the \
                 challenge prompt. Return the coordinates in the specified JSON format.",
            ),
        ];
        let options = ReasonerCore::format_options(0.1, 1024, None, None);

        let response = self
            .core
            .chat_with_images(&model, &messages, &[&request.screenshot], &options)
            .await?;

        let payload = interpreter::interpret(response.text());
        Ok(reshape_grid(&payload))
    }
}

/// Keep well-formed `[row, col]` entries; anything invalid or empty falls
/// back to the single default cell.
fn reshape_grid(payload: &Map<String, Value>) -> GridSelection {
    let challenge_prompt = payload
        .get("challenge_prompt")
        .and_then(Value::as_str)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(interpreter::SENTINEL_PROMPT)
        .to_string();

    let mut coordinates: Vec<GridCell> = payload
        .get("coordinates")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    if coordinates.is_empty() {
        tracing::warn!("no valid grid cells in payload, using default cell");
        coordinates = vec![GridCell { box_2d: [1, 1] }];
    }

    GridSelection {
        challenge_prompt,
        coordinates,
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
    fn reshape_keeps_valid_cells() {
        let selection = reshape_grid(&payload(json!({
            "challenge_prompt": "select all deer",
            "coordinates": [{"box_2d": [0, 1]}, {"box_2d": [2, 2]}],
        })));
        assert_eq!(selection.challenge_prompt, "select all deer");
        assert_eq!(
            selection.coordinates,
            vec![GridCell { box_2d: [0, 1] }, GridCell { box_2d: [2, 2] }]
        );
    }

    #[test]
    fn reshape_drops_malformed_cells_but_keeps_the_rest() {
        let selection = reshape_grid(&payload(json!({
            "challenge_prompt": "select all deer",
            "coordinates": [{"box_2d": "garbage"}, {"box_2d": [1, 2]}],
        })));
        assert_eq!(selection.coordinates, vec![GridCell { box_2d: [1, 2] }]);
    }

    #[test]
    fn reshape_defaults_to_the_single_default_cell() {
        let selection = reshape_grid(&payload(json!({
            "challenge_prompt": "select all deer",
        })));
        assert_eq!(selection.coordinates, vec![GridCell { box_2d: [1, 1] }]);
    }

    #[test]
    fn sentinel_payload_reshapes_cleanly() {
        let selection = reshape_grid(&interpreter::sentinel_payload());
        assert_eq!(selection.challenge_prompt, interpreter::SENTINEL_PROMPT);
        assert_eq!(selection.coordinates, vec![GridCell { box_2d: [1, 1] }]);
    }
}
