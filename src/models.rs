//! Typed answers produced by the task reasoners, plus the capability-scoped
//! model identifiers. Every answer type has a documented `fallback()` that
//! satisfies the same schema as a successful parse, so downstream consumers
//! (the pointer-action executor) never see a malformed result.

use serde::{Deserialize, Serialize};

/// Default vision model for both capabilities.
pub const DEFAULT_MODEL: &str = "llava:latest";

/// Model used for fast classification and routing calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FastShotModel(pub String);

/// Model used for spatial chain-of-thought calls (points, boxes, paths).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialModel(pub String);

impl FastShotModel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SpatialModel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FastShotModel {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

impl Default for SpatialModel {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    ImageLabelSingleSelect,
    ImageLabelMultiSelect,
    ImageDragSingle,
    ImageDragMulti,
}

impl ChallengeType {
    /// Ordering matters: the first label is the classifier's fallback.
    pub const ALL: [ChallengeType; 4] = [
        ChallengeType::ImageLabelSingleSelect,
        ChallengeType::ImageLabelMultiSelect,
        ChallengeType::ImageDragSingle,
        ChallengeType::ImageDragMulti,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::ImageLabelSingleSelect => "image_label_single_select",
            ChallengeType::ImageLabelMultiSelect => "image_label_multi_select",
            ChallengeType::ImageDragSingle => "image_drag_single",
            ChallengeType::ImageDragMulti => "image_drag_multi",
        }
    }

    /// Substring search over free-form model output. Tolerates answers like
    /// "The challenge is `image_drag_single`." that a strict parse would miss.
    pub fn from_text(text: &str) -> Option<ChallengeType> {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|variant| lowered.contains(variant.as_str()))
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterResult {
    pub challenge_prompt: String,
    pub challenge_type: ChallengeType,
}

impl RouterResult {
    pub fn fallback() -> Self {
        Self {
            challenge_prompt: "unknown challenge".to_string(),
            challenge_type: ChallengeType::ALL[0],
        }
    }
}

/// One selected tile in a 3x3 grid challenge, as `[row, col]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub box_2d: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSelection {
    pub challenge_prompt: String,
    pub coordinates: Vec<GridCell>,
}

impl GridSelection {
    pub fn fallback() -> Self {
        Self {
            challenge_prompt: "error occurred".to_string(),
            coordinates: vec![GridCell { box_2d: [1, 1] }],
        }
    }
}

/// Axis-aligned rectangle in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top_left_x: i64,
    pub top_left_y: i64,
    pub bottom_right_x: i64,
    pub bottom_right_y: i64,
}

impl BoundingBox {
    pub fn fallback() -> Self {
        Self {
            top_left_x: 150,
            top_left_y: 150,
            bottom_right_x: 350,
            bottom_right_y: 350,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxAnswer {
    pub challenge_prompt: String,
    pub bounding_boxes: BoundingBox,
}

impl BoundingBoxAnswer {
    pub fn fallback() -> Self {
        Self {
            challenge_prompt: "error occurred".to_string(),
            bounding_boxes: BoundingBox::fallback(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPath {
    pub start_point: Point,
    pub end_point: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPathsAnswer {
    pub challenge_prompt: String,
    pub paths: Vec<DragPath>,
}

impl DragPathsAnswer {
    pub fn fallback() -> Self {
        Self {
            challenge_prompt: "error occurred".to_string(),
            paths: vec![DragPath {
                start_point: Point { x: 500, y: 200 },
                end_point: Point { x: 300, y: 300 },
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickPointsAnswer {
    pub challenge_prompt: String,
    pub points: Vec<Point>,
}

impl ClickPointsAnswer {
    pub fn fallback() -> Self {
        Self {
            challenge_prompt: "error occurred - using fallback".to_string(),
            points: vec![Point { x: 325, y: 467 }, Point { x: 515, y: 647 }],
        }
    }
}

/// Union of all task answers, tagged for consumers that dispatch on kind
/// (e.g. a pointer-action executor mapping answers to clicks and drags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredAnswer {
    Classification {
        challenge_prompt: String,
        challenge_type: ChallengeType,
    },
    Router(RouterResult),
    Grid(GridSelection),
    Bbox(BoundingBoxAnswer),
    Drag(DragPathsAnswer),
    Points(ClickPointsAnswer),
}

impl From<ChallengeType> for StructuredAnswer {
    fn from(challenge_type: ChallengeType) -> Self {
        StructuredAnswer::Classification {
            challenge_prompt: "challenge classification".to_string(),
            challenge_type,
        }
    }
}

impl From<RouterResult> for StructuredAnswer {
    fn from(answer: RouterResult) -> Self {
        StructuredAnswer::Router(answer)
    }
}

impl From<GridSelection> for StructuredAnswer {
    fn from(answer: GridSelection) -> Self {
        StructuredAnswer::Grid(answer)
    }
}

impl From<BoundingBoxAnswer> for StructuredAnswer {
    fn from(answer: BoundingBoxAnswer) -> Self {
        StructuredAnswer::Bbox(answer)
    }
}

impl From<DragPathsAnswer> for StructuredAnswer {
    fn from(answer: DragPathsAnswer) -> Self {
        StructuredAnswer::Drag(answer)
    }
}

impl From<ClickPointsAnswer> for StructuredAnswer {
    fn from(answer: ClickPointsAnswer) -> Self {
        StructuredAnswer::Points(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_type_from_text_matches_substrings() {
        let text = "I believe this is an image_drag_single challenge.";
        assert_eq!(
            ChallengeType::from_text(text),
            Some(ChallengeType::ImageDragSingle)
        );
        assert_eq!(ChallengeType::from_text("no label here"), None);
    }

    #[test]
    fn challenge_type_from_text_is_case_insensitive() {
        assert_eq!(
            ChallengeType::from_text("IMAGE_LABEL_MULTI_SELECT"),
            Some(ChallengeType::ImageLabelMultiSelect)
        );
    }

    #[test]
    fn challenge_type_serializes_snake_case() {
        let json = serde_json::to_string(&ChallengeType::ImageLabelSingleSelect).unwrap();
        assert_eq!(json, "\"image_label_single_select\"");
    }

    #[test]
    fn fallbacks_satisfy_the_success_schema() {
        let grid = GridSelection::fallback();
        assert_eq!(grid.coordinates, vec![GridCell { box_2d: [1, 1] }]);
        assert!(!grid.challenge_prompt.is_empty());

        let points = ClickPointsAnswer::fallback();
        assert_eq!(points.points.len(), 2);
        assert!(!points.challenge_prompt.is_empty());

        let bbox = BoundingBoxAnswer::fallback();
        assert!(bbox.bounding_boxes.top_left_x < bbox.bounding_boxes.bottom_right_x);
    }

    #[test]
    fn structured_answer_tags_by_kind() {
        let answer: StructuredAnswer = ClickPointsAnswer::fallback().into();
        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value["kind"], "points");
        assert!(value["points"].is_array());
    }
}
