//! CapClaw — turns free-form output from a vision LLM (served over the
//! Ollama HTTP API) into strongly-typed challenge answers: classification
//! labels, click points, bounding boxes, and drag paths.
//!
//! The contract is structural, not semantic: every invocation returns a
//! well-typed answer. Transport failures are retried; schema violations in
//! the model's reply resolve to documented fallback defaults instead of
//! propagating. Screenshot capture and pointer execution are external
//! collaborators and out of scope here.

pub mod bridge;
pub mod config;
pub mod errors;
pub mod inference;
pub mod interpreter;
pub mod models;
pub mod reasoner;

pub use config::{load_config, save_config, RetryPolicy, SolverConfig};
pub use errors::{CapClawError, CapClawResult};
pub use inference::client::OllamaClient;
pub use models::{
    BoundingBox, BoundingBoxAnswer, ChallengeType, ClickPointsAnswer, DragPath, DragPathsAnswer,
    FastShotModel, GridCell, GridSelection, Point, RouterResult, SpatialModel, StructuredAnswer,
};
pub use reasoner::{
    ChallengeClassifier, ChallengeRouter, ImageClassifier, Reasoner, ScreenshotRequest,
    SpatialBboxReasoner, SpatialPathReasoner, SpatialPointReasoner, SpatialRequest,
};

/// Install a `tracing` subscriber reading `RUST_LOG`, defaulting to `info`.
/// Opt-in for binaries and examples; the library itself only emits events.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
