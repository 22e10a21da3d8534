use std::sync::Arc;

use crate::config::PipelineSettings;
use crate::memory::{FeedbackRepository, GenerationRepository, GoldExampleRepository};
use crate::pipeline::Collaborators;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Everything the pipeline calls out to. Swapped for scripted fakes in tests.
    pub collaborators: Collaborators,
    /// Read side of memory, used by the HTTP layer to prime a request.
    pub gold_examples: Arc<dyn GoldExampleRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub generations: Arc<dyn GenerationRepository>,
    pub settings: PipelineSettings,
}
