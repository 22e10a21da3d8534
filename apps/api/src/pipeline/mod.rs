// Job-posting generation pipeline.
// Routes style, drafts N candidates in parallel, scores, optionally refines, then curates.
// All model calls go through the collaborator traits below, never the LLM client directly.

pub mod candidates;
pub mod curator;
pub mod gate;
pub mod handlers;
pub mod orchestrator;
pub mod persistence;
pub mod prompts;
pub mod refiner;
pub mod scorer;
pub mod state;

use std::sync::Arc;

use thiserror::Error;

use crate::company::CompanyContextProvider;
use crate::pipeline::candidates::TextGenerator;
use crate::pipeline::persistence::PersistenceBridge;
use crate::pipeline::scorer::Judge;
use crate::style::retriever::ChunkRetriever;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("generation count {0} outside 2..=5")]
    InvalidGenerationCount(usize),

    #[error("all {attempted} generation slots failed")]
    GenerationExhausted { attempted: usize },
}

/// Every external dependency the pipeline calls, behind a trait object.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub judge: Arc<dyn Judge>,
    pub retriever: Arc<dyn ChunkRetriever>,
    pub company: Arc<dyn CompanyContextProvider>,
    pub persistence: PersistenceBridge,
}
