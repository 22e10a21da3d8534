//! Workflow state for one request, owned by the orchestrator alone.
//!
//! Stages form a fixed graph:
//! `Start -> {Routing, Scraping} -> Generating -> Scoring -> Gate ->
//! [Refining -> Rescoring] -> Curating -> Persisting -> Done`.
//! Scraping runs beside Routing/Generating and joins before Scoring.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, error};

use crate::company::CompanyContext;
use crate::pipeline::candidates::Candidate;
use crate::pipeline::gate::FeedbackContext;
use crate::pipeline::scorer::ScoreMap;
use crate::style::assembler::StyleDirective;
use crate::style::router::StyleProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Routing,
    Scraping,
    Generating,
    Scoring,
    Gate,
    Refining,
    Rescoring,
    Curating,
    Persisting,
    Done,
}

impl Stage {
    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Start, Routing)
                | (Start, Scraping)
                | (Routing, Generating)
                | (Scraping, Scoring)
                | (Generating, Scoring)
                | (Scoring, Gate)
                | (Gate, Refining)
                | (Gate, Curating)
                | (Refining, Rescoring)
                | (Rescoring, Curating)
                | (Curating, Persisting)
                | (Persisting, Done)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Routing => "routing",
            Stage::Scraping => "scraping",
            Stage::Generating => "generating",
            Stage::Scoring => "scoring",
            Stage::Gate => "gate",
            Stage::Refining => "refining",
            Stage::Rescoring => "rescoring",
            Stage::Curating => "curating",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that absorbed a collaborator failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedStage {
    pub stage: Stage,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub stage: Stage,
    pub history: Vec<Stage>,
    pub profile: Option<StyleProfile>,
    pub directive: Option<StyleDirective>,
    pub candidates: Vec<Candidate>,
    pub scores: Option<ScoreMap>,
    pub refined_indices: BTreeSet<usize>,
    pub company_context: Option<CompanyContext>,
    pub feedback_context: Option<FeedbackContext>,
    pub winner: Option<Candidate>,
    pub degraded: Vec<DegradedStage>,
}

impl WorkflowState {
    pub fn new(feedback_context: Option<FeedbackContext>) -> Self {
        Self {
            stage: Stage::Start,
            history: vec![Stage::Start],
            profile: None,
            directive: None,
            candidates: Vec::new(),
            scores: None,
            refined_indices: BTreeSet::new(),
            company_context: None,
            feedback_context,
            winner: None,
            degraded: Vec::new(),
        }
    }

    /// Moves along the main path. Transitions outside the stage graph are a bug.
    pub fn advance(&mut self, next: Stage) {
        if !self.stage.can_transition_to(next) {
            error!("Invalid workflow transition {} -> {}", self.stage, next);
            debug_assert!(false, "invalid workflow transition {} -> {next}", self.stage);
        }
        debug!("Workflow stage {} -> {}", self.stage, next);
        self.stage = next;
        self.history.push(next);
    }

    pub fn degrade(&mut self, stage: Stage, detail: impl Into<String>) {
        self.degraded.push(DegradedStage {
            stage,
            detail: detail.into(),
        });
    }
}
