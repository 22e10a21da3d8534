//! Refiner: regenerates flagged candidates in place, everything else passes through.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::within;
use crate::pipeline::candidates::{Candidate, SlotFailure, TextGenerator};
use crate::pipeline::gate::{FeedbackContext, REFINEMENT_THRESHOLD};
use crate::pipeline::prompts::{PromptContext, RefinementBrief};
use crate::pipeline::scorer::ScoreMap;

/// Refinement samples cooler than initial generation.
pub const REFINEMENT_TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Same length and order as the input; refined entries substituted.
    pub candidates: Vec<Candidate>,
    /// Indices whose artifact was actually replaced.
    pub refined: BTreeSet<usize>,
    pub failures: Vec<SlotFailure>,
}

/// Everything a refinement call needs besides the candidate itself.
pub struct RefinementInputs<'a> {
    pub base_context: &'a PromptContext,
    pub feedback: Option<&'a FeedbackContext>,
    pub scores: Option<&'a ScoreMap>,
    pub company_context: Option<&'a str>,
    pub timeout: Duration,
}

pub async fn refine_candidates(
    generator: Arc<dyn TextGenerator>,
    candidates: Vec<Candidate>,
    affected: &BTreeSet<usize>,
    inputs: RefinementInputs<'_>,
) -> RefinementOutcome {
    let benefit_keywords = Arc::new(inputs.base_context.job.benefit_keywords.clone());
    let timeout = inputs.timeout;
    let mut join_set = JoinSet::new();

    for candidate in candidates.iter().filter(|c| affected.contains(&c.index)) {
        let generator = Arc::clone(&generator);
        let index = candidate.index;

        let mut context = inputs.base_context.clone();
        context.candidate_index = index;
        context.company_context = inputs.company_context.map(str::to_string);
        context.refinement = Some(RefinementBrief {
            previous: candidate.artifact.clone(),
            score: inputs.scores.and_then(|s| s.get(index)),
            threshold: REFINEMENT_THRESHOLD,
            feedback: inputs
                .feedback
                .map(|f| f.lines_for(index))
                .unwrap_or_default(),
        });

        join_set.spawn(async move {
            let result = within(
                "text generator",
                timeout,
                generator.generate(&context, REFINEMENT_TEMPERATURE),
            )
            .await;
            (index, result)
        });
    }

    let mut candidates = candidates;
    let mut refined = BTreeSet::new();
    let mut failures = Vec::new();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Ok(mut artifact))) => {
                artifact.enforce_benefit_keywords(&benefit_keywords);
                if let Some(slot) = candidates.iter_mut().find(|c| c.index == index) {
                    slot.artifact = artifact;
                    slot.temperature = REFINEMENT_TEMPERATURE;
                    refined.insert(index);
                }
            }
            Ok((index, Err(e))) => {
                warn!("Refinement failed for candidate {index}, keeping previous version: {e}");
                failures.push(SlotFailure {
                    index,
                    error: e.to_string(),
                });
            }
            Err(e) => warn!("Refinement task join error: {e}"),
        }
    }
    failures.sort_by_key(|f| f.index);

    info!(
        "Refined {}/{} flagged candidates",
        refined.len(),
        affected.len()
    );
    RefinementOutcome {
        candidates,
        refined,
        failures,
    }
}
