//! Candidate Generator Coordinator.
//!
//! Fans out `n` independent writer calls with deterministic temperature jitter.
//! A failed slot is retried once and then dropped; the stage only fails when
//! every slot failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{within, CollaboratorError};
use crate::llm_client::LlmClient;
use crate::models::job::JobBody;
use crate::pipeline::prompts::{render_writer_prompt, writer_system, PromptContext};
use crate::pipeline::PipelineError;
use crate::style::signals::{CompanyType, Formality, Industry, Seniority, SignalTuple};

pub const MIN_CANDIDATES: usize = 2;
pub const MAX_CANDIDATES: usize = 5;
/// Temperature offset added per candidate index.
pub const JITTER_STEP: f64 = 0.10;
pub const MIN_TEMPERATURE: f64 = 0.10;
pub const MAX_BASE_TEMPERATURE: f64 = 0.75;
pub const MAX_JITTERED_TEMPERATURE: f64 = 0.90;
/// First attempt plus one retry.
const ATTEMPTS_PER_SLOT: usize = 2;

/// Number of candidates to generate, validated to `MIN_CANDIDATES..=MAX_CANDIDATES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationCount(usize);

impl GenerationCount {
    pub fn new(n: usize) -> Result<Self, PipelineError> {
        if (MIN_CANDIDATES..=MAX_CANDIDATES).contains(&n) {
            Ok(Self(n))
        } else {
            Err(PipelineError::InvalidGenerationCount(n))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for GenerationCount {
    fn default() -> Self {
        Self(3)
    }
}

/// One competing artifact. `index` is its durable identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub index: usize,
    pub artifact: JobBody,
    pub temperature: f64,
}

/// A slot (generation, scoring or refinement) that produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotFailure {
    pub index: usize,
    pub error: String,
}

/// Text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        context: &PromptContext,
        temperature: f64,
    ) -> Result<JobBody, CollaboratorError>;
}

/// Writes postings with Claude, one JSON `JobBody` per call.
pub struct LlmJobWriter(pub LlmClient);

#[async_trait]
impl TextGenerator for LlmJobWriter {
    async fn generate(
        &self,
        context: &PromptContext,
        temperature: f64,
    ) -> Result<JobBody, CollaboratorError> {
        let prompt = render_writer_prompt(context);
        let system = writer_system(context.job.language);
        debug!(
            "Writer call for candidate {}: {} prompt chars at temperature {temperature:.2}",
            context.candidate_index,
            prompt.len()
        );

        let body: JobBody = self.0.call_json(&prompt, &system, temperature).await?;
        if body.job_description.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "writer returned an empty job_description".to_string(),
            ));
        }
        Ok(body)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Temperature
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStep {
    pub reason: String,
    pub delta: f64,
}

/// How the base temperature was derived, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureBreakdown {
    pub start: f64,
    pub steps: Vec<TemperatureStep>,
    pub value: f64,
}

/// Base sampling temperature from fixed additive adjustments, clamped to
/// `[MIN_TEMPERATURE, MAX_BASE_TEMPERATURE]`.
pub fn base_temperature(signals: &SignalTuple) -> TemperatureBreakdown {
    let start = match signals.formality {
        Formality::Formal => 0.20,
        Formality::Casual => 0.55,
        Formality::Neutral | Formality::Unknown => 0.35,
    };

    let mut steps = Vec::new();
    let mut push = |reason: String, delta: f64| steps.push(TemperatureStep { reason, delta });

    match signals.company_type {
        CompanyType::Startup => push("company_type=startup".to_string(), 0.05),
        CompanyType::PublicSector => push("company_type=public_sector".to_string(), -0.05),
        _ => {}
    }
    match signals.seniority {
        Seniority::Senior | Seniority::Lead | Seniority::Principal => {
            push(format!("seniority={}", signals.seniority), -0.05)
        }
        Seniority::Intern | Seniority::Junior => {
            push(format!("seniority={}", signals.seniority), 0.05)
        }
        _ => {}
    }
    match signals.industry {
        Industry::Finance | Industry::Healthcare | Industry::PublicIt => {
            push(format!("industry={}", signals.industry), -0.05)
        }
        Industry::AiStartup | Industry::Ecommerce => {
            push(format!("industry={}", signals.industry), 0.05)
        }
        _ => {}
    }

    let raw = start + steps.iter().map(|s| s.delta).sum::<f64>();
    TemperatureBreakdown {
        start,
        steps,
        value: round2(raw.clamp(MIN_TEMPERATURE, MAX_BASE_TEMPERATURE)),
    }
}

/// `base + index * JITTER_STEP`, clamped to `[MIN_TEMPERATURE, MAX_JITTERED_TEMPERATURE]`.
pub fn jittered_temperature(base: f64, index: usize) -> f64 {
    round2((base + index as f64 * JITTER_STEP).clamp(MIN_TEMPERATURE, MAX_JITTERED_TEMPERATURE))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Fan-out
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedSet {
    /// Surviving candidates in index order.
    pub candidates: Vec<Candidate>,
    pub failures: Vec<SlotFailure>,
}

/// Generates `count` candidates concurrently. Output order is by index,
/// independent of completion order.
pub async fn generate_candidates(
    generator: Arc<dyn TextGenerator>,
    context: &PromptContext,
    count: GenerationCount,
    base_temperature: f64,
    timeout: Duration,
) -> Result<GeneratedSet, PipelineError> {
    let n = count.get();
    let benefit_keywords = Arc::new(context.job.benefit_keywords.clone());
    let mut join_set = JoinSet::new();

    for index in 0..n {
        let generator = Arc::clone(&generator);
        let mut slot_context = context.clone();
        slot_context.candidate_index = index;
        let temperature = jittered_temperature(base_temperature, index);

        join_set.spawn(async move {
            let mut outcome = call_writer(generator.as_ref(), &slot_context, temperature, timeout).await;
            for attempt in 1..ATTEMPTS_PER_SLOT {
                let Err(e) = &outcome else { break };
                warn!("Candidate {index} attempt {attempt} failed, retrying: {e}");
                outcome = call_writer(generator.as_ref(), &slot_context, temperature, timeout).await;
            }
            (index, temperature, outcome)
        });
    }

    let mut slots: Vec<Option<Candidate>> = vec![None; n];
    let mut failures = Vec::new();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, temperature, Ok(mut artifact))) => {
                artifact.enforce_benefit_keywords(&benefit_keywords);
                slots[index] = Some(Candidate {
                    index,
                    artifact,
                    temperature,
                });
            }
            Ok((index, _, Err(e))) => {
                warn!("Candidate {index} dropped after {ATTEMPTS_PER_SLOT} attempts: {e}");
                failures.push(SlotFailure {
                    index,
                    error: e.to_string(),
                });
            }
            Err(e) => warn!("Candidate task join error: {e}"),
        }
    }

    for (index, slot) in slots.iter().enumerate() {
        if slot.is_none() && !failures.iter().any(|f| f.index == index) {
            failures.push(SlotFailure {
                index,
                error: "generation task aborted".to_string(),
            });
        }
    }
    failures.sort_by_key(|f| f.index);

    let candidates: Vec<Candidate> = slots.into_iter().flatten().collect();
    if candidates.is_empty() {
        return Err(PipelineError::GenerationExhausted { attempted: n });
    }

    info!("Generated {}/{} candidates", candidates.len(), n);
    Ok(GeneratedSet {
        candidates,
        failures,
    })
}

async fn call_writer(
    generator: &dyn TextGenerator,
    context: &PromptContext,
    temperature: f64,
    timeout: Duration,
) -> Result<JobBody, CollaboratorError> {
    within("text generator", timeout, generator.generate(context, temperature)).await
}
