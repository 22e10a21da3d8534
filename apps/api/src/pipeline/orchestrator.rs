//! Orchestrator: runs one request through the fixed stage graph.
//!
//! Routing (then style assembly and generation) runs concurrently with the
//! company-context fetch; both join before scoring. The gate is the only
//! branch. Persistence is spawned and never awaited here.

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::company::{CompanyContext, CompanyRef};
use crate::config::PipelineSettings;
use crate::models::job::{JobBody, JobSpec};
use crate::pipeline::candidates::{
    base_temperature, generate_candidates, Candidate, GenerationCount, GeneratedSet,
    TemperatureBreakdown,
};
use crate::pipeline::curator::{select, Ranking};
use crate::pipeline::gate::{needs_refinement, FeedbackContext, RefinementTrigger};
use crate::pipeline::persistence::{PersistReport, PersistRequest};
use crate::pipeline::prompts::{PromptContext, MAX_GOLD_EXAMPLES};
use crate::pipeline::refiner::{refine_candidates, RefinementInputs};
use crate::pipeline::scorer::{score_candidates, ScoreMap, ScoringReport};
use crate::pipeline::state::{DegradedStage, Stage, WorkflowState};
use crate::pipeline::{Collaborators, PipelineError};
use crate::style::assembler::{assemble, AssembledStyle};
use crate::style::router::{explain, route, StyleProfile};

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub user_id: Uuid,
    pub job: JobSpec,
    pub generation_count: GenerationCount,
    pub feedback: Option<FeedbackContext>,
    pub company: Option<CompanyRef>,
    pub gold_examples: Vec<JobBody>,
    /// Hard overrides (legal, brand, role) in precedence order.
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub profile: StyleProfile,
    pub routing: Vec<String>,
    pub temperature: TemperatureBreakdown,
    pub initial_scores: Option<ScoreMap>,
    /// The map the Curator used: rescored after refinement, else the initial one.
    pub scores: Option<ScoreMap>,
    pub refinement_trigger: Option<RefinementTrigger>,
    pub flagged_indices: BTreeSet<usize>,
    pub refined_indices: BTreeSet<usize>,
    pub rankings: Vec<Ranking>,
    pub fallback: bool,
    pub company_context: bool,
    pub degraded: Vec<DegradedStage>,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub generation_id: Uuid,
    pub winner: Candidate,
    pub diagnostics: Diagnostics,
}

/// A finished run plus the still-running persistence task.
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub persistence: JoinHandle<PersistReport>,
}

struct Drafting {
    profile: StyleProfile,
    routing: Vec<String>,
    assembled: AssembledStyle,
    temperature: TemperatureBreakdown,
    context: PromptContext,
    generated: Result<GeneratedSet, PipelineError>,
}

/// Runs the full pipeline for one request. Only generation exhaustion fails it.
pub async fn run_pipeline(
    collaborators: &Collaborators,
    settings: &PipelineSettings,
    request: PipelineRequest,
) -> Result<PipelineRun, PipelineError> {
    let generation_id = Uuid::new_v4();
    let mut state = WorkflowState::new(request.feedback.clone());
    info!(
        "Pipeline {generation_id} started: '{}' x{}",
        request.job.job_title,
        request.generation_count.get()
    );

    state.advance(Stage::Routing);
    let (company_context, drafting) = tokio::join!(
        fetch_company_context(collaborators, settings, request.company.as_ref()),
        draft(collaborators, settings, &request),
    );

    let Drafting {
        profile,
        routing,
        assembled,
        temperature,
        context,
        generated,
    } = drafting;
    state.profile = Some(profile.clone());
    state.directive = Some(assembled.directive.clone());
    for failure in &assembled.retrieval_failures {
        state.degrade(Stage::Routing, format!("style retrieval: {failure}"));
    }
    for dimension in &assembled.backfilled {
        state.degrade(Stage::Routing, format!("style {dimension} filled from defaults"));
    }

    state.advance(Stage::Generating);
    let generated = generated?;
    for failure in &generated.failures {
        state.degrade(
            Stage::Generating,
            format!("candidate {}: {}", failure.index, failure.error),
        );
    }
    state.candidates = generated.candidates;

    state.company_context = company_context;
    if request.company.is_some() && state.company_context.is_none() {
        state.degrade(Stage::Scraping, "company context unavailable");
    }

    state.advance(Stage::Scoring);
    let initial = score(collaborators, settings, &request.job.job_title, &state.candidates).await;
    record_scoring(&mut state, Stage::Scoring, &initial);
    let initial_scores = initial.scores;
    state.scores = initial_scores.clone();

    state.advance(Stage::Gate);
    let indices: Vec<usize> = state.candidates.iter().map(|c| c.index).collect();
    let decision = needs_refinement(
        state.scores.as_ref(),
        state.feedback_context.as_ref(),
        &indices,
    );

    if decision.refine {
        info!(
            "Refinement triggered ({:?}) for candidates {:?}",
            decision.trigger, decision.affected
        );
        state.advance(Stage::Refining);
        let candidates = std::mem::take(&mut state.candidates);
        let refined = refine_candidates(
            collaborators.generator.clone(),
            candidates,
            &decision.affected,
            RefinementInputs {
                base_context: &context,
                feedback: state.feedback_context.as_ref(),
                scores: state.scores.as_ref(),
                company_context: state.company_context.as_ref().map(|c| c.text.as_str()),
                timeout: settings.generation_timeout,
            },
        )
        .await;
        for failure in &refined.failures {
            state.degrade(
                Stage::Refining,
                format!("candidate {}: {}", failure.index, failure.error),
            );
        }
        state.candidates = refined.candidates;
        state.refined_indices = refined.refined;

        state.advance(Stage::Rescoring);
        let rescored = score(collaborators, settings, &request.job.job_title, &state.candidates).await;
        record_scoring(&mut state, Stage::Rescoring, &rescored);
        state.scores = rescored.scores;
    }

    state.advance(Stage::Curating);
    let selection = select(&state.candidates, state.scores.as_ref()).ok_or(
        PipelineError::GenerationExhausted {
            attempted: request.generation_count.get(),
        },
    )?;
    state.winner = Some(selection.winner.clone());

    state.advance(Stage::Persisting);
    let persistence = collaborators.persistence.spawn(PersistRequest {
        generation_id,
        user_id: request.user_id,
        job_title: request.job.job_title.clone(),
        language: request.job.language,
        profile: serde_json::to_value(&profile).unwrap_or_default(),
        winner: selection.winner.clone(),
        scores: state.scores.clone(),
        refined_indices: state.refined_indices.iter().copied().collect(),
        request_feedback: request
            .feedback
            .as_ref()
            .map(|f| f.notes.clone())
            .unwrap_or_default(),
    });

    state.advance(Stage::Done);
    info!(
        "Pipeline {generation_id} done: winner candidate {} (fallback: {}, degraded stages: {})",
        selection.winner.index,
        selection.fallback,
        state.degraded.len()
    );

    let outcome = PipelineOutcome {
        generation_id,
        winner: selection.winner,
        diagnostics: Diagnostics {
            profile,
            routing,
            temperature,
            initial_scores,
            scores: state.scores,
            refinement_trigger: decision.trigger,
            flagged_indices: decision.affected,
            refined_indices: state.refined_indices,
            rankings: selection.rankings,
            fallback: selection.fallback,
            company_context: state.company_context.is_some(),
            degraded: state.degraded,
            stages: state.history,
        },
    };

    Ok(PipelineRun {
        outcome,
        persistence,
    })
}

/// Routing branch: route, assemble the style kit, generate candidates.
async fn draft(
    collaborators: &Collaborators,
    settings: &PipelineSettings,
    request: &PipelineRequest,
) -> Drafting {
    let job = request.job.with_industry_defaults();
    let profile = route(&request.job.signals).with_constraints(request.constraints.clone());
    let routing = explain(&request.job.signals);

    let assembled = assemble(
        &profile,
        job.language,
        collaborators.retriever.as_ref(),
        settings.retrieval_timeout,
    )
    .await;

    let temperature = base_temperature(&job.signals);
    let context = PromptContext {
        candidate_index: 0,
        style_block: assembled.directive.to_prompt_block(job.language),
        job,
        company_context: None,
        gold_examples: request
            .gold_examples
            .iter()
            .take(MAX_GOLD_EXAMPLES)
            .cloned()
            .collect(),
        refinement: None,
    };

    let generated = generate_candidates(
        collaborators.generator.clone(),
        &context,
        request.generation_count,
        temperature.value,
        settings.generation_timeout,
    )
    .await;

    Drafting {
        profile,
        routing,
        assembled,
        temperature,
        context,
        generated,
    }
}

/// Scraping branch. Never fails; timeouts and errors yield `None`.
async fn fetch_company_context(
    collaborators: &Collaborators,
    settings: &PipelineSettings,
    company: Option<&CompanyRef>,
) -> Option<CompanyContext> {
    let company = company?;
    match tokio::time::timeout(settings.scrape_timeout, collaborators.company.fetch(company)).await
    {
        Ok(context) => context,
        Err(_) => {
            warn!(
                "Company context fetch timed out after {}s",
                settings.scrape_timeout.as_secs()
            );
            None
        }
    }
}

async fn score(
    collaborators: &Collaborators,
    settings: &PipelineSettings,
    job_title: &str,
    candidates: &[Candidate],
) -> ScoringReport {
    score_candidates(
        collaborators.judge.clone(),
        job_title,
        candidates,
        settings.judge_timeout,
    )
    .await
}

fn record_scoring(state: &mut WorkflowState, stage: Stage, report: &ScoringReport) {
    if report.scores.is_none() {
        state.degrade(stage, "scorer unavailable, curator falls back to lowest index");
        return;
    }
    for failure in &report.failures {
        state.degrade(
            stage,
            format!("candidate {} unscored: {}", failure.index, failure.error),
        );
    }
    for index in &report.clamped {
        state.degrade(stage, format!("candidate {index} score clamped into [0, 1]"));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::gate::FeedbackNote;
    use crate::style::scoring_table::Color;
    use crate::style::signals::{CompanyType, Formality, Industry, Seniority, SignalTuple};
    use crate::testing::{
        job_spec, CollaboratorsBuilder, InMemoryStore, ScriptedGenerator, ScriptedJudge,
        ScriptedRetriever, StaticCompanyProvider,
    };

    fn request(count: usize) -> PipelineRequest {
        PipelineRequest {
            user_id: Uuid::from_u128(42),
            job: job_spec(),
            generation_count: GenerationCount::new(count).unwrap(),
            feedback: None,
            company: None,
            gold_examples: vec![],
            constraints: vec![],
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings::default()
    }

    #[tokio::test]
    async fn test_good_scores_skip_refinement_and_pick_best() {
        let judge = ScriptedJudge::new(&[("draft 0", 0.8), ("draft 1", 0.95), ("draft 2", 0.75)]);
        let generator = Arc::new(ScriptedGenerator::new());
        let collaborators = CollaboratorsBuilder::new()
            .generator(generator.clone())
            .judge(judge)
            .build();

        let run = run_pipeline(&collaborators, &settings(), request(3)).await.unwrap();
        let outcome = run.outcome;

        assert_eq!(outcome.winner.index, 1);
        assert!(outcome.diagnostics.refined_indices.is_empty());
        assert!(!outcome.diagnostics.stages.contains(&Stage::Refining));
        assert_eq!(outcome.diagnostics.initial_scores, outcome.diagnostics.scores);
        assert_eq!(generator.refinement_calls(), 0, "no refiner invocation");
        assert_eq!(outcome.diagnostics.stages.last(), Some(&Stage::Done));
    }

    #[tokio::test]
    async fn test_low_score_refines_only_that_candidate_and_rescores() {
        let judge = ScriptedJudge::new(&[
            ("draft 0", 0.8),
            ("draft 1", 0.65),
            ("draft 2", 0.9),
            ("refined 1", 0.97),
        ]);
        let generator = Arc::new(ScriptedGenerator::new());
        let collaborators = CollaboratorsBuilder::new()
            .generator(generator.clone())
            .judge(judge)
            .build();

        let outcome = run_pipeline(&collaborators, &settings(), request(3))
            .await
            .unwrap()
            .outcome;
        let d = &outcome.diagnostics;

        assert_eq!(d.flagged_indices, BTreeSet::from([1]));
        assert_eq!(d.refined_indices, BTreeSet::from([1]));
        assert_eq!(d.refinement_trigger, Some(RefinementTrigger::LowScores));
        assert_eq!(generator.refinement_calls(), 1);
        assert_eq!(d.initial_scores.as_ref().unwrap().get(1), Some(0.65));
        assert_eq!(d.scores.as_ref().unwrap().get(1), Some(0.97), "curator uses the rescore");
        assert_eq!(outcome.winner.index, 1);
        assert_eq!(outcome.winner.artifact.job_description, "refined 1");
        assert!(d.stages.contains(&Stage::Rescoring));
    }

    #[tokio::test]
    async fn test_scorer_failure_falls_back_to_index_zero() {
        let collaborators = CollaboratorsBuilder::new()
            .judge(ScriptedJudge::failing())
            .build();

        let outcome = run_pipeline(&collaborators, &settings(), request(3))
            .await
            .unwrap()
            .outcome;

        assert_eq!(outcome.winner.index, 0);
        assert!(outcome.diagnostics.fallback);
        assert!(outcome.diagnostics.scores.is_none());
        assert!(outcome
            .diagnostics
            .degraded
            .iter()
            .any(|d| d.stage == Stage::Scoring));
        assert!(outcome.diagnostics.refined_indices.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_refines_even_without_scores() {
        let generator = Arc::new(ScriptedGenerator::new());
        let collaborators = CollaboratorsBuilder::new()
            .generator(generator.clone())
            .judge(ScriptedJudge::failing())
            .build();
        let mut req = request(2);
        req.feedback = Some(FeedbackContext {
            notes: vec![FeedbackNote {
                text: "Avoid buzzwords".to_string(),
                ..FeedbackNote::default()
            }],
        });

        let outcome = run_pipeline(&collaborators, &settings(), req)
            .await
            .unwrap()
            .outcome;

        assert_eq!(outcome.diagnostics.refined_indices, BTreeSet::from([0, 1]));
        assert!(outcome.diagnostics.fallback);
        assert_eq!(outcome.winner.artifact.job_description, "refined 0");
    }

    #[tokio::test]
    async fn test_rescoring_failure_uses_index_fallback() {
        let judge = ScriptedJudge::new(&[("draft 0", 0.9), ("draft 1", 0.2)]).fail_after(2);
        let collaborators = CollaboratorsBuilder::new().judge(judge).build();

        let outcome = run_pipeline(&collaborators, &settings(), request(2))
            .await
            .unwrap()
            .outcome;

        assert!(outcome.diagnostics.initial_scores.is_some());
        assert!(outcome.diagnostics.scores.is_none());
        assert!(outcome.diagnostics.fallback);
        assert_eq!(outcome.winner.index, 0);
        assert!(outcome
            .diagnostics
            .degraded
            .iter()
            .any(|d| d.stage == Stage::Rescoring));
    }

    #[tokio::test]
    async fn test_all_generation_slots_failing_is_fatal() {
        let collaborators = CollaboratorsBuilder::new()
            .generator(Arc::new(ScriptedGenerator::new().always_fail()))
            .build();

        let result = run_pipeline(&collaborators, &settings(), request(2)).await;
        assert!(matches!(
            result,
            Err(PipelineError::GenerationExhausted { attempted: 2 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scoring_waits_for_slow_company_context() {
        let company = StaticCompanyProvider::new("Acme builds rockets.").delay(Duration::from_secs(5));
        let judge = ScriptedJudge::new(&[("draft 0", 0.5), ("draft 1", 0.9)]);
        let generator = Arc::new(ScriptedGenerator::new());
        let collaborators = CollaboratorsBuilder::new()
            .generator(generator.clone())
            .judge(judge)
            .company(company)
            .build();
        let mut req = request(2);
        req.company = Some(CompanyRef {
            name: Some("Acme".to_string()),
            urls: vec![],
        });

        let outcome = run_pipeline(&collaborators, &settings(), req)
            .await
            .unwrap()
            .outcome;

        assert!(outcome.diagnostics.company_context);
        let refinement = generator.last_context().expect("refinement call");
        assert_eq!(
            refinement.company_context.as_deref(),
            Some("Acme builds rockets."),
            "refinement sees the joined company context"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_company_timeout_degrades_quietly() {
        let company = StaticCompanyProvider::new("late").delay(Duration::from_secs(600));
        let collaborators = CollaboratorsBuilder::new().company(company).build();
        let mut req = request(2);
        req.company = Some(CompanyRef {
            name: Some("Acme".to_string()),
            urls: vec![],
        });

        let outcome = run_pipeline(&collaborators, &settings(), req)
            .await
            .unwrap()
            .outcome;

        assert!(!outcome.diagnostics.company_context);
        assert!(outcome
            .diagnostics
            .degraded
            .iter()
            .any(|d| d.stage == Stage::Scraping));
    }

    #[tokio::test]
    async fn test_style_defaults_show_up_as_degraded_routing() {
        let collaborators = CollaboratorsBuilder::new()
            .retriever(ScriptedRetriever::empty())
            .build();

        let outcome = run_pipeline(&collaborators, &settings(), request(2))
            .await
            .unwrap()
            .outcome;

        let routing: Vec<&str> = outcome
            .diagnostics
            .degraded
            .iter()
            .filter(|d| d.stage == Stage::Routing)
            .map(|d| d.detail.as_str())
            .collect();
        assert_eq!(routing.len(), 4);
        assert!(routing.contains(&"style syntax filled from defaults"));
        assert!(routing.contains(&"style do_and_dont filled from defaults"));
    }

    #[tokio::test]
    async fn test_style_retrieval_failure_still_completes_with_defaults() {
        let collaborators = CollaboratorsBuilder::new()
            .retriever(ScriptedRetriever::failing())
            .build();

        let outcome = run_pipeline(&collaborators, &settings(), request(2))
            .await
            .unwrap()
            .outcome;

        let routing = outcome
            .diagnostics
            .degraded
            .iter()
            .filter(|d| d.stage == Stage::Routing);
        assert!(routing.clone().any(|d| d.detail.starts_with("style retrieval:")));
        assert!(routing.clone().any(|d| d.detail == "style hooks filled from defaults"));
        assert!(outcome.diagnostics.stages.contains(&Stage::Done));
    }

    #[tokio::test]
    async fn test_routing_and_directive_reach_the_writer() {
        let generator = Arc::new(ScriptedGenerator::new());
        let collaborators = CollaboratorsBuilder::new().generator(generator.clone()).build();
        let mut req = request(2);
        req.job.signals = SignalTuple::new(
            Industry::Finance,
            CompanyType::Corporate,
            Formality::Formal,
            Seniority::Senior,
        );
        req.constraints = vec!["No salary promises".to_string()];

        let outcome = run_pipeline(&collaborators, &settings(), req)
            .await
            .unwrap()
            .outcome;

        assert_eq!(outcome.diagnostics.profile.primary, Color::Blue);
        assert_eq!(outcome.diagnostics.profile.secondary, None);
        assert_eq!(outcome.diagnostics.temperature.value, 0.10);
        let seen = generator.last_context().expect("writer call");
        assert!(seen.style_block.contains("No salary promises"));
        assert_eq!(seen.job.benefit_keywords.len(), 4, "finance defaults applied");
    }

    #[tokio::test]
    async fn test_persistence_runs_after_return() {
        let store = Arc::new(InMemoryStore::default());
        let collaborators = CollaboratorsBuilder::new().store(store.clone()).build();
        let mut req = request(2);
        req.feedback = Some(FeedbackContext {
            notes: vec![FeedbackNote {
                text: "Shorter please".to_string(),
                ..FeedbackNote::default()
            }],
        });

        let run = run_pipeline(&collaborators, &settings(), req).await.unwrap();
        let report = run.persistence.await.expect("persist task");

        assert!(report.generation_recorded);
        assert_eq!(report.feedback_recorded, 1);
        let stored = store.generation(run.outcome.generation_id).expect("stored");
        assert_eq!(stored.winner_index, run.outcome.winner.index);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_request() {
        let collaborators = CollaboratorsBuilder::new()
            .store(Arc::new(InMemoryStore::failing()))
            .build();

        let run = run_pipeline(&collaborators, &settings(), request(2)).await.unwrap();
        let report = run.persistence.await.expect("persist task");

        assert!(!report.failures.is_empty());
        assert_eq!(run.outcome.diagnostics.stages.last(), Some(&Stage::Done));
    }
}
