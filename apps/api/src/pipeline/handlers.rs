use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::company::CompanyRef;
use crate::errors::{within, AppError};
use crate::memory::{FeedbackLabel, NewFeedback};
use crate::models::job::{JobBody, JobSpec};
use crate::models::records::{FeedbackRow, GenerationRow};
use crate::pipeline::candidates::GenerationCount;
use crate::pipeline::gate::{FeedbackContext, FeedbackNote};
use crate::pipeline::orchestrator::{run_pipeline, Diagnostics, PipelineRequest};
use crate::pipeline::prompts::MAX_GOLD_EXAMPLES;
use crate::state::AppState;

/// How many stored notes are scanned for title matches.
const RECENT_FEEDBACK_LIMIT: usize = 20;
/// At most this many stored notes join a request.
const MAX_HISTORY_NOTES: usize = 5;
/// Title words at or below this length never count as a match.
const SIGNIFICANT_WORD_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct GenerateJobRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub job: JobSpec,
    #[serde(default)]
    pub generation_count: Option<usize>,
    #[serde(default)]
    pub feedback: Vec<FeedbackNote>,
    #[serde(default)]
    pub company: Option<CompanyRef>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateJobResponse {
    pub generation_id: Uuid,
    pub winner: JobBody,
    pub winner_index: usize,
    pub markdown: String,
    pub diagnostics: Diagnostics,
}

/// POST /api/v1/jobs/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateJobRequest>,
) -> Result<Json<GenerateJobResponse>, AppError> {
    let job_title = req.job.job_title.trim().to_string();
    if job_title.is_empty() {
        return Err(AppError::Validation("job_title must not be empty".to_string()));
    }
    let generation_count = match req.generation_count {
        Some(n) => GenerationCount::new(n)?,
        None => GenerationCount::default(),
    };

    let gold_examples = match within(
        "gold_examples",
        state.settings.retrieval_timeout,
        state
            .gold_examples
            .search_gold_examples(req.user_id, &job_title, MAX_GOLD_EXAMPLES),
    )
    .await
    {
        Ok(examples) => examples,
        Err(e) => {
            warn!("Gold example lookup failed, generating without: {e}");
            Vec::new()
        }
    };

    let history = match within(
        "feedback_history",
        state.settings.retrieval_timeout,
        state.feedback.recent_feedback(req.user_id, RECENT_FEEDBACK_LIMIT),
    )
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Feedback history lookup failed, using request feedback only: {e}");
            Vec::new()
        }
    };
    let feedback = merge_feedback(req.feedback, &history, &job_title);

    let mut job = req.job;
    job.job_title = job_title;
    let language = job.language;

    let run = run_pipeline(
        &state.collaborators,
        &state.settings,
        PipelineRequest {
            user_id: req.user_id,
            job: job.clone(),
            generation_count,
            feedback,
            company: req.company,
            gold_examples,
            constraints: req.constraints,
        },
    )
    .await?;
    // Persistence keeps running on its own task after the response is sent.
    drop(run.persistence);

    let outcome = run.outcome;
    let markdown = outcome.winner.artifact.to_markdown(&job.job_title, language);
    Ok(Json(GenerateJobResponse {
        generation_id: outcome.generation_id,
        winner_index: outcome.winner.index,
        winner: outcome.winner.artifact,
        markdown,
        diagnostics: outcome.diagnostics,
    }))
}

/// Request notes plus stored notes for similar titles. `None` when nothing remains.
pub fn merge_feedback(
    request_notes: Vec<FeedbackNote>,
    history: &[FeedbackRow],
    job_title: &str,
) -> Option<FeedbackContext> {
    let mut notes: Vec<FeedbackNote> = request_notes
        .into_iter()
        .filter(|n| !n.text.trim().is_empty())
        .collect();

    let historic = history
        .iter()
        .filter(|row| shares_significant_word(&row.job_title, job_title))
        .filter_map(|row| {
            let text = row.feedback.as_deref()?.trim();
            (!text.is_empty()).then(|| FeedbackNote {
                text: text.to_string(),
                job_title: Some(row.job_title.clone()),
                candidate_index: None,
                from_history: true,
            })
        })
        .take(MAX_HISTORY_NOTES);
    notes.extend(historic);

    if notes.is_empty() {
        None
    } else {
        Some(FeedbackContext { notes })
    }
}

fn significant_words(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > SIGNIFICANT_WORD_LEN)
        .map(str::to_lowercase)
}

pub fn shares_significant_word(a: &str, b: &str) -> bool {
    let words: Vec<String> = significant_words(b).collect();
    significant_words(a).any(|w| words.contains(&w))
}

// ────────────────────────────────────────────────────────────────────────────
// Feedback
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub generation_id: Option<Uuid>,
    pub job_title: String,
    pub label: FeedbackLabel,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub candidate_index: Option<usize>,
    /// The accepted posting. Falls back to the stored winner of `generation_id`.
    #[serde(default)]
    pub body: Option<JobBody>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FeedbackResponse {
    pub gold_example_saved: bool,
    pub feedback_recorded: bool,
}

/// POST /api/v1/jobs/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let job_title = req.job_title.trim();
    if job_title.is_empty() {
        return Err(AppError::Validation("job_title must not be empty".to_string()));
    }

    match req.label {
        FeedbackLabel::Accepted => {
            let body = match req.body {
                Some(body) => body,
                None => stored_winner(&state, req.generation_id).await?,
            };
            state
                .gold_examples
                .save_gold_example(req.user_id, job_title, &body)
                .await?;
            info!("Saved gold example '{job_title}' for user {}", req.user_id);
            Ok(Json(FeedbackResponse {
                gold_example_saved: true,
                feedback_recorded: false,
            }))
        }
        FeedbackLabel::Rejected | FeedbackLabel::Edited => {
            let text = req
                .feedback
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(format!("{} feedback needs a text", req.label))
                })?;
            state
                .feedback
                .record_feedback(&NewFeedback {
                    user_id: req.user_id,
                    generation_id: req.generation_id,
                    job_title: job_title.to_string(),
                    label: req.label,
                    feedback: Some(text.to_string()),
                    candidate_index: req.candidate_index,
                })
                .await?;
            info!("Recorded {} feedback for user {}", req.label, req.user_id);
            Ok(Json(FeedbackResponse {
                gold_example_saved: false,
                feedback_recorded: true,
            }))
        }
    }
}

async fn stored_winner(state: &AppState, generation_id: Option<Uuid>) -> Result<JobBody, AppError> {
    let id = generation_id.ok_or_else(|| {
        AppError::Validation("accepted feedback needs a body or a generation_id".to_string())
    })?;
    let row = state
        .generations
        .get_generation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Generation {id} not found")))?;
    serde_json::from_value(row.winner)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored winner unreadable: {e}")))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_generation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationRow>, AppError> {
    let row = state
        .generations
        .get_generation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Generation {id} not found")))?;
    Ok(Json(row))
}
