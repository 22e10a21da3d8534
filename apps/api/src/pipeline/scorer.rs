//! Quality Scorer: one judge call per candidate, run concurrently.
//!
//! Individual judge failures drop that candidate from the `ScoreMap`. Only when
//! no candidate could be scored is the scorer reported as unavailable, which
//! sends the Curator to its index fallback.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::{within, CollaboratorError};
use crate::llm_client::LlmClient;
use crate::models::job::JobBody;
use crate::pipeline::candidates::{Candidate, SlotFailure};
use crate::pipeline::prompts::{render_judge_prompt, JUDGE_SYSTEM};

/// The judge runs cold so repeated scoring of the same text is stable.
const JUDGE_TEMPERATURE: f64 = 0.0;

/// Judge collaborator: one score per artifact, same order.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn score_batch(
        &self,
        job_title: &str,
        artifacts: &[JobBody],
    ) -> Result<Vec<f64>, CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct JudgeVerdict {
    scores: Vec<f64>,
}

pub struct LlmJudge(pub LlmClient);

#[async_trait]
impl Judge for LlmJudge {
    async fn score_batch(
        &self,
        job_title: &str,
        artifacts: &[JobBody],
    ) -> Result<Vec<f64>, CollaboratorError> {
        let prompt = render_judge_prompt(job_title, artifacts);
        let verdict: JudgeVerdict = self
            .0
            .call_json(&prompt, JUDGE_SYSTEM, JUDGE_TEMPERATURE)
            .await?;

        if verdict.scores.len() != artifacts.len() {
            return Err(CollaboratorError::InvalidResponse(format!(
                "judge returned {} scores for {} postings",
                verdict.scores.len(),
                artifacts.len()
            )));
        }
        Ok(verdict.scores)
    }
}

/// Candidate index -> quality score in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreMap(BTreeMap<usize, f64>);

impl ScoreMap {
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(&index).copied()
    }
}

impl FromIterator<(usize, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringReport {
    /// `None` when no candidate could be scored.
    pub scores: Option<ScoreMap>,
    pub failures: Vec<SlotFailure>,
    /// Indices whose raw score had to be clamped into range.
    pub clamped: Vec<usize>,
}

/// Maps a raw judge value into `[0, 1]`. Returns the value and whether it was adjusted.
fn normalize_score(raw: f64) -> (f64, bool) {
    if raw.is_nan() {
        (0.0, true)
    } else if !(0.0..=1.0).contains(&raw) {
        (raw.clamp(0.0, 1.0), true)
    } else {
        (raw, false)
    }
}

pub async fn score_candidates(
    judge: Arc<dyn Judge>,
    job_title: &str,
    candidates: &[Candidate],
    timeout: Duration,
) -> ScoringReport {
    let title: Arc<str> = Arc::from(job_title);
    let mut join_set = JoinSet::new();

    for candidate in candidates {
        let judge = Arc::clone(&judge);
        let title = Arc::clone(&title);
        let index = candidate.index;
        let artifact = candidate.artifact.clone();

        join_set.spawn(async move {
            let result = within(
                "judge",
                timeout,
                judge.score_batch(&title, std::slice::from_ref(&artifact)),
            )
            .await
            .and_then(|scores| {
                scores.first().copied().ok_or_else(|| {
                    CollaboratorError::InvalidResponse("judge returned no score".to_string())
                })
            });
            (index, result)
        });
    }

    let mut scores = BTreeMap::new();
    let mut report = ScoringReport::default();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Ok(raw))) => {
                let (score, adjusted) = normalize_score(raw);
                if adjusted {
                    warn!("Judge score {raw} for candidate {index} out of range, clamped to {score}");
                    report.clamped.push(index);
                }
                scores.insert(index, score);
            }
            Ok((index, Err(e))) => {
                warn!("Scoring failed for candidate {index}: {e}");
                report.failures.push(SlotFailure {
                    index,
                    error: e.to_string(),
                });
            }
            Err(e) => warn!("Scoring task join error: {e}"),
        }
    }

    report.failures.sort_by_key(|f| f.index);
    report.clamped.sort_unstable();

    if scores.is_empty() {
        warn!("Scorer unavailable: no candidate could be scored");
    } else {
        info!("Scored {}/{} candidates", scores.len(), candidates.len());
        report.scores = Some(ScoreMap(scores));
    }
    report
}
