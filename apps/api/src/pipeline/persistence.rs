//! Persistence Bridge: forwards a finished run to storage without holding up
//! the response. Every failure is logged and reported, never propagated.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::memory::{
    FeedbackLabel, FeedbackRepository, GenerationRecord, GenerationRepository, NewFeedback,
    OutcomeArchive,
};
use crate::pipeline::candidates::Candidate;
use crate::pipeline::gate::FeedbackNote;
use crate::pipeline::scorer::ScoreMap;
use crate::style::signals::Language;

#[derive(Clone)]
pub struct PersistenceBridge {
    generations: Arc<dyn GenerationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    archive: Arc<dyn OutcomeArchive>,
}

#[derive(Debug, Clone)]
pub struct PersistRequest {
    pub generation_id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub language: Language,
    pub profile: Value,
    pub winner: Candidate,
    pub scores: Option<ScoreMap>,
    pub refined_indices: Vec<usize>,
    /// Feedback supplied with this request; notes loaded from history are not re-saved.
    pub request_feedback: Vec<FeedbackNote>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistReport {
    pub archive_key: Option<String>,
    pub generation_recorded: bool,
    pub feedback_recorded: usize,
    pub failures: Vec<String>,
}

impl PersistenceBridge {
    pub fn new(
        generations: Arc<dyn GenerationRepository>,
        feedback: Arc<dyn FeedbackRepository>,
        archive: Arc<dyn OutcomeArchive>,
    ) -> Self {
        Self {
            generations,
            feedback,
            archive,
        }
    }

    /// Runs `persist` on its own task. Dropping the handle does not cancel it.
    pub fn spawn(&self, request: PersistRequest) -> JoinHandle<PersistReport> {
        let bridge = self.clone();
        tokio::spawn(async move { bridge.persist(request).await })
    }

    pub async fn persist(&self, request: PersistRequest) -> PersistReport {
        let mut report = PersistReport::default();

        let markdown = request
            .winner
            .artifact
            .to_markdown(&request.job_title, request.language);
        match self
            .archive
            .archive(request.user_id, request.generation_id, markdown)
            .await
        {
            Ok(key) => report.archive_key = Some(key),
            Err(e) => {
                warn!("Archiving generation {} failed: {e}", request.generation_id);
                report.failures.push(format!("archive: {e}"));
            }
        }

        let record = GenerationRecord {
            id: request.generation_id,
            user_id: request.user_id,
            job_title: request.job_title.clone(),
            language: request.language.code().to_string(),
            profile: request.profile.clone(),
            winner: serde_json::to_value(&request.winner.artifact).unwrap_or(Value::Null),
            winner_index: request.winner.index,
            scores: request
                .scores
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok()),
            refined_indices: request.refined_indices.clone(),
            archive_key: report.archive_key.clone(),
        };
        match self.generations.record_generation(&record).await {
            Ok(()) => report.generation_recorded = true,
            Err(e) => {
                warn!("Recording generation {} failed: {e}", request.generation_id);
                report.failures.push(format!("generation: {e}"));
            }
        }

        for note in request
            .request_feedback
            .iter()
            .filter(|n| !n.from_history && !n.text.trim().is_empty())
        {
            let entry = NewFeedback {
                user_id: request.user_id,
                generation_id: Some(request.generation_id),
                job_title: note
                    .job_title
                    .clone()
                    .unwrap_or_else(|| request.job_title.clone()),
                label: FeedbackLabel::Edited,
                feedback: Some(note.text.trim().to_string()),
                candidate_index: note.candidate_index,
            };
            match self.feedback.record_feedback(&entry).await {
                Ok(()) => report.feedback_recorded += 1,
                Err(e) => {
                    warn!("Recording feedback failed: {e}");
                    report.failures.push(format!("feedback: {e}"));
                }
            }
        }

        info!(
            "Persisted generation {} (archived: {}, recorded: {}, feedback: {}, failures: {})",
            request.generation_id,
            report.archive_key.is_some(),
            report.generation_recorded,
            report.feedback_recorded,
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, InMemoryStore};

    fn request(feedback: Vec<FeedbackNote>) -> PersistRequest {
        PersistRequest {
            generation_id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(2),
            job_title: "Nurse".to_string(),
            language: Language::En,
            profile: Value::Null,
            winner: candidate(1),
            scores: Some([(0, 0.5), (1, 0.9)].into_iter().collect()),
            refined_indices: vec![0],
            request_feedback: feedback,
        }
    }

    fn bridge(store: &Arc<InMemoryStore>) -> PersistenceBridge {
        PersistenceBridge::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_persist_archives_records_and_saves_new_feedback() {
        let store = Arc::new(InMemoryStore::default());
        let mut historic = FeedbackNote {
            text: "old".to_string(),
            ..FeedbackNote::default()
        };
        historic.from_history = true;
        let fresh = FeedbackNote {
            text: "Warmer tone".to_string(),
            candidate_index: Some(0),
            ..FeedbackNote::default()
        };

        let report = bridge(&store).persist(request(vec![historic, fresh])).await;

        assert!(report.failures.is_empty());
        assert!(report.generation_recorded);
        assert_eq!(report.feedback_recorded, 1, "history is not saved again");
        let generation = store.generation(Uuid::from_u128(1)).expect("recorded");
        assert_eq!(generation.winner_index, 1);
        assert_eq!(generation.archive_key, report.archive_key);
        assert!(store.archived_markdown()[0].starts_with("# Nurse"));
    }

    #[tokio::test]
    async fn test_storage_failures_are_reported_not_raised() {
        let store = Arc::new(InMemoryStore::failing());
        let handle = bridge(&store).spawn(request(vec![]));
        let report = handle.await.expect("persist task");

        assert!(!report.generation_recorded);
        assert!(report.archive_key.is_none());
        assert_eq!(report.failures.len(), 2);
    }
}
