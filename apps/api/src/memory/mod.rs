//! Cross-request memory behind narrow typed repositories.
//!
//! The pipeline never shares state between requests itself; everything that must
//! outlive a request (gold examples, feedback, finished generations, archived
//! postings) goes through these traits. `PgMemory` implements the three
//! repositories over Postgres, `S3OutcomeArchive` stores rendered postings.

pub mod archive;
pub mod pg;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CollaboratorError;
use crate::models::job::JobBody;
use crate::models::records::{FeedbackRow, GenerationRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLabel {
    Accepted,
    Rejected,
    Edited,
}

impl FeedbackLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackLabel::Accepted => "accepted",
            FeedbackLabel::Rejected => "rejected",
            FeedbackLabel::Edited => "edited",
        }
    }
}

impl fmt::Display for FeedbackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: Uuid,
    pub generation_id: Option<Uuid>,
    pub job_title: String,
    pub label: FeedbackLabel,
    pub feedback: Option<String>,
    pub candidate_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub language: String,
    pub profile: Value,
    pub winner: Value,
    pub winner_index: usize,
    pub scores: Option<Value>,
    pub refined_indices: Vec<usize>,
    pub archive_key: Option<String>,
}

#[async_trait]
pub trait GoldExampleRepository: Send + Sync {
    async fn save_gold_example(
        &self,
        user_id: Uuid,
        job_title: &str,
        body: &JobBody,
    ) -> Result<(), CollaboratorError>;

    /// Title matches first, then the user's most recent examples.
    async fn search_gold_examples(
        &self,
        user_id: Uuid,
        job_title: &str,
        limit: usize,
    ) -> Result<Vec<JobBody>, CollaboratorError>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn record_feedback(&self, entry: &NewFeedback) -> Result<(), CollaboratorError>;

    /// Most recent feedback carrying text, newest first.
    async fn recent_feedback(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackRow>, CollaboratorError>;
}

#[async_trait]
pub trait GenerationRepository: Send + Sync {
    async fn record_generation(&self, record: &GenerationRecord) -> Result<(), CollaboratorError>;

    async fn get_generation(&self, id: Uuid) -> Result<Option<GenerationRow>, CollaboratorError>;
}

/// Long-term storage of the rendered winning posting.
#[async_trait]
pub trait OutcomeArchive: Send + Sync {
    /// Stores `markdown` and returns the object key it was written under.
    async fn archive(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        markdown: String,
    ) -> Result<String, CollaboratorError>;
}

/// Object key for an archived posting.
pub fn archive_key(user_id: Uuid, generation_id: Uuid) -> String {
    format!("jobs/{user_id}/{generation_id}.md")
}
