use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Human feedback on a generated posting. `label` is accepted | rejected | edited.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub generation_id: Option<Uuid>,
    pub job_title: String,
    pub label: String,
    pub feedback: Option<String>,
    pub candidate_index: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One finished pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GenerationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub language: String,
    pub profile: Value,
    pub winner: Value,
    pub winner_index: i32,
    pub scores: Option<Value>,
    pub refined_indices: Vec<i32>,
    pub archive_key: Option<String>,
    pub created_at: DateTime<Utc>,
}
