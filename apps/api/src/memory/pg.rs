//! Postgres-backed repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::CollaboratorError;
use crate::memory::{
    FeedbackRepository, GenerationRecord, GenerationRepository, GoldExampleRepository,
    NewFeedback,
};
use crate::models::job::JobBody;
use crate::models::records::{FeedbackRow, GenerationRow};

#[derive(Clone)]
pub struct PgMemory {
    pool: PgPool,
}

impl PgMemory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Exact title matches first, then titles containing the search text literally.
const SEARCH_GOLD_EXAMPLES: &str = r#"
    SELECT body
    FROM gold_examples
    WHERE user_id = $1
    ORDER BY (lower(job_title) = lower($2)) DESC,
             (position(lower($2) in lower(job_title)) > 0) DESC,
             created_at DESC
    LIMIT $3
"#;

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl GoldExampleRepository for PgMemory {
    async fn save_gold_example(
        &self,
        user_id: Uuid,
        job_title: &str,
        body: &JobBody,
    ) -> Result<(), CollaboratorError> {
        let body = serde_json::to_value(body)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO gold_examples (id, user_id, job_title, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(job_title)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_gold_examples(
        &self,
        user_id: Uuid,
        job_title: &str,
        limit: usize,
    ) -> Result<Vec<JobBody>, CollaboratorError> {
        let rows = sqlx::query_scalar::<_, serde_json::Value>(SEARCH_GOLD_EXAMPLES)
        .bind(user_id)
        .bind(job_title.trim())
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        // Rows written by older schema versions are skipped rather than failing the lookup.
        let bodies = rows
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<JobBody>(value) {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("Skipping unreadable gold example: {e}");
                    None
                }
            })
            .collect();

        Ok(bodies)
    }
}

#[async_trait]
impl FeedbackRepository for PgMemory {
    async fn record_feedback(&self, entry: &NewFeedback) -> Result<(), CollaboratorError> {
        sqlx::query(
            r#"
            INSERT INTO user_feedback
                (id, user_id, generation_id, job_title, label, feedback, candidate_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.generation_id)
        .bind(&entry.job_title)
        .bind(entry.label.as_str())
        .bind(entry.feedback.as_deref())
        .bind(entry.candidate_index.map(to_i32))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_feedback(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackRow>, CollaboratorError> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, user_id, generation_id, job_title, label, feedback, candidate_index, created_at
            FROM user_feedback
            WHERE user_id = $1 AND feedback IS NOT NULL AND feedback <> ''
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl GenerationRepository for PgMemory {
    async fn record_generation(&self, record: &GenerationRecord) -> Result<(), CollaboratorError> {
        let refined: Vec<i32> = record.refined_indices.iter().copied().map(to_i32).collect();

        sqlx::query(
            r#"
            INSERT INTO job_generations
                (id, user_id, job_title, language, profile, winner, winner_index,
                 scores, refined_indices, archive_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.job_title)
        .bind(&record.language)
        .bind(&record.profile)
        .bind(&record.winner)
        .bind(to_i32(record.winner_index))
        .bind(&record.scores)
        .bind(&refined)
        .bind(record.archive_key.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_generation(&self, id: Uuid) -> Result<Option<GenerationRow>, CollaboratorError> {
        let row = sqlx::query_as::<_, GenerationRow>(
            r#"
            SELECT id, user_id, job_title, language, profile, winner, winner_index,
                   scores, refined_indices, archive_key, created_at
            FROM job_generations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
