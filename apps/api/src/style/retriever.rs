//! Chunk retrieval: the source of colour-specific style material.
//!
//! `AppState` holds an `Arc<dyn ChunkRetriever>`; the Postgres-backed implementation
//! reads pre-extracted chunks from the `style_chunks` table.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::CollaboratorError;
use crate::style::scoring_table::Color;
use crate::style::signals::Language;

/// Upper bound on rows read per (colour, dimension, language) query.
const QUERY_LIMIT: i64 = 20;

/// The four kinds of material a style directive is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleDimension {
    DoAndDont,
    Adjectives,
    Hooks,
    Syntax,
}

impl StyleDimension {
    #[cfg(test)]
    pub const ALL: [StyleDimension; 4] = [
        StyleDimension::DoAndDont,
        StyleDimension::Adjectives,
        StyleDimension::Hooks,
        StyleDimension::Syntax,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleDimension::DoAndDont => "do_and_dont",
            StyleDimension::Adjectives => "adjectives",
            StyleDimension::Hooks => "hooks",
            StyleDimension::Syntax => "syntax",
        }
    }

    /// Inclusive (min, max) item counts a finished directive carries.
    pub fn bounds(self) -> (usize, usize) {
        match self {
            StyleDimension::DoAndDont => (6, 10),
            StyleDimension::Adjectives => (10, 20),
            StyleDimension::Hooks => (3, 6),
            StyleDimension::Syntax => (2, 4),
        }
    }
}

impl fmt::Display for StyleDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval collaborator. May return fewer items than wanted; empty is valid.
#[async_trait]
pub trait ChunkRetriever: Send + Sync {
    async fn query(
        &self,
        color: Color,
        dimension: StyleDimension,
        language: Language,
    ) -> Result<Vec<String>, CollaboratorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PgChunkRetriever
// ────────────────────────────────────────────────────────────────────────────

pub struct PgChunkRetriever {
    pool: PgPool,
}

impl PgChunkRetriever {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkRetriever for PgChunkRetriever {
    async fn query(
        &self,
        color: Color,
        dimension: StyleDimension,
        language: Language,
    ) -> Result<Vec<String>, CollaboratorError> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT content
            FROM style_chunks
            WHERE color = $1 AND dimension = $2 AND language = $3
            ORDER BY id
            LIMIT $4
            "#,
        )
        .bind(color.as_str())
        .bind(dimension.as_str())
        .bind(language.code())
        .bind(QUERY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_ordered() {
        for dimension in StyleDimension::ALL {
            let (min, max) = dimension.bounds();
            assert!(min < max, "{dimension}: min must be below max");
        }
    }

    #[test]
    fn test_wire_name_matches_as_str() {
        for dimension in StyleDimension::ALL {
            let wire = serde_json::to_value(dimension).unwrap();
            assert_eq!(wire, dimension.as_str());
        }
    }
}
