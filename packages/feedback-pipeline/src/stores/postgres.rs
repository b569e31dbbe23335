//! PostgreSQL storage with pgvector embeddings.
//!
//! Schema lives in the server's migrations: `feedback`, `stories` and
//! `documents` tables plus the `feedback_status` / `story_status` enums.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgQueryResult};
use sqlx::types::Json;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::traits::{default_processing_lease, Embedder, FeedbackStore, StoryStore, VectorStore};
use crate::types::{
    BacklogQuery, DocumentType, ExtractedEntities, Feedback, FeedbackStatus, NewDocument,
    NewFeedback, SearchHit, StoryStatus, UserStory,
};

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    source: String,
    content: Option<String>,
    file_path: Option<String>,
    status: FeedbackStatus,
    summary: Option<String>,
    error: Option<String>,
    analysis: Option<Json<ExtractedEntities>>,
    stories_count: i32,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            source: row.source,
            content: row.content,
            file_path: row.file_path,
            status: row.status,
            summary: row.summary,
            error: row.error,
            analysis: row.analysis.map(|Json(a)| a),
            stories_count: row.stories_count,
            claimed_at: row.claimed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StoryRow {
    id: Uuid,
    title: String,
    as_a: String,
    i_want: String,
    so_that: String,
    description: String,
    acceptance_criteria: Vec<String>,
    themes: Vec<String>,
    feedback_ids: Vec<Uuid>,
    reach: f64,
    impact: f64,
    confidence: f64,
    effort: f64,
    rice_score: f64,
    status: StoryStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoryRow> for UserStory {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            as_a: row.as_a,
            i_want: row.i_want,
            so_that: row.so_that,
            description: row.description,
            acceptance_criteria: row.acceptance_criteria,
            themes: row.themes,
            feedback_ids: row.feedback_ids,
            reach: row.reach,
            impact: row.impact,
            confidence: row.confidence,
            effort: row.effort,
            rice_score: Some(row.rice_score),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Feedback and story storage on PostgreSQL.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lease: Duration,
}

impl PostgresStore {
    /// Reuse an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lease: default_processing_lease(),
        }
    }

    /// Override how long a processing claim is honored.
    pub fn with_processing_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turn "no row updated" into `NotFound`.
fn ensure_updated(id: Uuid, result: PgQueryResult) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(PipelineError::NotFound {
            kind: "feedback",
            id,
        });
    }
    Ok(())
}

#[async_trait]
impl FeedbackStore for PostgresStore {
    #[instrument(skip(self, input), fields(feedback_id = %input.id))]
    async fn create_feedback(&self, input: NewFeedback) -> Result<Feedback> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO feedback (id, title, description, source, content, file_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(input.id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.source)
        .bind(&input.content)
        .bind(&input.file_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>> {
        let row = sqlx::query_as::<_, FeedbackRow>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>("SELECT * FROM feedback ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn claim_for_processing(&self, id: Uuid) -> Result<Option<Feedback>> {
        let claimed = sqlx::query_as::<_, FeedbackRow>(
            r#"
            UPDATE feedback
            SET status = 'processing', error = NULL, claimed_at = now(), updated_at = now()
            WHERE id = $1
              AND (claimed_at IS NULL OR claimed_at < now() - make_interval(secs => $2))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.lease.num_milliseconds() as f64 / 1000.0)
        .fetch_optional(&self.pool)
        .await?;

        match claimed {
            Some(row) => Ok(Some(row.into())),
            None if self.get_feedback(id).await?.is_some() => Ok(None),
            None => Err(PipelineError::NotFound {
                kind: "feedback",
                id,
            }),
        }
    }

    async fn mark_ingested(&self, id: Uuid, content: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE feedback SET content = $2, status = 'ingested', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .execute(&self.pool)
        .await?;
        ensure_updated(id, result)
    }

    async fn record_analysis(&self, id: Uuid, analysis: &ExtractedEntities) -> Result<()> {
        let result = sqlx::query(
            "UPDATE feedback SET analysis = $2, status = 'analyzed', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(analysis))
        .execute(&self.pool)
        .await?;
        ensure_updated(id, result)
    }

    async fn record_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        let result = sqlx::query("UPDATE feedback SET summary = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(&self.pool)
            .await?;
        ensure_updated(id, result)
    }

    async fn mark_completed(&self, id: Uuid, stories_count: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE feedback
            SET stories_count = $2, status = 'completed', claimed_at = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(stories_count)
        .execute(&self.pool)
        .await?;
        ensure_updated(id, result)
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE feedback
            SET error = $2, status = 'error', claimed_at = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;
        ensure_updated(id, result)
    }

    async fn distinct_themes(&self) -> Result<Vec<String>> {
        let themes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT theme
            FROM feedback, jsonb_array_elements_text(analysis -> 'themes') AS theme
            WHERE analysis IS NOT NULL
            ORDER BY theme
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(themes)
    }
}

#[async_trait]
impl StoryStore for PostgresStore {
    #[instrument(skip(self, story), fields(story_id = %story.id))]
    async fn insert_story(&self, story: &UserStory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stories (
                id, title, as_a, i_want, so_that, description, acceptance_criteria,
                themes, feedback_ids, reach, impact, confidence, effort, rice_score,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(story.id)
        .bind(&story.title)
        .bind(&story.as_a)
        .bind(&story.i_want)
        .bind(&story.so_that)
        .bind(&story.description)
        .bind(&story.acceptance_criteria)
        .bind(&story.themes)
        .bind(&story.feedback_ids)
        .bind(story.reach)
        .bind(story.impact)
        .bind(story.confidence)
        .bind(story.effort)
        .bind(story.score())
        .bind(story.status)
        .bind(story.created_at)
        .bind(story.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<UserStory>> {
        let row = sqlx::query_as::<_, StoryRow>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_stories(&self, query: &BacklogQuery) -> Result<Vec<UserStory>> {
        let rows = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT * FROM stories
            WHERE ($1::float8 IS NULL OR rice_score >= $1)
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM unnest(themes) AS t(theme)
                    WHERE t.theme ILIKE '%' || $2 || '%'
              ))
            ORDER BY rice_score DESC, created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.min_score)
        .bind(query.theme.as_deref().map(escape_like))
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Make user input match literally inside an ILIKE pattern.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug, FromRow)]
struct SearchRow {
    id: Uuid,
    namespace: String,
    doc_type: String,
    content: String,
    metadata: serde_json::Value,
    similarity: f64,
}

/// Document embeddings in the `documents` table.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    embedder: Arc<dyn Embedder>,
}

impl PgVectorStore {
    pub fn new(pool: PgPool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn add_documents(&self, documents: Vec<NewDocument>, namespace: &str) -> Result<Vec<Uuid>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents.into_iter().zip(embeddings) {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO documents (id, namespace, doc_type, content, metadata, embedding)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(namespace)
            .bind(doc.doc_type.as_str())
            .bind(&doc.content)
            .bind(&doc.metadata)
            .bind(Vector::from(embedding))
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }
        tx.commit().await?;

        debug!(namespace, count = ids.len(), "Stored documents");
        Ok(ids)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        doc_type: Option<DocumentType>,
    ) -> Result<Vec<SearchHit>> {
        let embedding = Vector::from(self.embedder.embed_one(query).await?);

        let rows = sqlx::query_as::<_, SearchRow>(
            r#"
            SELECT id, namespace, doc_type, content, metadata,
                   (1 - (embedding <=> $1))::float8 AS similarity
            FROM documents
            WHERE ($2::text IS NULL OR doc_type = $2)
            ORDER BY embedding <=> $1
            LIMIT $3
            "#,
        )
        .bind(embedding)
        .bind(doc_type.map(|t| t.as_str()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let doc_type = row
                    .doc_type
                    .parse::<DocumentType>()
                    .map_err(|e| PipelineError::Storage(e.into()))?;
                Ok(SearchHit {
                    id: row.id,
                    namespace: row.namespace,
                    content: row.content,
                    metadata: row.metadata,
                    doc_type,
                    similarity: row.similarity,
                })
            })
            .collect()
    }

    async fn delete_documents(&self, ids: &[Uuid]) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE namespace = $1")
            .bind(namespace)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("search"), "search");
    }
}
