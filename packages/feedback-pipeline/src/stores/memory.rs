//! In-memory storage implementations for testing and development.
//!
//! Not suitable for production: data is lost on restart.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::traits::{
    cosine_similarity, default_processing_lease, Embedder, FeedbackStore, FileStore, StoryStore,
    VectorStore,
};
use crate::types::{
    BacklogQuery, DocumentType, ExtractedEntities, Feedback, FeedbackStatus, NewDocument,
    NewFeedback, SearchHit, UserStory,
};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage for feedback, stories and uploaded files.
pub struct MemoryStore {
    feedback: RwLock<HashMap<Uuid, Feedback>>,
    stories: RwLock<HashMap<Uuid, UserStory>>,
    files: RwLock<HashMap<String, Vec<u8>>>,
    lease: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            feedback: RwLock::default(),
            stories: RwLock::default(),
            files: RwLock::default(),
            lease: default_processing_lease(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how long a processing claim is honored.
    pub fn with_processing_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn feedback_count(&self) -> usize {
        read(&self.feedback).len()
    }

    pub fn story_count(&self) -> usize {
        read(&self.stories).len()
    }

    pub fn file_count(&self) -> usize {
        read(&self.files).len()
    }

    /// Apply `update` to a stored record and bump `updated_at`.
    fn update_feedback(&self, id: Uuid, update: impl FnOnce(&mut Feedback)) -> Result<()> {
        let mut feedback = write(&self.feedback);
        let record = feedback.get_mut(&id).ok_or(PipelineError::NotFound {
            kind: "feedback",
            id,
        })?;
        update(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn create_feedback(&self, input: NewFeedback) -> Result<Feedback> {
        let record = input.into_feedback(Utc::now());
        write(&self.feedback).insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>> {
        Ok(read(&self.feedback).get(&id).cloned())
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        let mut all: Vec<Feedback> = read(&self.feedback).values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<Option<Feedback>> {
        let mut feedback = write(&self.feedback);
        let record = feedback.get_mut(&id).ok_or(PipelineError::NotFound {
            kind: "feedback",
            id,
        })?;
        let now = Utc::now();
        if record.is_claimed(now, self.lease) {
            return Ok(None);
        }
        record.status = FeedbackStatus::Processing;
        record.error = None;
        record.claimed_at = Some(now);
        record.updated_at = now;
        Ok(Some(record.clone()))
    }

    async fn mark_ingested(&self, id: Uuid, content: &str) -> Result<()> {
        self.update_feedback(id, |f| {
            f.content = Some(content.to_string());
            f.status = FeedbackStatus::Ingested;
        })
    }

    async fn record_analysis(&self, id: Uuid, analysis: &ExtractedEntities) -> Result<()> {
        self.update_feedback(id, |f| {
            f.analysis = Some(analysis.clone());
            f.status = FeedbackStatus::Analyzed;
        })
    }

    async fn record_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        self.update_feedback(id, |f| f.summary = Some(summary.to_string()))
    }

    async fn mark_completed(&self, id: Uuid, stories_count: i32) -> Result<()> {
        self.update_feedback(id, |f| {
            f.stories_count = stories_count;
            f.status = FeedbackStatus::Completed;
            f.claimed_at = None;
        })
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()> {
        self.update_feedback(id, |f| {
            f.error = Some(message.to_string());
            f.status = FeedbackStatus::Error;
            f.claimed_at = None;
        })
    }

    async fn distinct_themes(&self) -> Result<Vec<String>> {
        let themes: BTreeSet<String> = read(&self.feedback)
            .values()
            .filter_map(|f| f.analysis.as_ref())
            .flat_map(|a| a.themes.iter().cloned())
            .collect();
        Ok(themes.into_iter().collect())
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn insert_story(&self, story: &UserStory) -> Result<()> {
        let mut stored = story.clone();
        stored.rice_score = Some(story.score());
        write(&self.stories).insert(stored.id, stored);
        Ok(())
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<UserStory>> {
        Ok(read(&self.stories).get(&id).cloned())
    }

    async fn list_stories(&self, query: &BacklogQuery) -> Result<Vec<UserStory>> {
        let mut matching: Vec<UserStory> = read(&self.stories)
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.score()
                .total_cmp(&a.score())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        write(&self.files).insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        read(&self.files).get(key).cloned().ok_or_else(|| {
            PipelineError::storage(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", key),
            ))
        })
    }
}

struct StoredDocument {
    id: Uuid,
    namespace: String,
    content: String,
    doc_type: DocumentType,
    metadata: serde_json::Value,
    embedding: Vec<f32>,
}

/// In-memory vector store with brute-force cosine search.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    pub fn document_count(&self) -> usize {
        read(&self.documents).len()
    }

    pub fn namespace_count(&self, namespace: &str) -> usize {
        read(&self.documents)
            .iter()
            .filter(|d| d.namespace == namespace)
            .count()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_documents(&self, documents: Vec<NewDocument>, namespace: &str) -> Result<Vec<Uuid>> {
        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let stored: Vec<StoredDocument> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| StoredDocument {
                id: Uuid::new_v4(),
                namespace: namespace.to_string(),
                content: doc.content,
                doc_type: doc.doc_type,
                metadata: doc.metadata,
                embedding,
            })
            .collect();
        let ids = stored.iter().map(|d| d.id).collect();
        write(&self.documents).extend(stored);
        Ok(ids)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        doc_type: Option<DocumentType>,
    ) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed_one(query).await?;

        let mut hits: Vec<SearchHit> = read(&self.documents)
            .iter()
            .filter(|d| doc_type.map_or(true, |t| d.doc_type == t))
            .map(|d| SearchHit {
                id: d.id,
                namespace: d.namespace.clone(),
                content: d.content.clone(),
                metadata: d.metadata.clone(),
                doc_type: d.doc_type,
                similarity: f64::from(cosine_similarity(&query_embedding, &d.embedding)),
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_documents(&self, ids: &[Uuid]) -> Result<()> {
        write(&self.documents).retain(|d| !ids.contains(&d.id));
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        let mut documents = write(&self.documents);
        let before = documents.len();
        documents.retain(|d| d.namespace != namespace);
        Ok((before - documents.len()) as u64)
    }
}
