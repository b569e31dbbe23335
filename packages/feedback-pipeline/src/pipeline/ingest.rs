//! Ingestion: resolve feedback text, chunk it and index the chunks.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{FeedbackState, Stage};
use crate::chunking::{split_text, ChunkConfig};
use crate::content::{prepend_description, resolve_file_content};
use crate::deps::PipelineDeps;
use crate::error::Result;
use crate::traits::{FeedbackStore, FileStore, VectorStore};
use crate::types::{ChunkMetadata, DocumentChunk, DocumentType, Feedback};

/// First stage: produces the resolved content and its chunks.
///
/// Re-ingesting a feedback item replaces its previously indexed chunks.
pub struct Ingestor {
    feedback: Arc<dyn FeedbackStore>,
    files: Arc<dyn FileStore>,
    vectors: Arc<dyn VectorStore>,
    chunking: ChunkConfig,
}

impl Ingestor {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            feedback: deps.feedback.clone(),
            files: deps.files.clone(),
            vectors: deps.vectors.clone(),
            chunking: ChunkConfig::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// The stored file if there is one, else the inline text, with the
    /// description in front.
    pub async fn resolve_content(&self, feedback: &Feedback) -> Result<String> {
        let body = match (&feedback.file_path, &feedback.content) {
            (Some(path), _) => {
                let bytes = self.files.get(path).await?;
                debug!(path = %path, bytes = bytes.len(), "Loaded stored upload");
                resolve_file_content(path, &bytes)
            }
            (None, Some(content)) => content.clone(),
            (None, None) => String::new(),
        };
        Ok(prepend_description(feedback.description.as_deref(), body))
    }

    fn to_chunks(&self, feedback: &Feedback, content: &str) -> Vec<DocumentChunk> {
        split_text(content, &self.chunking)
            .into_iter()
            .map(|chunk| DocumentChunk {
                content: chunk.text,
                metadata: ChunkMetadata {
                    feedback_id: feedback.id,
                    source: feedback.source.clone(),
                    title: feedback.title.clone(),
                    doc_type: DocumentType::Feedback,
                },
            })
            .collect()
    }
}

#[async_trait]
impl Stage for Ingestor {
    fn name(&self) -> &'static str {
        "ingest"
    }

    #[instrument(skip(self, state), fields(feedback_id = %state.feedback_id()))]
    async fn run(&self, state: FeedbackState) -> Result<FeedbackState> {
        let feedback = state.feedback();
        let content = self.resolve_content(feedback).await?;
        self.feedback.mark_ingested(feedback.id, &content).await?;

        let docs = self.to_chunks(feedback, &content);
        let namespace = feedback.namespace();
        let replaced = self.vectors.delete_namespace(&namespace).await?;
        if !docs.is_empty() {
            self.vectors
                .add_documents(docs.iter().map(DocumentChunk::to_document).collect(), &namespace)
                .await?;
        }

        info!(
            content_chars = content.chars().count(),
            chunks = docs.len(),
            replaced,
            "Feedback ingested"
        );
        Ok(state.with_content(content).with_docs(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_deps;
    use crate::types::{FeedbackStatus, NewFeedback};

    #[tokio::test]
    async fn test_inline_content_with_description() {
        let (deps, handles) = test_deps();
        let feedback = deps
            .feedback
            .create_feedback(
                NewFeedback::new("Q3 survey", "survey")
                    .with_description("Collected in September")
                    .with_content("Users report slow search after update."),
            )
            .await
            .unwrap();

        let state = Ingestor::new(&deps)
            .run(FeedbackState::new(feedback.clone()))
            .await
            .unwrap();

        assert_eq!(
            state.content(),
            Some("Collected in September\n\nUsers report slow search after update.")
        );
        assert_eq!(state.docs().len(), 1);
        assert_eq!(state.docs()[0].metadata.feedback_id, feedback.id);
        assert_eq!(state.docs()[0].metadata.doc_type, DocumentType::Feedback);
        assert_eq!(handles.vectors.namespace_count(&feedback.namespace()), 1);

        let stored = deps.feedback.get_feedback(feedback.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FeedbackStatus::Ingested);
        assert_eq!(stored.content.as_deref(), state.content());
    }

    #[tokio::test]
    async fn test_file_content_wins_over_inline() {
        let (deps, _) = test_deps();
        let id = uuid::Uuid::new_v4();
        let key = format!("{}.csv", id);
        deps.files
            .put(&key, b"user,comment\nana,exports fail\n".to_vec())
            .await
            .unwrap();
        let feedback = deps
            .feedback
            .create_feedback(
                NewFeedback::new("Export survey", "survey")
                    .with_id(id)
                    .with_file_path(&key)
                    .with_content("ignored"),
            )
            .await
            .unwrap();

        let state = Ingestor::new(&deps)
            .run(FeedbackState::new(feedback))
            .await
            .unwrap();
        assert_eq!(state.content(), Some("user: ana, comment: exports fail"));
    }

    #[tokio::test]
    async fn test_reingest_replaces_chunks() {
        let (deps, handles) = test_deps();
        let feedback = deps
            .feedback
            .create_feedback(NewFeedback::new("t", "support").with_content("word ".repeat(600)))
            .await
            .unwrap();
        let ingestor = Ingestor::new(&deps);

        let first = ingestor.run(FeedbackState::new(feedback.clone())).await.unwrap();
        assert!(first.docs().len() >= 3);
        ingestor.run(FeedbackState::new(feedback.clone())).await.unwrap();

        assert_eq!(
            handles.vectors.namespace_count(&feedback.namespace()),
            first.docs().len()
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let (deps, _) = test_deps();
        let feedback = deps
            .feedback
            .create_feedback(NewFeedback::new("t", "survey").with_file_path("gone.txt"))
            .await
            .unwrap();

        assert!(Ingestor::new(&deps)
            .run(FeedbackState::new(feedback))
            .await
            .is_err());
    }
}
