//! Explicit dependency container for the pipeline stages.

use std::sync::Arc;

use crate::traits::{FeedbackStore, FileStore, LanguageModel, StoryStore, VectorStore};

/// Everything the stages talk to, built once by the application and shared.
#[derive(Clone)]
pub struct PipelineDeps {
    pub feedback: Arc<dyn FeedbackStore>,
    pub stories: Arc<dyn StoryStore>,
    pub files: Arc<dyn FileStore>,
    pub vectors: Arc<dyn VectorStore>,
    pub model: Arc<dyn LanguageModel>,
}

impl PipelineDeps {
    pub fn new(
        feedback: Arc<dyn FeedbackStore>,
        stories: Arc<dyn StoryStore>,
        files: Arc<dyn FileStore>,
        vectors: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            feedback,
            stories,
            files,
            vectors,
            model,
        }
    }
}
