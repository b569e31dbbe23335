//! The record threaded through the pipeline stages.

use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::types::{DocumentChunk, ExtractedEntities, Feedback, StoryDraft, UserStory};

/// Accumulated output of the stages that have run so far.
///
/// Each stage consumes the state and returns it with its own field set.
/// There are setters but no way to clear a field, so later stages cannot
/// drop what earlier ones produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackState {
    feedback: Feedback,
    content: Option<String>,
    docs: Vec<DocumentChunk>,
    entities: Option<ExtractedEntities>,
    summary: Option<String>,
    drafts: Vec<StoryDraft>,
    stories: Vec<UserStory>,
}

impl FeedbackState {
    pub fn new(feedback: Feedback) -> Self {
        Self {
            feedback,
            content: None,
            docs: Vec::new(),
            entities: None,
            summary: None,
            drafts: Vec::new(),
            stories: Vec::new(),
        }
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn feedback_id(&self) -> Uuid {
        self.feedback.id
    }

    /// Resolved text, once ingested.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn docs(&self) -> &[DocumentChunk] {
        &self.docs
    }

    pub fn entities(&self) -> Option<&ExtractedEntities> {
        self.entities.as_ref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn drafts(&self) -> &[StoryDraft] {
        &self.drafts
    }

    /// Scored stories, highest score first.
    pub fn stories(&self) -> &[UserStory] {
        &self.stories
    }

    pub fn into_stories(self) -> Vec<UserStory> {
        self.stories
    }

    pub fn require_entities(&self, stage: &'static str) -> Result<&ExtractedEntities> {
        self.entities.as_ref().ok_or(PipelineError::MissingState {
            stage,
            field: "entities",
        })
    }

    pub fn require_summary(&self, stage: &'static str) -> Result<&str> {
        self.summary.as_deref().ok_or(PipelineError::MissingState {
            stage,
            field: "summary",
        })
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_docs(mut self, docs: Vec<DocumentChunk>) -> Self {
        self.docs = docs;
        self
    }

    pub fn with_entities(mut self, entities: ExtractedEntities) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_summary(mut self, summary: String) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_drafts(mut self, drafts: Vec<StoryDraft>) -> Self {
        self.drafts = drafts;
        self
    }

    pub fn with_stories(mut self, stories: Vec<UserStory>) -> Self {
        self.stories = stories;
        self
    }
}
