//! Prioritization: score drafts, persist them and index them for search.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{FeedbackState, Stage};
use crate::deps::PipelineDeps;
use crate::error::Result;
use crate::scoring::{estimate_rice_parameters, prioritize_stories};
use crate::traits::{FeedbackStore, StoryStore, VectorStore};
use crate::types::{DocumentType, ExtractedEntities, NewDocument, StoryStatus, UserStory};

/// Score every draft from the extracted entities, highest first.
pub fn score_drafts(state: &FeedbackState, entities: &ExtractedEntities) -> Vec<UserStory> {
    let importance = entities.theme_importance();
    let user_count = entities.estimated_user_count();

    let stories = state
        .drafts()
        .iter()
        .cloned()
        .map(|draft| {
            let sentiment = entities.sentiment_for(&draft.themes);
            let params = estimate_rice_parameters(
                &format!("{} {}", draft.title, draft.description),
                &importance,
                sentiment,
                user_count,
            );
            UserStory::from_draft(draft, params, StoryStatus::Generated)
        })
        .collect();

    prioritize_stories(stories)
}

/// Vector-store document for a persisted story.
pub fn story_document(story: &UserStory) -> NewDocument {
    NewDocument {
        content: story.embedding_text(),
        doc_type: DocumentType::Story,
        metadata: json!({
            "id": story.id,
            "title": story.title,
            "themes": story.themes,
            "rice_score": story.rice_score,
            "type": DocumentType::Story,
            "feedback_ids": story.feedback_ids,
        }),
    }
}

/// Last stage: RICE-scores the drafts, stores and embeds each story, and
/// completes the feedback record.
pub struct Prioritizer {
    feedback: Arc<dyn FeedbackStore>,
    stories: Arc<dyn StoryStore>,
    vectors: Arc<dyn VectorStore>,
}

impl Prioritizer {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            feedback: deps.feedback.clone(),
            stories: deps.stories.clone(),
            vectors: deps.vectors.clone(),
        }
    }
}

#[async_trait]
impl Stage for Prioritizer {
    fn name(&self) -> &'static str {
        "prioritize"
    }

    #[instrument(skip(self, state), fields(feedback_id = %state.feedback_id()))]
    async fn run(&self, state: FeedbackState) -> Result<FeedbackState> {
        let entities = state.require_entities(self.name())?;
        let stories = score_drafts(&state, entities);

        for story in &stories {
            self.stories.insert_story(story).await?;
            self.vectors
                .add_documents(vec![story_document(story)], &story.namespace())
                .await?;
            debug!(story_id = %story.id, score = story.score(), "Story stored");
        }

        let count = i32::try_from(stories.len()).unwrap_or(i32::MAX);
        self.feedback
            .mark_completed(state.feedback_id(), count)
            .await?;

        info!(
            stories = stories.len(),
            top_score = stories.first().map(UserStory::score),
            "Stories prioritized"
        );
        Ok(state.with_stories(stories))
    }
}
