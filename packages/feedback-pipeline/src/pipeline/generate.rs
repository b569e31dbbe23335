//! Story generation from the synthesis.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::prompts::{format_generate_prompt, ANALYST_SYSTEM_PROMPT};
use super::{FeedbackState, Stage};
use crate::deps::PipelineDeps;
use crate::error::Result;
use crate::traits::{complete_as, LanguageModel, Prompt};
use crate::types::StoryDraft;

pub const GENERATE_TEMPERATURE: f32 = 0.5;

/// Model output for the story generation request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedStories {
    pub stories: Vec<GeneratedStory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedStory {
    /// Short backlog title
    pub title: String,
    /// The user role
    pub as_a: String,
    /// What the user wants
    pub i_want: String,
    /// Why they want it
    pub so_that: String,
    /// Problem and expected outcome
    pub description: String,
    /// Testable conditions of done
    pub acceptance_criteria: Vec<String>,
    /// Theme labels the story addresses
    pub themes: Vec<String>,
}

impl GeneratedStory {
    fn into_draft(self, feedback_id: Uuid) -> StoryDraft {
        StoryDraft {
            title: self.title,
            as_a: self.as_a,
            i_want: self.i_want,
            so_that: self.so_that,
            description: self.description,
            acceptance_criteria: self.acceptance_criteria,
            themes: self.themes,
            feedback_ids: vec![feedback_id],
        }
    }
}

/// Fourth stage: drafts user stories. Nothing is persisted here.
pub struct Generator {
    model: Arc<dyn LanguageModel>,
}

impl Generator {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            model: deps.model.clone(),
        }
    }
}

#[async_trait]
impl Stage for Generator {
    fn name(&self) -> &'static str {
        "generate"
    }

    #[instrument(skip(self, state), fields(feedback_id = %state.feedback_id()))]
    async fn run(&self, state: FeedbackState) -> Result<FeedbackState> {
        let entities = state.require_entities(self.name())?;
        let summary = state.require_summary(self.name())?;

        let prompt = Prompt::new(
            ANALYST_SYSTEM_PROMPT,
            format_generate_prompt(summary, entities),
            GENERATE_TEMPERATURE,
        );
        let generated: GeneratedStories = complete_as(self.model.as_ref(), &prompt).await?;

        let feedback_id = state.feedback_id();
        let drafts: Vec<StoryDraft> = generated
            .stories
            .into_iter()
            .map(|s| s.into_draft(feedback_id))
            .collect();

        info!(stories = drafts.len(), "Stories generated");
        Ok(state.with_drafts(drafts))
    }
}
