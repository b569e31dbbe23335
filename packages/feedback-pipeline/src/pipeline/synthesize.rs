//! Synthesis: a narrative summary of the extracted insights.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use super::prompts::{format_synthesize_prompt, ANALYST_SYSTEM_PROMPT};
use super::{FeedbackState, Stage};
use crate::deps::PipelineDeps;
use crate::error::{PipelineError, Result};
use crate::traits::{FeedbackStore, LanguageModel, Prompt};
use crate::types::DocumentChunk;

pub const SYNTHESIZE_TEMPERATURE: f32 = 0.4;
pub const SAMPLE_COUNT: usize = 3;
pub const SAMPLE_CHARS: usize = 200;

const UNKNOWN_SOURCE: &str = "unknown";

/// First [`SAMPLE_COUNT`] chunks, each cut to [`SAMPLE_CHARS`] and
/// followed by an ellipsis.
pub fn sample_excerpts(docs: &[DocumentChunk]) -> Vec<String> {
    docs.iter()
        .take(SAMPLE_COUNT)
        .map(|d| {
            let excerpt: String = d.content.chars().take(SAMPLE_CHARS).collect();
            format!("{}...", excerpt)
        })
        .collect()
}

/// Third stage: free-text summary, stored verbatim on the feedback.
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
    feedback: Arc<dyn FeedbackStore>,
}

impl Synthesizer {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            model: deps.model.clone(),
            feedback: deps.feedback.clone(),
        }
    }

    #[instrument(skip(self, state), fields(feedback_id = %state.feedback_id()))]
    pub async fn invoke(&self, state: FeedbackState) -> Result<FeedbackState> {
        let entities = state.require_entities(self.name())?;
        let feedback = state.feedback();
        let source = if feedback.source.is_empty() {
            UNKNOWN_SOURCE
        } else {
            feedback.source.as_str()
        };

        let prompt = Prompt::new(
            ANALYST_SYSTEM_PROMPT,
            format_synthesize_prompt(source, &feedback.title, entities, &sample_excerpts(state.docs())),
            SYNTHESIZE_TEMPERATURE,
        );
        let summary = self.model.complete(&prompt).await?;
        self.feedback
            .record_summary(state.feedback_id(), &summary)
            .await?;

        info!(summary_chars = summary.chars().count(), "Insights synthesized");
        Ok(state.with_summary(summary))
    }

    /// Same as [`Synthesizer::invoke`], driven on a private current-thread
    /// runtime. Must not be called from inside an async runtime.
    pub fn invoke_blocking(&self, state: FeedbackState) -> Result<FeedbackState> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(PipelineError::Runtime(
                "invoke_blocking called from within an async runtime; use invoke".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError::Runtime(e.to_string()))?;
        runtime.block_on(self.invoke(state))
    }
}

#[async_trait]
impl Stage for Synthesizer {
    fn name(&self) -> &'static str {
        "synthesize"
    }

    async fn run(&self, state: FeedbackState) -> Result<FeedbackState> {
        self.invoke(state).await
    }
}
