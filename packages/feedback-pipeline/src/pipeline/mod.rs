//! Feedback analysis pipeline.
//!
//! Five stages run in a fixed order, each taking the accumulated
//! [`FeedbackState`] and returning it with its own output added:
//! - [`Ingestor`]: resolve content, chunk and index it
//! - [`Extractor`]: structured insights from the chunks
//! - [`Synthesizer`]: narrative summary
//! - [`Generator`]: user story drafts
//! - [`Prioritizer`]: RICE scoring, persistence and story indexing
//!
//! [`FeedbackPipeline`] sequences them.

use async_trait::async_trait;

use crate::error::Result;

pub mod extract;
pub mod generate;
pub mod ingest;
pub mod orchestrator;
pub mod prioritize;
pub mod prompts;
pub mod state;
pub mod synthesize;

pub use extract::{combine_documents, Extractor, InsightExtraction};
pub use generate::{GeneratedStories, GeneratedStory, Generator};
pub use ingest::Ingestor;
pub use orchestrator::FeedbackPipeline;
pub use prioritize::{score_drafts, story_document, Prioritizer};
pub use state::FeedbackState;
pub use synthesize::{sample_excerpts, Synthesizer};

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, state: FeedbackState) -> Result<FeedbackState>;
}
