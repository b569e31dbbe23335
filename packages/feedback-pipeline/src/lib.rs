//! Feedback Analysis Pipeline
//!
//! Turns raw customer feedback (inline text or uploaded JSON/CSV/text files)
//! into a RICE-ranked backlog of user stories.
//!
//! # Design Philosophy
//!
//! - Stages are small structs behind one [`pipeline::Stage`] trait
//! - State is an immutable record passed from stage to stage
//! - Collaborators (stores, vector index, model) are injected, never global
//! - Malformed uploads degrade to descriptive text instead of failing
//!
//! # Usage
//!
//! ```rust,ignore
//! use feedback_pipeline::{FeedbackPipeline, NewFeedback};
//! use feedback_pipeline::testing::{test_deps_with, MockLanguageModel};
//!
//! let (deps, _handles) = test_deps_with(MockLanguageModel::new());
//! let feedback = deps
//!     .feedback
//!     .create_feedback(NewFeedback::new("Q3 survey", "survey").with_content("Search is slow"))
//!     .await?;
//!
//! let state = FeedbackPipeline::new(&deps).run(feedback).await?;
//! for story in state.stories() {
//!     println!("{:>6.2}  {}", story.score(), story.title);
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Feedback, chunks, entities and stories
//! - [`scoring`] - RICE arithmetic and parameter estimation
//! - [`chunking`] - Overlapping text splitter
//! - [`content`] - Upload parsing (JSON/CSV/text)
//! - [`traits`] - Storage, vector and model seams
//! - [`stores`] - In-memory, filesystem and Postgres backends
//! - [`ai`] - OpenAI-backed model and embedder
//! - [`pipeline`] - The five stages and their sequencer
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod chunking;
pub mod content;
pub mod deps;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use deps::PipelineDeps;
pub use error::{PipelineError, Result};
pub use pipeline::{FeedbackPipeline, FeedbackState, Stage};
pub use scoring::{
    calculate_rice_score, estimate_rice_parameters, prioritize_stories, RiceParameters,
};
pub use traits::{Embedder, FeedbackStore, FileStore, LanguageModel, Prompt, StoryStore, VectorStore};
pub use types::{
    BacklogQuery, ChunkMetadata, DocumentChunk, DocumentType, ExtractedEntities, Feedback,
    FeedbackStatus, NewDocument, NewFeedback, NewStory, SearchHit, StoryDraft, StoryStatus,
    UserStory,
};
