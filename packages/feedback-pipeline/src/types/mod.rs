//! Data types shared by the pipeline, the stores and the HTTP layer.

pub mod document;
pub mod entities;
pub mod feedback;
pub mod story;

pub use document::{ChunkMetadata, DocumentChunk, DocumentType, NewDocument, SearchHit};
pub use entities::ExtractedEntities;
pub use feedback::{Feedback, FeedbackStatus, NewFeedback};
pub use story::{BacklogQuery, NewStory, StoryDraft, StoryStatus, UserStory};
