//! Trait seams between the pipeline and its collaborators.
//!
//! Stages depend only on these traits; the server wires in Postgres and
//! OpenAI implementations, tests wire in the in-memory stores and mocks.

pub mod model;
pub mod store;
pub mod vector;

pub use model::{complete_as, Embedder, LanguageModel, Prompt};
pub use store::{
    default_processing_lease, FeedbackStore, FileStore, StoryStore, PROCESSING_LEASE_SECS,
};
pub use vector::{cosine_similarity, VectorStore};
