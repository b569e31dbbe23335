//! Persistence traits for feedback, stories and raw uploads.
//!
//! Each status-changing method is one write that also bumps `updated_at`.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{BacklogQuery, ExtractedEntities, Feedback, NewFeedback, UserStory};

/// How long a processing claim is honored before it counts as abandoned.
///
/// A run whose request was dropped never releases its claim; after this
/// long the record can be claimed again.
pub const PROCESSING_LEASE_SECS: i64 = 15 * 60;

pub fn default_processing_lease() -> Duration {
    Duration::seconds(PROCESSING_LEASE_SECS)
}

/// Storage for feedback records.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Insert a new record in status `pending`.
    async fn create_feedback(&self, input: NewFeedback) -> Result<Feedback>;

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>>;

    /// All records, newest first.
    async fn list_feedback(&self) -> Result<Vec<Feedback>>;

    /// Atomically take the processing claim and set status `processing`.
    ///
    /// Returns `None` while another run holds an unexpired claim, whatever
    /// stage that run has reached. Errors with `NotFound` when the record
    /// does not exist.
    async fn claim_for_processing(&self, id: Uuid) -> Result<Option<Feedback>>;

    /// Persist the resolved content and set status `ingested`.
    async fn mark_ingested(&self, id: Uuid, content: &str) -> Result<()>;

    /// Persist extracted entities and set status `analyzed`.
    async fn record_analysis(&self, id: Uuid, analysis: &ExtractedEntities) -> Result<()>;

    async fn record_summary(&self, id: Uuid, summary: &str) -> Result<()>;

    /// Set status `completed` with the number of stories produced and
    /// release the claim.
    async fn mark_completed(&self, id: Uuid, stories_count: i32) -> Result<()>;

    /// Set status `error` with the failure message and release the claim.
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()>;

    /// Distinct theme labels across every analyzed record, sorted.
    async fn distinct_themes(&self) -> Result<Vec<String>>;
}

/// Storage for backlog stories.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Persist a story. A story without a score is stored with its computed one.
    async fn insert_story(&self, story: &UserStory) -> Result<()>;

    async fn get_story(&self, id: Uuid) -> Result<Option<UserStory>>;

    /// Stories matching the query, highest score first.
    async fn list_stories(&self, query: &BacklogQuery) -> Result<Vec<UserStory>>;
}

/// Blob storage for raw uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Errors with a storage error when the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}
