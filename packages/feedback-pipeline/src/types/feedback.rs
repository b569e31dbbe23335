//! Feedback records and their processing status.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::entities::ExtractedEntities;

/// Lifecycle of a feedback item.
///
/// `pending` on upload, `processing` once claimed, then `ingested` and
/// `analyzed` as the stages persist their output, ending in `completed`
/// or `error`. The status is informational; exclusive processing is held
/// by [`Feedback::claimed_at`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "feedback_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Processing,
    Ingested,
    Analyzed,
    Completed,
    Error,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ingested => "ingested",
            Self::Analyzed => "analyzed",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of customer feedback, either inline text or an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source: String,

    /// Inline text on upload; replaced by the resolved text after ingestion
    pub content: Option<String>,

    /// Key into the file store for uploaded files
    pub file_path: Option<String>,

    pub status: FeedbackStatus,
    pub summary: Option<String>,
    pub error: Option<String>,

    /// Entities from the last extraction run
    pub analysis: Option<ExtractedEntities>,

    pub stories_count: i32,

    /// Set when a pipeline run claims the record, cleared when it completes
    /// or fails. A claim older than the store's lease is treated as abandoned.
    pub claimed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    /// Whether a run still holds this record at `now`.
    pub fn is_claimed(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.claimed_at.is_some_and(|at| now - at < lease)
    }

    /// Vector-store namespace holding this item's chunks.
    pub fn namespace(&self) -> String {
        Self::namespace_for(self.id)
    }

    pub fn namespace_for(id: Uuid) -> String {
        format!("feedback:{}", id)
    }
}

/// Input for creating a feedback record.
///
/// The id is chosen by the caller so an uploaded file can be stored under
/// it before the record exists.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source: String,
    pub content: Option<String>,
    pub file_path: Option<String>,
}

impl NewFeedback {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            source: source.into(),
            content: None,
            file_path: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    /// Materialize the record as it looks right after upload.
    pub fn into_feedback(self, now: DateTime<Utc>) -> Feedback {
        Feedback {
            id: self.id,
            title: self.title,
            description: self.description,
            source: self.source,
            content: self.content,
            file_path: self.file_path,
            status: FeedbackStatus::Pending,
            summary: None,
            error: None,
            analysis: None,
            stories_count: 0,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(FeedbackStatus::Processing).unwrap(),
            "processing"
        );
        assert_eq!(FeedbackStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_new_feedback_starts_pending() {
        let feedback = NewFeedback::new("Survey", "survey")
            .with_content("slow exports")
            .into_feedback(Utc::now());

        assert_eq!(feedback.status, FeedbackStatus::Pending);
        assert_eq!(feedback.stories_count, 0);
        assert_eq!(feedback.namespace(), format!("feedback:{}", feedback.id));
    }
}
