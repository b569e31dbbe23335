//! User stories: drafts from the generator and scored backlog items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::scoring::{self, RiceParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "story_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    /// Produced by the pipeline
    Generated,
    /// Created through the backlog API
    Manual,
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generated => "generated",
            Self::Manual => "manual",
        })
    }
}

/// A generated story before it has been scored or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub as_a: String,
    pub i_want: String,
    pub so_that: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub themes: Vec<String>,
    pub feedback_ids: Vec<Uuid>,
}

impl StoryDraft {
    /// "As a …, I want … so that …"
    pub fn narrative(&self) -> String {
        format!("As a {}, I want {} so that {}", self.as_a, self.i_want, self.so_that)
    }
}

/// A backlog item with its RICE inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: Uuid,
    pub title: String,
    pub as_a: String,
    pub i_want: String,
    pub so_that: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub themes: Vec<String>,
    pub feedback_ids: Vec<Uuid>,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,

    /// `None` until scored; a present value is never recomputed by
    /// [`scoring::prioritize_stories`].
    pub rice_score: Option<f64>,

    pub status: StoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStory {
    /// Attach RICE inputs to a draft. The score is left for prioritization.
    pub fn from_draft(draft: StoryDraft, params: RiceParameters, status: StoryStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            as_a: draft.as_a,
            i_want: draft.i_want,
            so_that: draft.so_that,
            description: draft.description,
            acceptance_criteria: draft.acceptance_criteria,
            themes: draft.themes,
            feedback_ids: draft.feedback_ids,
            reach: params.reach,
            impact: params.impact,
            confidence: params.confidence,
            effort: params.effort,
            rice_score: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rice_parameters(&self) -> RiceParameters {
        RiceParameters {
            reach: self.reach,
            impact: self.impact,
            confidence: self.confidence,
            effort: self.effort,
        }
    }

    /// The stored score, or the formula applied to the current inputs.
    pub fn score(&self) -> f64 {
        self.rice_score
            .unwrap_or_else(|| self.rice_parameters().score())
    }

    /// Text embedded for semantic search over the backlog.
    pub fn embedding_text(&self) -> String {
        format!(
            "Title: {}\nAs a {}, I want {} so that {}\n\n{}",
            self.title, self.as_a, self.i_want, self.so_that, self.description
        )
    }

    pub fn namespace(&self) -> String {
        format!("story:{}", self.id)
    }
}

/// A story authored through the backlog API.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStory {
    pub title: String,
    pub as_a: String,
    pub i_want: String,
    pub so_that: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub feedback_ids: Vec<Uuid>,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,

    /// Client override; computed when absent
    #[serde(default)]
    pub rice_score: Option<f64>,
}

impl NewStory {
    /// Check each RICE input against the manual-entry bounds.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PipelineError::Validation("title must not be empty".into()));
        }
        check_range("reach", self.reach, 0.0, scoring::REACH_MAX)?;
        check_range("impact", self.impact, 0.0, scoring::MANUAL_IMPACT_MAX)?;
        check_range("confidence", self.confidence, 0.0, scoring::CONFIDENCE_MAX)?;
        check_range("effort", self.effort, scoring::EFFORT_MIN, scoring::EFFORT_MAX)?;
        if let Some(score) = self.rice_score {
            if !score.is_finite() || score < 0.0 {
                return Err(PipelineError::Validation(format!(
                    "rice_score must be a non-negative number, got {}",
                    score
                )));
            }
        }
        Ok(())
    }

    /// Validate and turn into a scored manual story.
    pub fn into_story(self) -> Result<UserStory> {
        self.validate()?;
        let params = RiceParameters {
            reach: self.reach,
            impact: self.impact,
            confidence: self.confidence,
            effort: self.effort,
        };
        let rice_score = self.rice_score.unwrap_or_else(|| params.score());
        let draft = StoryDraft {
            title: self.title,
            as_a: self.as_a,
            i_want: self.i_want,
            so_that: self.so_that,
            description: self.description,
            acceptance_criteria: self.acceptance_criteria,
            themes: self.themes,
            feedback_ids: self.feedback_ids,
        };
        let mut story = UserStory::from_draft(draft, params, StoryStatus::Manual);
        story.rice_score = Some(rice_score);
        Ok(story)
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(PipelineError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Filters and paging for the backlog listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BacklogQuery {
    pub min_score: Option<f64>,
    /// Case-insensitive substring match against any of a story's themes
    pub theme: Option<String>,
    #[serde(default = "BacklogQuery::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl BacklogQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    fn default_limit() -> i64 {
        Self::DEFAULT_LIMIT
    }

    /// Clamp paging to sane bounds.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, Self::MAX_LIMIT);
        self.offset = self.offset.max(0);
        self.theme = self.theme.filter(|t| !t.trim().is_empty());
        self
    }

    /// Whether a story passes the score and theme filters.
    pub fn matches(&self, story: &UserStory) -> bool {
        if let Some(min) = self.min_score {
            if story.score() < min {
                return false;
            }
        }
        if let Some(theme) = &self.theme {
            let needle = theme.to_lowercase();
            if !story
                .themes
                .iter()
                .any(|t| t.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

impl Default for BacklogQuery {
    fn default() -> Self {
        Self {
            min_score: None,
            theme: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
