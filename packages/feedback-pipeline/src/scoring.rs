//! RICE scoring: Reach × Impact × Confidence / Effort.
//!
//! Impact is bounded differently depending on where it comes from, and the
//! three ranges are intentionally kept apart:
//!
//! - the score formula clamps impact to `0..=SCORE_IMPACT_MAX`
//! - [`estimate_rice_parameters`] produces impact in
//!   `ESTIMATED_IMPACT_MIN..=ESTIMATED_IMPACT_MAX`
//! - manually created stories accept impact in `0..=MANUAL_IMPACT_MAX`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::UserStory;

pub const REACH_MAX: f64 = 10.0;
pub const SCORE_IMPACT_MAX: f64 = 10.0;
pub const CONFIDENCE_MAX: f64 = 10.0;
pub const EFFORT_MIN: f64 = 0.1;
pub const EFFORT_MAX: f64 = 10.0;

pub const ESTIMATED_IMPACT_MIN: f64 = 1.0;
pub const ESTIMATED_IMPACT_MAX: f64 = 10.0;
pub const MANUAL_IMPACT_MAX: f64 = 3.0;

pub const ESTIMATED_REACH_MIN: f64 = 1.0;
pub const USERS_PER_REACH_POINT: f64 = 100.0;
pub const DEFAULT_CONFIDENCE: f64 = 7.0;
pub const DEFAULT_EFFORT: f64 = 5.0;

/// The four RICE inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiceParameters {
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
}

impl RiceParameters {
    pub fn score(&self) -> f64 {
        calculate_rice_score(self.reach, self.impact, self.confidence, self.effort)
    }
}

/// Compute the RICE score, rounded to two decimals.
///
/// Out-of-range inputs are clamped, never rejected. `NaN` clamps to the
/// lower bound.
pub fn calculate_rice_score(reach: f64, impact: f64, confidence: f64, effort: f64) -> f64 {
    let reach = clamp(reach, 0.0, REACH_MAX);
    let impact = clamp(impact, 0.0, SCORE_IMPACT_MAX);
    let confidence = clamp(confidence, 0.0, CONFIDENCE_MAX) / 10.0;
    let effort = clamp(effort, EFFORT_MIN, EFFORT_MAX);

    round2(reach * impact * confidence / effort)
}

/// Score every story that has no score yet, then sort by score descending.
///
/// Existing scores are kept as-is. The sort is stable, so ties keep their
/// input order and applying this twice is a no-op.
pub fn prioritize_stories(mut stories: Vec<UserStory>) -> Vec<UserStory> {
    for story in stories.iter_mut().filter(|s| s.rice_score.is_none()) {
        story.rice_score = Some(story.rice_parameters().score());
    }
    stories.sort_by(|a, b| b.score().total_cmp(&a.score()));
    stories
}

/// Heuristic RICE inputs for a generated story.
///
/// `story_text` and `theme_importance` are accepted for future heuristics and
/// do not affect the result yet.
pub fn estimate_rice_parameters(
    _story_text: &str,
    _theme_importance: &BTreeMap<String, f64>,
    sentiment_score: f64,
    user_count: u32,
) -> RiceParameters {
    let reach = clamp(
        f64::from(user_count) / USERS_PER_REACH_POINT,
        ESTIMATED_REACH_MIN,
        REACH_MAX,
    );
    // -1 (pain) maps to 10, +1 (delight) maps to 1
    let impact = 5.5 - sentiment_score * 4.5;

    RiceParameters {
        reach,
        impact,
        confidence: DEFAULT_CONFIDENCE,
        effort: DEFAULT_EFFORT,
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
