//! Structured insights extracted from one feedback item.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Output of the extraction stage.
///
/// `themes` keeps duplicates: how often a theme is mentioned is the
/// importance signal used during prioritization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub themes: Vec<String>,

    /// Theme -> sentiment in `-1.0..=1.0`
    #[serde(default)]
    pub sentiments: BTreeMap<String, f64>,

    #[serde(default)]
    pub pain_points: Vec<String>,

    #[serde(default)]
    pub feature_requests: Vec<String>,

    /// One open attribute map per persona
    #[serde(default)]
    pub user_personas: Vec<BTreeMap<String, String>>,

    #[serde(default)]
    pub key_metrics: Map<String, Value>,
}

impl ExtractedEntities {
    /// Relative weight of each distinct theme: `count / len(themes) * 10`.
    pub fn theme_importance(&self) -> BTreeMap<String, f64> {
        let total = self.themes.len() as f64;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for theme in &self.themes {
            *counts.entry(theme.clone()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(theme, count)| (theme, count as f64 / total * 10.0))
            .collect()
    }

    /// Mean sentiment over the given themes that have a score; 0 if none do.
    pub fn sentiment_for(&self, themes: &[String]) -> f64 {
        let scores: Vec<f64> = themes
            .iter()
            .filter_map(|theme| self.sentiments.get(theme).copied())
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    /// Rough audience size: a hundred users per identified persona.
    pub fn estimated_user_count(&self) -> u32 {
        (self.user_personas.len() as u32).saturating_mul(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> ExtractedEntities {
        ExtractedEntities {
            themes: vec![
                "performance".into(),
                "search".into(),
                "performance".into(),
                "pricing".into(),
            ],
            sentiments: BTreeMap::from([
                ("performance".to_string(), -0.6),
                ("search".to_string(), -0.2),
            ]),
            user_personas: vec![BTreeMap::new(), BTreeMap::new()],
            ..Default::default()
        }
    }

    #[test]
    fn test_theme_importance_counts_duplicates() {
        let importance = entities().theme_importance();
        assert_eq!(importance.len(), 3);
        assert!((importance["performance"] - 5.0).abs() < 1e-9);
        assert!((importance["pricing"] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_theme_importance_empty() {
        assert!(ExtractedEntities::default().theme_importance().is_empty());
    }

    #[test]
    fn test_sentiment_for_ignores_unscored_themes() {
        let e = entities();
        let mean = e.sentiment_for(&["performance".into(), "search".into(), "pricing".into()]);
        assert!((mean - (-0.4)).abs() < 1e-9);
        assert_eq!(e.sentiment_for(&["pricing".into()]), 0.0);
        assert_eq!(e.sentiment_for(&[]), 0.0);
    }

    #[test]
    fn test_estimated_user_count() {
        assert_eq!(entities().estimated_user_count(), 200);
    }

    #[test]
    fn test_missing_fields_default_on_deserialize() {
        let e: ExtractedEntities = serde_json::from_str(r#"{"themes":["ux"]}"#).unwrap();
        assert_eq!(e.themes, vec!["ux"]);
        assert!(e.sentiments.is_empty());
        assert!(e.key_metrics.is_empty());
    }
}
