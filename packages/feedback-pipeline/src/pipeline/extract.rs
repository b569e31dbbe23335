//! Extraction: structured insights from the ingested chunks.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::prompts::{format_extract_prompt, ANALYST_SYSTEM_PROMPT};
use super::{FeedbackState, Stage};
use crate::deps::PipelineDeps;
use crate::error::Result;
use crate::traits::{complete_as, FeedbackStore, LanguageModel, Prompt};
use crate::types::{DocumentChunk, ExtractedEntities};

pub const EXTRACT_TEMPERATURE: f32 = 0.3;

/// Characters of combined chunk text sent to the model.
pub const MAX_EXTRACT_CHARS: usize = 12_000;
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Model output for the extraction request.
///
/// Open maps are not allowed in strict schemas, so sentiments, personas and
/// metrics come back as lists and are folded into maps afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InsightExtraction {
    /// Main topics, repeated once per distinct mention
    pub themes: Vec<String>,
    /// Sentiment per theme
    pub sentiments: Vec<ThemeSentiment>,
    /// Problems users report
    pub pain_points: Vec<String>,
    /// Features or improvements users ask for
    pub feature_requests: Vec<String>,
    /// Kinds of users behind the feedback
    pub user_personas: Vec<Persona>,
    /// Quantitative signals found in the feedback
    pub key_metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThemeSentiment {
    pub theme: String,
    /// Between -1 (very negative) and 1 (very positive)
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Persona {
    pub attributes: Vec<PersonaAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PersonaAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Metric {
    pub name: String,
    /// Number or text as written in the feedback
    pub value: String,
}

impl From<InsightExtraction> for ExtractedEntities {
    fn from(raw: InsightExtraction) -> Self {
        let sentiments = raw
            .sentiments
            .into_iter()
            .map(|s| (s.theme, s.score.clamp(-1.0, 1.0)))
            .collect();
        let user_personas = raw
            .user_personas
            .into_iter()
            .map(|p| p.attributes.into_iter().map(|a| (a.name, a.value)).collect())
            .collect();
        let key_metrics: Map<String, Value> = raw
            .key_metrics
            .into_iter()
            .map(|m| {
                let value = serde_json::from_str(&m.value).unwrap_or(Value::String(m.value));
                (m.name, value)
            })
            .collect();

        Self {
            themes: raw.themes,
            sentiments,
            pain_points: raw.pain_points,
            feature_requests: raw.feature_requests,
            user_personas,
            key_metrics,
        }
    }
}

/// Join chunk texts with blank lines, cut at [`MAX_EXTRACT_CHARS`].
pub fn combine_documents(docs: &[DocumentChunk]) -> String {
    let combined = docs
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    match combined.char_indices().nth(MAX_EXTRACT_CHARS) {
        Some((cut, _)) => format!("{}{}", &combined[..cut], TRUNCATION_MARKER),
        None => combined,
    }
}

/// Second stage: asks the model for [`InsightExtraction`] and persists it.
pub struct Extractor {
    model: Arc<dyn LanguageModel>,
    feedback: Arc<dyn FeedbackStore>,
}

impl Extractor {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            model: deps.model.clone(),
            feedback: deps.feedback.clone(),
        }
    }
}

#[async_trait]
impl Stage for Extractor {
    fn name(&self) -> &'static str {
        "extract"
    }

    #[instrument(skip(self, state), fields(feedback_id = %state.feedback_id()))]
    async fn run(&self, state: FeedbackState) -> Result<FeedbackState> {
        let text = combine_documents(state.docs());
        debug!(chars = text.chars().count(), "Extracting insights");

        let prompt = Prompt::new(
            ANALYST_SYSTEM_PROMPT,
            format_extract_prompt(&text),
            EXTRACT_TEMPERATURE,
        );
        let raw: InsightExtraction = complete_as(self.model.as_ref(), &prompt).await?;
        let entities = ExtractedEntities::from(raw);

        self.feedback
            .record_analysis(state.feedback_id(), &entities)
            .await?;

        info!(
            themes = entities.themes.len(),
            pain_points = entities.pain_points.len(),
            feature_requests = entities.feature_requests.len(),
            "Insights extracted"
        );
        Ok(state.with_entities(entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::testing::{test_deps_with, MockLanguageModel};
    use crate::types::{ChunkMetadata, DocumentType, FeedbackStatus, NewFeedback};
    use openai_client::StructuredOutput;
    use serde_json::json;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk {
            content: text.into(),
            metadata: ChunkMetadata {
                feedback_id: uuid::Uuid::nil(),
                source: "survey".into(),
                title: "t".into(),
                doc_type: DocumentType::Feedback,
            },
        }
    }

    #[test]
    fn test_combine_short_documents() {
        assert_eq!(combine_documents(&[chunk("a"), chunk("b")]), "a\n\nb");
        assert_eq!(combine_documents(&[]), "");
    }

    #[test]
    fn test_combine_truncates_with_marker() {
        let long = "é".repeat(MAX_EXTRACT_CHARS + 50);
        let combined = combine_documents(&[chunk(&long)]);
        assert!(combined.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            combined.chars().count(),
            MAX_EXTRACT_CHARS + TRUNCATION_MARKER.chars().count()
        );

        let exact = "x".repeat(MAX_EXTRACT_CHARS);
        assert_eq!(combine_documents(&[chunk(&exact)]), exact);
    }

    #[test]
    fn test_conversion_folds_lists_into_maps() {
        let raw: InsightExtraction = serde_json::from_value(json!({
            "themes": ["performance", "performance", "search"],
            "sentiments": [{"theme": "performance", "score": -1.7}],
            "pain_points": ["slow search"],
            "feature_requests": [],
            "user_personas": [{"attributes": [{"name": "role", "value": "analyst"}]}],
            "key_metrics": [
                {"name": "nps", "value": "31"},
                {"name": "period", "value": "Q3"}
            ]
        }))
        .unwrap();

        let entities = ExtractedEntities::from(raw);
        assert_eq!(entities.sentiments["performance"], -1.0);
        assert_eq!(entities.user_personas[0]["role"], "analyst");
        assert_eq!(entities.key_metrics["nps"], json!(31));
        assert_eq!(entities.key_metrics["period"], json!("Q3"));
        assert_eq!(entities.themes.len(), 3);
    }

    #[tokio::test]
    async fn test_run_persists_analysis() {
        let model = MockLanguageModel::new().with_structured(
            <InsightExtraction as StructuredOutput>::schema_name(),
            json!({
                "themes": ["performance"],
                "sentiments": [{"theme": "performance", "score": -0.6}],
                "pain_points": ["search is slow"],
                "feature_requests": ["faster search"],
                "user_personas": [],
                "key_metrics": []
            }),
        );
        let (deps, handles) = test_deps_with(model);
        let feedback = deps
            .feedback
            .create_feedback(NewFeedback::new("t", "survey").with_content("slow"))
            .await
            .unwrap();

        let state = FeedbackState::new(feedback.clone()).with_docs(vec![chunk("slow search")]);
        let state = Extractor::new(&deps).run(state).await.unwrap();

        assert_eq!(state.entities().unwrap().sentiments["performance"], -0.6);
        let stored = deps.feedback.get_feedback(feedback.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FeedbackStatus::Analyzed);
        assert_eq!(stored.analysis.as_ref(), state.entities());

        let calls = handles.model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].schema.as_deref(), Some("InsightExtraction"));
        assert!(calls[0].prompt.user.contains("slow search"));
        assert_eq!(calls[0].prompt.temperature, EXTRACT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_nonconforming_output_is_rejected() {
        let model = MockLanguageModel::new()
            .with_structured(<InsightExtraction as StructuredOutput>::schema_name(), json!({"themes": "oops"}));
        let (deps, _) = test_deps_with(model);
        let feedback = deps
            .feedback
            .create_feedback(NewFeedback::new("t", "survey"))
            .await
            .unwrap();

        let err = Extractor::new(&deps)
            .run(FeedbackState::new(feedback))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }
}
