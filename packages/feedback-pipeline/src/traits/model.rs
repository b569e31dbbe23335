//! Language model and embedding abstractions.

use async_trait::async_trait;
use openai_client::{strip_code_blocks, StructuredOutput};
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// A system/user prompt pair with its sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// Chat-style completion provider.
///
/// Implementations own model selection and transport; they return raw text
/// and leave parsing to the caller.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text completion.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Completion constrained to a JSON schema. Returns the JSON text.
    async fn complete_structured(
        &self,
        prompt: &Prompt,
        schema_name: &str,
        schema: Value,
    ) -> Result<String>;
}

/// Structured completion parsed into `T`.
///
/// Output that does not match `T` is rejected with
/// [`PipelineError::SchemaMismatch`]; there is no retry.
pub async fn complete_as<T: StructuredOutput>(model: &dyn LanguageModel, prompt: &Prompt) -> Result<T> {
    let schema_name = <T as StructuredOutput>::schema_name();
    let raw = model
        .complete_structured(prompt, &schema_name, T::openai_schema())
        .await?;

    serde_json::from_str(strip_code_blocks(&raw)).map_err(|source| PipelineError::SchemaMismatch {
        schema: schema_name,
        source,
    })
}

/// Text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; output order matches input order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])
            .await?
            .pop()
            .ok_or_else(|| PipelineError::Embedding("embedder returned no vector".into()))
    }

    /// Vector length produced by this embedder.
    fn dimensions(&self) -> usize;
}
