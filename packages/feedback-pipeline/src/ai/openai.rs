//! OpenAI-backed [`LanguageModel`] and [`Embedder`].
//!
//! # Example
//!
//! ```rust,ignore
//! use feedback_pipeline::ai::{OpenAIEmbedder, OpenAILanguageModel};
//! use openai_client::OpenAIClient;
//!
//! let client = OpenAIClient::new(api_key);
//! let model = OpenAILanguageModel::new(client.clone()).with_model("gpt-4o");
//! let embedder = OpenAIEmbedder::new(client);
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, StructuredRequest};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::error::Result;
use crate::traits::{Embedder, LanguageModel, Prompt};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Per-call tracing of model requests, tagged with a project name.
///
/// The API key is carried for exporters but never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmTracing {
    pub project: String,
    pub api_key: Option<String>,
}

impl LlmTracing {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

impl std::fmt::Debug for LlmTracing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTracing")
            .field("project", &self.project)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Chat model served by the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAILanguageModel {
    client: OpenAIClient,
    model: String,
    tracing: Option<LlmTracing>,
}

impl OpenAILanguageModel {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_CHAT_MODEL.to_string(),
            tracing: None,
        }
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tracing(mut self, tracing: Option<LlmTracing>) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `call`, inside an `llm_call` span when tracing is on.
    async fn traced<F>(&self, kind: &'static str, prompt: &Prompt, call: F) -> Result<String>
    where
        F: std::future::Future<Output = Result<String>> + Send,
    {
        let Some(settings) = &self.tracing else {
            return call.await;
        };

        let span = info_span!(
            "llm_call",
            project = %settings.project,
            model = %self.model,
            kind
        );
        async move {
            let start = Instant::now();
            let result = call.await;
            info!(
                prompt_chars = prompt.system.len() + prompt.user.len(),
                response_chars = result.as_ref().map(String::len).unwrap_or(0),
                ok = result.is_ok(),
                duration_ms = start.elapsed().as_millis() as u64,
                "LLM call finished"
            );
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl LanguageModel for OpenAILanguageModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(&prompt.system))
            .message(Message::user(&prompt.user))
            .temperature(prompt.temperature);

        self.traced("completion", prompt, async {
            Ok(self.client.chat_completion(request).await?.content)
        })
        .await
    }

    async fn complete_structured(
        &self,
        prompt: &Prompt,
        schema_name: &str,
        schema: Value,
    ) -> Result<String> {
        let request = StructuredRequest::new(
            &self.model,
            &prompt.system,
            &prompt.user,
            schema_name,
            schema,
        )
        .temperature(prompt.temperature);

        self.traced("structured", prompt, async {
            Ok(self.client.structured_output(request).await?)
        })
        .await
    }
}

/// Embeddings served by the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    /// Set the embedding model and the vector length it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(self.client.create_embeddings(texts, &self.model).await?)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
