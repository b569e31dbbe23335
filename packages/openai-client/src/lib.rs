//! Minimal OpenAI REST API client
//!
//! Covers the three calls the feedback pipeline needs: free-text chat
//! completions, schema-constrained completions and embeddings. No domain
//! logic lives here.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{ChatRequest, Message, OpenAIClient};
//!
//! let client = OpenAIClient::new(api_key);
//!
//! let response = client
//!     .chat_completion(ChatRequest::new("gpt-4o").message(Message::user("Hello!")))
//!     .await?;
//!
//! let vectors = client
//!     .create_embeddings(&["first chunk", "second chunk"], "text-embedding-3-small")
//!     .await?;
//! ```
//!
//! # Structured Output
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct Themes {
//!     themes: Vec<String>,
//! }
//!
//! let request = StructuredRequest::new(
//!     "gpt-4o",
//!     system_prompt,
//!     user_prompt,
//!     <Themes as StructuredOutput>::schema_name(),
//!     Themes::openai_schema(),
//! );
//! let json = client.structured_output(request).await?;
//! let themes: Themes = serde_json::from_str(strip_code_blocks(&json))?;
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, path, "OpenAI API error");
            return Err(OpenAIError::Api(format!("{}: {}", status, error_text)));
        }
        Ok(response)
    }

    /// Chat completion returning the first choice's text.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let raw: types::ChatResponseRaw = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = first_content(raw.choices)?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }

    /// Schema-constrained completion; returns the raw JSON text.
    pub async fn structured_output(&self, request: StructuredRequest) -> Result<String> {
        let start = std::time::Instant::now();

        let raw: types::ChatResponseRaw = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = first_content(raw.choices)?;

        debug!(
            model = %request.model,
            schema = %request.response_format.json_schema.name,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI structured output"
        );

        Ok(content)
    }

    /// Embed a batch of texts in one request; output order matches input order.
    pub async fn create_embeddings(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = types::EmbeddingRequest {
            model,
            input: texts,
        };

        let mut response: types::EmbeddingResponse = self
            .post("embeddings", &request)
            .await?
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        if response.data.len() != texts.len() {
            return Err(OpenAIError::Api(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

fn first_content(choices: Vec<types::ChatChoice>) -> Result<String> {
    let message = choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| OpenAIError::Api("No response from OpenAI".into()))?;

    match (message.content, message.refusal) {
        (Some(content), _) => Ok(content),
        (None, Some(refusal)) => Err(OpenAIError::Api(format!("model refused: {}", refusal))),
        (None, None) => Err(OpenAIError::Api("empty message from OpenAI".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test").with_base_url("https://proxy.internal/v1/");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url(), "https://proxy.internal/v1");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = OpenAIClient::new("sk-secret");
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_skips_request() {
        // Unroutable base URL: any request would fail.
        let client = OpenAIClient::new("sk-test").with_base_url("http://127.0.0.1:9");
        let vectors = client
            .create_embeddings(&[], "text-embedding-3-small")
            .await
            .unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_first_content_refusal() {
        let choices = vec![types::ChatChoice {
            message: types::ChatMessageResponse {
                content: None,
                refusal: Some("cannot comply".into()),
            },
        }];
        let err = first_content(choices).unwrap_err();
        assert!(err.to_string().contains("cannot comply"));
    }
}
