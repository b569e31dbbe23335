//! Typed errors for the feedback pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can map
//! each failure class onto a transport status without string matching.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while storing or processing feedback.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller supplied invalid input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// Another run already owns this feedback item
    #[error("feedback {id} is already being processed")]
    AlreadyProcessing { id: Uuid },

    /// Language model unavailable or failed
    #[error("model error: {0}")]
    Model(String),

    /// Model output did not match the requested schema
    #[error("model output does not match schema {schema}: {source}")]
    SchemaMismatch {
        schema: String,
        #[source]
        source: serde_json::Error,
    },

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stage ran before the state field it reads was produced
    #[error("stage {stage} requires {field}, which is not present")]
    MissingState {
        stage: &'static str,
        field: &'static str,
    },

    /// JSON (de)serialization error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Async runtime could not be created or joined
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl PipelineError {
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err)
    }
}

impl From<openai_client::OpenAIError> for PipelineError {
    fn from(err: openai_client::OpenAIError) -> Self {
        Self::Model(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
