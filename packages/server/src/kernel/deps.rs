//! Production wiring of the pipeline dependencies.
//!
//! Postgres backs feedback, stories and document embeddings; OpenAI serves
//! completions and embeddings; raw uploads live on the local filesystem.

use std::sync::Arc;

use feedback_pipeline::ai::{LlmTracing, OpenAIEmbedder, OpenAILanguageModel};
use feedback_pipeline::stores::{LocalFileStore, PgVectorStore, PostgresStore};
use feedback_pipeline::PipelineDeps;
use openai_client::OpenAIClient;
use sqlx::PgPool;

use crate::config::{Config, LlmTracingConfig};

/// Tracing settings for the model client, `None` when disabled.
pub fn llm_tracing(config: &LlmTracingConfig) -> Option<LlmTracing> {
    config
        .enabled
        .then(|| LlmTracing::new(&config.project).with_api_key(config.api_key.clone()))
}

/// Build the dependency container used by every request.
pub fn build_server_deps(pool: PgPool, config: &Config) -> PipelineDeps {
    let mut client = OpenAIClient::new(&config.openai_api_key);
    if let Some(base_url) = &config.openai_base_url {
        client = client.with_base_url(base_url);
    }

    let store = Arc::new(PostgresStore::new(pool.clone()));
    let embedder = Arc::new(OpenAIEmbedder::new(client.clone()));
    let model = OpenAILanguageModel::new(client).with_tracing(llm_tracing(&config.llm_tracing));

    PipelineDeps::new(
        store.clone(),
        store,
        Arc::new(LocalFileStore::new(&config.file_storage_dir)),
        Arc::new(PgVectorStore::new(pool, embedder)),
        Arc::new(model),
    )
}
