//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without real model or
//! embedding calls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::deps::PipelineDeps;
use crate::error::{PipelineError, Result};
use crate::stores::{MemoryStore, MemoryVectorStore};
use crate::traits::{Embedder, LanguageModel, Prompt};

const DEFAULT_TEXT: &str = "Mock summary of the feedback.";

/// A mock language model with queued responses.
///
/// Text responses are served in order for `complete`; structured responses
/// are queued per schema name. The last queued response is reused once
/// the queue is down to one.
#[derive(Default)]
pub struct MockLanguageModel {
    texts: Arc<RwLock<VecDeque<String>>>,
    structured: Arc<RwLock<HashMap<String, VecDeque<Value>>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub prompt: Prompt,
    /// Schema name for structured calls, `None` for free text
    pub schema: Option<String>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a free-text response.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.texts.write().unwrap().push_back(text.into());
        self
    }

    /// Queue a structured response for `schema_name`.
    pub fn with_structured(self, schema_name: impl Into<String>, response: Value) -> Self {
        self.structured
            .write()
            .unwrap()
            .entry(schema_name.into())
            .or_default()
            .push_back(response);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, prompt: &Prompt, schema: Option<&str>) {
        self.calls.write().unwrap().push(MockModelCall {
            prompt: prompt.clone(),
            schema: schema.map(str::to_string),
        });
    }
}

fn next_from<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.record(prompt, None);
        Ok(next_from(&mut self.texts.write().unwrap()).unwrap_or_else(|| DEFAULT_TEXT.to_string()))
    }

    async fn complete_structured(
        &self,
        prompt: &Prompt,
        schema_name: &str,
        _schema: Value,
    ) -> Result<String> {
        self.record(prompt, Some(schema_name));
        let response = self
            .structured
            .write()
            .unwrap()
            .get_mut(schema_name)
            .and_then(next_from)
            .ok_or_else(|| {
                PipelineError::Model(format!("no mock response queued for {}", schema_name))
            })?;
        Ok(response.to_string())
    }
}

/// A language model whose every call fails.
pub struct FailingLanguageModel {
    message: String,
}

impl FailingLanguageModel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for FailingLanguageModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        Err(PipelineError::Model(self.message.clone()))
    }

    async fn complete_structured(
        &self,
        _prompt: &Prompt,
        _schema_name: &str,
        _schema: Value,
    ) -> Result<String> {
        Err(PipelineError::Model(self.message.clone()))
    }
}

/// A language model whose calls never complete.
///
/// Keeps a pipeline run parked inside its first model-backed stage.
#[derive(Default)]
pub struct StalledLanguageModel {
    calls: AtomicUsize,
}

impl StalledLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that have started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for StalledLanguageModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn complete_structured(
        &self,
        _prompt: &Prompt,
        _schema_name: &str,
        _schema: Value,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Deterministic embedder for tests.
///
/// Each lowercase word is hashed with SHA-256 into one of `dimensions`
/// buckets, so texts sharing words have a positive cosine similarity.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = Sha256::digest(word.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&hash[..8]);
            vector[(u64::from_le_bytes(bucket) % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Concrete handles behind the [`PipelineDeps`] built by [`test_deps_with`].
#[derive(Clone)]
pub struct TestHandles {
    pub store: Arc<MemoryStore>,
    pub vectors: Arc<MemoryVectorStore>,
    pub model: Arc<MockLanguageModel>,
}

/// In-memory dependencies with a mock model that has nothing queued.
pub fn test_deps() -> (PipelineDeps, TestHandles) {
    test_deps_with(MockLanguageModel::new())
}

/// In-memory dependencies around the given mock model.
pub fn test_deps_with(model: MockLanguageModel) -> (PipelineDeps, TestHandles) {
    let store = Arc::new(MemoryStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(Arc::new(MockEmbedder::new())));
    let model = Arc::new(model);

    let deps = PipelineDeps::new(
        store.clone(),
        store.clone(),
        store.clone(),
        vectors.clone(),
        model.clone(),
    );
    (
        deps,
        TestHandles {
            store,
            vectors,
            model,
        },
    )
}
