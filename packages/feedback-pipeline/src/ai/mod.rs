//! Language model and embedder implementations.

pub mod openai;

pub use openai::{LlmTracing, OpenAIEmbedder, OpenAILanguageModel};
