//! Vector store: embedded documents grouped by namespace.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{DocumentType, NewDocument, SearchHit};

/// Embedding-backed document storage.
///
/// Implementations embed document content themselves; callers only hand
/// over text and metadata.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents under `namespace`, returning their ids in
    /// input order.
    async fn add_documents(&self, documents: Vec<NewDocument>, namespace: &str) -> Result<Vec<Uuid>>;

    /// Most similar documents to `query`, best first.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        doc_type: Option<DocumentType>,
    ) -> Result<Vec<SearchHit>>;

    async fn delete_documents(&self, ids: &[Uuid]) -> Result<()>;

    /// Remove every document in `namespace`; returns how many were removed.
    async fn delete_namespace(&self, namespace: &str) -> Result<u64>;
}

/// Cosine similarity of two vectors; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }
}
