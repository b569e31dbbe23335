//! Vector-store documents: feedback chunks and story embeddings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Discriminates what a stored document was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Feedback,
    Story,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Story => "story",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feedback" => Ok(Self::Feedback),
            "story" => Ok(Self::Story),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

/// Tags carried by every feedback chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub feedback_id: Uuid,
    pub source: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

/// A slice of ingested feedback content, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn to_document(&self) -> NewDocument {
        NewDocument {
            content: self.content.clone(),
            doc_type: self.metadata.doc_type,
            metadata: serde_json::to_value(&self.metadata).unwrap_or(Value::Null),
        }
    }
}

/// Input to the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub content: String,
    pub doc_type: DocumentType,
    pub metadata: Value,
}

/// A similarity search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub namespace: String,
    pub content: String,
    pub metadata: Value,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub similarity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_metadata_uses_type_key() {
        let chunk = DocumentChunk {
            content: "slow search".into(),
            metadata: ChunkMetadata {
                feedback_id: Uuid::nil(),
                source: "survey".into(),
                title: "Q3".into(),
                doc_type: DocumentType::Feedback,
            },
        };
        let doc = chunk.to_document();
        assert_eq!(doc.metadata["type"], "feedback");
        assert_eq!(doc.metadata["feedback_id"], Uuid::nil().to_string());
        assert_eq!(doc.doc_type, DocumentType::Feedback);
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!("story".parse::<DocumentType>().unwrap(), DocumentType::Story);
        assert!("page".parse::<DocumentType>().is_err());
    }
}
