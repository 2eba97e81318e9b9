//! Stored entries and large-document chunks.

use super::FragmentMetadata;
use serde::{Deserialize, Serialize};

/// One stored fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Unique identifier within a store.
    pub id: String,
    /// Embedding vector; its length equals the store dimension.
    pub embedding: Vec<f32>,
    /// Fragment text.
    pub content: String,
    /// Fragment metadata.
    #[serde(default)]
    pub metadata: FragmentMetadata,
}

impl VectorEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
        metadata: FragmentMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            embedding,
            content: content.into(),
            metadata,
        }
    }
}

/// The unit of bulk insertion coming from an ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Unique identifier within a store.
    pub id: String,
    /// Fragment text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Fragment metadata.
    #[serde(default)]
    pub metadata: FragmentMetadata,
}

impl From<BatchEntry> for VectorEntry {
    fn from(entry: BatchEntry) -> Self {
        Self {
            id: entry.id,
            embedding: entry.embedding,
            content: entry.content,
            metadata: entry.metadata,
        }
    }
}

impl From<VectorEntry> for BatchEntry {
    fn from(entry: VectorEntry) -> Self {
        Self {
            id: entry.id,
            content: entry.content,
            embedding: entry.embedding,
            metadata: entry.metadata,
        }
    }
}

/// One fixed-size slice of a large document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    /// Chunk identifier, `{document_id}_chunk_{index}`.
    pub chunk_id: String,
    /// Zero-based position within the document.
    pub chunk_index: usize,
    /// Number of chunks the document was split into.
    pub total_chunks: usize,
    /// Raw chunk text.
    pub content: String,
    /// Metadata of the source document.
    #[serde(default)]
    pub metadata: FragmentMetadata,
}

impl DocumentChunk {
    /// Formats the id of chunk `index` of `document_id`.
    #[must_use]
    pub fn chunk_id_for(document_id: &str, index: usize) -> String {
        format!("{document_id}_chunk_{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_entry_conversion_preserves_fields() {
        let batch = BatchEntry {
            id: "a".to_string(),
            content: "text".to_string(),
            embedding: vec![1.0, 2.0],
            metadata: FragmentMetadata::new().with_section("intro"),
        };
        let entry = VectorEntry::from(batch.clone());
        assert_eq!(entry.id, "a");
        assert_eq!(entry.embedding, vec![1.0, 2.0]);
        assert_eq!(BatchEntry::from(entry), batch);
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(DocumentChunk::chunk_id_for("doc", 3), "doc_chunk_3");
    }

    #[test]
    fn test_entry_deserializes_without_metadata() {
        let entry: VectorEntry =
            serde_json::from_str(r#"{"id":"x","content":"c","embedding":[0.5]}"#).unwrap();
        assert_eq!(entry.metadata, FragmentMetadata::default());
    }
}
