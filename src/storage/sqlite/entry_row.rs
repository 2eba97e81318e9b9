//! Row conversion between the `embeddings` table and [`VectorEntry`].
//!
//! Embeddings and metadata are stored as JSON text. The well-known metadata
//! fields are additionally copied into their own indexed columns.

use crate::models::{DocumentChunk, FragmentMetadata, VectorEntry};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Columns selected by every entry query, in [`EntryRow::from_row`] order.
pub const ENTRY_COLUMNS: &str = "id, content, embedding, metadata";

/// Raw `embeddings` row.
#[derive(Debug)]
pub struct EntryRow {
    /// Entry id.
    pub id: String,
    /// Fragment text.
    pub content: String,
    /// JSON array text.
    pub embedding: String,
    /// JSON object text.
    pub metadata: String,
}

impl EntryRow {
    /// Reads a row selected with [`ENTRY_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            embedding: row.get(2)?,
            metadata: row.get(3)?,
        })
    }

    /// Decodes into an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the stored JSON is malformed.
    pub fn into_entry(self) -> Result<VectorEntry> {
        let embedding = decode_embedding(&self.embedding)?;
        let metadata = decode_metadata(&self.metadata)?;
        Ok(VectorEntry {
            id: self.id,
            embedding,
            content: self.content,
            metadata,
        })
    }
}

/// Encodes an embedding as a JSON array.
pub fn encode_embedding(embedding: &[f32]) -> Result<String> {
    serde_json::to_string(embedding).map_err(|e| Error::operation("encode_embedding", e))
}

/// Decodes a JSON array embedding.
pub fn decode_embedding(raw: &str) -> Result<Vec<f32>> {
    serde_json::from_str(raw).map_err(|e| Error::operation("decode_embedding", e))
}

/// Encodes metadata as a JSON object.
pub fn encode_metadata(metadata: &FragmentMetadata) -> Result<String> {
    serde_json::to_string(metadata).map_err(|e| Error::operation("encode_metadata", e))
}

/// Decodes JSON metadata; an empty string is empty metadata.
pub fn decode_metadata(raw: &str) -> Result<FragmentMetadata> {
    if raw.trim().is_empty() {
        return Ok(FragmentMetadata::default());
    }
    serde_json::from_str(raw).map_err(|e| Error::operation("decode_metadata", e))
}

/// Inserts or replaces an entry row, preserving `created_at` on replace.
pub fn upsert_entry(
    conn: &Connection,
    id: &str,
    content: &str,
    embedding: &[f32],
    metadata: &FragmentMetadata,
    now: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO embeddings
            (id, content, embedding, metadata, document_id, section, content_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(id) DO UPDATE SET
            content = excluded.content,
            embedding = excluded.embedding,
            metadata = excluded.metadata,
            document_id = excluded.document_id,
            section = excluded.section,
            content_type = excluded.content_type,
            updated_at = excluded.updated_at",
        params![
            id,
            content,
            encode_embedding(embedding)?,
            encode_metadata(metadata)?,
            metadata.document_id(),
            metadata.section(),
            metadata.content_type(),
            now,
        ],
    )
    .map_err(|e| Error::operation("upsert_embedding", e))?;
    Ok(())
}

/// Fetches one entry by id.
pub fn fetch_entry(conn: &Connection, id: &str) -> Result<Option<VectorEntry>> {
    let row = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM embeddings WHERE id = ?1"),
            params![id],
            EntryRow::from_row,
        )
        .optional()
        .map_err(|e| Error::operation("get_embedding", e))?;
    row.map(EntryRow::into_entry).transpose()
}

/// Reads the chunk rows of a document ordered by index.
pub fn fetch_chunks(conn: &Connection, document_id: &str) -> Result<Vec<DocumentChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT chunk_index, chunk_content, total_chunks, metadata
             FROM document_chunks
             WHERE document_id = ?1
             ORDER BY chunk_index",
        )
        .map_err(|e| Error::operation("prepare_get_chunks", e))?;

    let rows = stmt
        .query_map(params![document_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| Error::operation("get_chunks", e))?;

    let mut chunks = Vec::new();
    for row in rows {
        let (index, content, total, metadata) = row.map_err(|e| Error::operation("read_chunk", e))?;
        let chunk_index = usize::try_from(index).map_err(|e| Error::operation("read_chunk", e))?;
        chunks.push(DocumentChunk {
            chunk_id: DocumentChunk::chunk_id_for(document_id, chunk_index),
            chunk_index,
            total_chunks: usize::try_from(total).map_err(|e| Error::operation("read_chunk", e))?,
            content,
            metadata: decode_metadata(&metadata)?,
        });
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_codec() {
        let encoded = encode_embedding(&[0.5, -1.0]).unwrap();
        assert_eq!(encoded, "[0.5,-1.0]");
        assert_eq!(decode_embedding(&encoded).unwrap(), vec![0.5, -1.0]);
        assert!(decode_embedding("not json").is_err());
    }

    #[test]
    fn test_metadata_codec_keeps_extra_fields() {
        let metadata = FragmentMetadata::new()
            .with_content_type("code")
            .with_field("language", "rust");
        let decoded = decode_metadata(&encode_metadata(&metadata).unwrap()).unwrap();
        assert_eq!(decoded, metadata);
        assert_eq!(decode_metadata("").unwrap(), FragmentMetadata::default());
    }
}
