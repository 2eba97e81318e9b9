//! Fixed-size slicing of large documents.
//!
//! Windows are counted in characters, never split a UTF-8 code point, do not
//! overlap and ignore any semantic boundary.

use crate::models::{DocumentChunk, FragmentMetadata};
use crate::{Error, Result};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Splits `content` into consecutive windows of `chunk_size` characters.
pub fn split_fixed(content: &str, chunk_size: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::InvalidInput(
            "chunk_size must be greater than zero".to_string(),
        ));
    }

    let chars: Vec<char> = content.chars().collect();
    Ok(chars
        .chunks(chunk_size)
        .map(|window| window.iter().collect())
        .collect())
}

/// Builds the ordered chunk list for a document.
pub fn build_chunks(
    document_id: &str,
    content: &str,
    metadata: &FragmentMetadata,
    chunk_size: usize,
) -> Result<Vec<DocumentChunk>> {
    if document_id.is_empty() {
        return Err(Error::InvalidInput("document_id must not be empty".to_string()));
    }
    if content.is_empty() {
        return Err(Error::InvalidInput(format!(
            "document '{document_id}' has no content"
        )));
    }

    let pieces = split_fixed(content, chunk_size)?;
    let total_chunks = pieces.len();
    let mut metadata = metadata.clone();
    metadata.document_id = Some(document_id.into());

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| DocumentChunk {
            chunk_id: DocumentChunk::chunk_id_for(document_id, chunk_index),
            chunk_index,
            total_chunks,
            content,
            metadata: metadata.clone(),
        })
        .collect())
}

/// Concatenates chunks in ascending index order.
#[must_use]
pub fn assemble(mut chunks: Vec<DocumentChunk>) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    chunks.sort_by_key(|c| c.chunk_index);
    Some(chunks.into_iter().map(|c| c.content).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fixed_exact_windows() {
        let pieces = split_fixed("abcdefgh", 3).unwrap();
        assert_eq!(pieces, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_split_fixed_respects_code_points() {
        let pieces = split_fixed("héllo wörld", 4).unwrap();
        assert_eq!(pieces.concat(), "héllo wörld");
        assert!(pieces.iter().all(|p| p.chars().count() <= 4));
    }

    #[test]
    fn test_split_fixed_zero_size() {
        assert!(split_fixed("abc", 0).is_err());
    }

    #[test]
    fn test_build_chunks_sets_document_and_indices() {
        let chunks = build_chunks("doc", "abcdefg", &FragmentMetadata::new(), 3).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.total_chunks == 3));
        assert_eq!(chunks[2].chunk_id, "doc_chunk_2");
        assert_eq!(chunks[2].metadata.document_id(), Some("doc"));
    }

    #[test]
    fn test_build_chunks_rejects_empty() {
        assert!(build_chunks("doc", "", &FragmentMetadata::new(), 3).is_err());
        assert!(build_chunks("", "abc", &FragmentMetadata::new(), 3).is_err());
    }

    #[test]
    fn test_assemble_orders_by_index() {
        let mut chunks = build_chunks("doc", "0123456789", &FragmentMetadata::new(), 4).unwrap();
        chunks.reverse();
        assert_eq!(assemble(chunks).as_deref(), Some("0123456789"));
        assert!(assemble(Vec::new()).is_none());
    }
}
