//! Shared similarity search algorithm.
//!
//! The brute-force backends rank candidates here; the pgvector backend lets
//! the database score and order rows and only runs [`finalize_results`] over
//! what comes back, so ordering and thresholding agree across engines.

use crate::models::{FragmentMetadata, SearchOptions, SearchResult, VectorEntry};
use crate::{Error, Result};
use std::cmp::Ordering;

/// Computes cosine similarity between two vectors.
///
/// Returns 0.0 when the lengths differ or either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

/// Returns true if `metadata` passes every non-empty filter in `options`.
#[must_use]
pub fn passes_filters(metadata: &FragmentMetadata, options: &SearchOptions) -> bool {
    options
        .active_filters()
        .all(|(field, allowed)| metadata.field_matches(field, allowed))
}

/// Rejects a query whose length differs from a fixed store dimension.
pub fn validate_query(query: &[f32], dimension: usize) -> Result<()> {
    if dimension > 0 && query.len() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Ranking order: score descending, then id ascending.
fn rank_order(score_a: f32, id_a: &str, score_b: f32, id_b: &str) -> Ordering {
    score_b.total_cmp(&score_a).then_with(|| id_a.cmp(id_b))
}

/// Brute-force ranking over in-memory candidates.
///
/// Returns the top results and the number of matches before truncation.
pub fn rank<'a>(
    query: &[f32],
    entries: impl IntoIterator<Item = &'a VectorEntry>,
    options: &SearchOptions,
) -> (Vec<SearchResult>, usize) {
    let mut scored: Vec<(f32, &VectorEntry)> = entries
        .into_iter()
        .filter(|entry| passes_filters(&entry.metadata, options))
        .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
        .filter(|(score, _)| *score >= options.score_threshold)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| rank_order(*sa, &a.id, *sb, &b.id));

    let total_found = scored.len();
    let results = scored
        .into_iter()
        .take(options.top_k)
        .map(|(score, entry)| SearchResult {
            id: entry.id.clone(),
            content: entry.content.clone(),
            metadata: entry.metadata.clone(),
            score,
            embedding: options.include_embeddings.then(|| entry.embedding.clone()),
        })
        .collect();

    (results, total_found)
}

/// Thresholds, orders and truncates results scored elsewhere.
pub fn finalize_results(
    mut results: Vec<SearchResult>,
    options: &SearchOptions,
) -> (Vec<SearchResult>, usize) {
    results.retain(|r| r.score >= options.score_threshold);
    results.sort_by(|a, b| rank_order(a.score, &a.id, b.score, &b.id));
    let total_found = results.len();
    results.truncate(options.top_k);
    if !options.include_embeddings {
        for result in &mut results {
            result.embedding = None;
        }
    }
    (results, total_found)
}
