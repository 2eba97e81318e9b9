//! Property-based tests for the shared search and chunking logic.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Cosine similarity is bounded, symmetric and never NaN
//! - Ranking is ordered, truncated and counts matches before the cut
//! - Metadata filters with empty allowed lists never constrain
//! - Fixed-size chunking reassembles to the original content

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use vectorvault::models::{FragmentMetadata, SearchOptions, VectorEntry};
use vectorvault::storage::chunking::{assemble, build_chunks, split_fixed};
use vectorvault::storage::similarity::{cosine_similarity, passes_filters, rank};

fn vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-100.0f32..100.0, len)
}

fn entries(dimension: usize) -> impl Strategy<Value = Vec<VectorEntry>> {
    prop::collection::vec(
        (vector(dimension), prop::sample::select(vec!["markdown", "code", "text"])),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (embedding, content_type))| {
                VectorEntry::new(
                    format!("id-{i:03}"),
                    format!("content {i}"),
                    embedding,
                    FragmentMetadata::new().with_content_type(content_type),
                )
            })
            .collect()
    })
}

proptest! {
    /// Property: similarity stays within [-1, 1] and is finite.
    #[test]
    fn prop_cosine_bounded(a in vector(8), b in vector(8)) {
        let score = cosine_similarity(&a, &b);
        prop_assert!(score.is_finite());
        prop_assert!((-1.0001..=1.0001).contains(&score));
    }

    /// Property: similarity is symmetric.
    #[test]
    fn prop_cosine_symmetric(a in vector(5), b in vector(5)) {
        prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    /// Property: a zero vector scores 0 against anything.
    #[test]
    fn prop_cosine_zero_vector(a in vector(6)) {
        prop_assert_eq!(cosine_similarity(&a, &[0.0; 6]), 0.0);
        prop_assert_eq!(cosine_similarity(&[0.0; 6], &a), 0.0);
    }

    /// Property: results are sorted, truncated, and thresholded.
    #[test]
    fn prop_rank_ordered_and_truncated(
        query in vector(4),
        entries in entries(4),
        top_k in 0usize..10,
        threshold in -1.0f32..1.0,
    ) {
        let options = SearchOptions::new().with_top_k(top_k).with_score_threshold(threshold);
        let (results, total_found) = rank(&query, &entries, &options);

        prop_assert!(results.len() <= top_k);
        prop_assert!(results.len() <= total_found);
        prop_assert!(total_found <= entries.len());
        prop_assert!(results.iter().all(|r| r.score >= threshold));
        for pair in results.windows(2) {
            prop_assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].id < pair[1].id)
            );
        }
    }

    /// Property: a content-type filter only lets matching entries through.
    #[test]
    fn prop_rank_respects_filter(query in vector(3), entries in entries(3)) {
        let options = SearchOptions::new()
            .with_top_k(100)
            .with_score_threshold(-2.0)
            .with_filter("content_type", ["code"]);
        let (results, total_found) = rank(&query, &entries, &options);

        let expected = entries
            .iter()
            .filter(|e| e.metadata.content_type() == Some("code"))
            .count();
        prop_assert_eq!(total_found, expected);
        prop_assert!(results.iter().all(|r| r.metadata.content_type() == Some("code")));
    }

    /// Property: a filter with no allowed values never excludes anything.
    #[test]
    fn prop_empty_filter_is_ignored(field in "[a-z_]{1,12}", content_type in "[a-z]{1,8}") {
        let metadata = FragmentMetadata::new().with_content_type(content_type);
        let options = SearchOptions::new().with_filter(field, Vec::<String>::new());
        prop_assert!(passes_filters(&metadata, &options));
    }

    /// Property: chunks reassemble to the original document.
    #[test]
    fn prop_chunks_reassemble(content in "\\PC{1,400}", chunk_size in 1usize..64) {
        let chunks = build_chunks("doc", &content, &FragmentMetadata::new(), chunk_size).unwrap();
        let total = content.chars().count().div_ceil(chunk_size);
        prop_assert_eq!(chunks.len(), total);
        prop_assert!(chunks.iter().all(|c| c.total_chunks == total));

        let mut shuffled = chunks;
        shuffled.reverse();
        let rebuilt = assemble(shuffled).unwrap();
        prop_assert_eq!(rebuilt, content);
    }

    /// Property: every window but the last is exactly `chunk_size` characters.
    #[test]
    fn prop_split_fixed_window_sizes(content in "\\PC{1,300}", chunk_size in 1usize..50) {
        let windows = split_fixed(&content, chunk_size).unwrap();
        let (last, full) = windows.split_last().unwrap();
        prop_assert!(full.iter().all(|w| w.chars().count() == chunk_size));
        prop_assert!((1..=chunk_size).contains(&last.chars().count()));
    }
}
