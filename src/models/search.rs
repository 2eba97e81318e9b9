//! Search options and results.

use super::{FragmentMetadata, MetadataScalar};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default number of ranked results.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum similarity score.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.0;

/// Metadata pre-filter: field name to allowed values.
///
/// Fields are ANDed, values within a field are ORed, and a field with an
/// empty allowed list places no constraint.
pub type MetadataFilter = BTreeMap<String, Vec<MetadataScalar>>;

/// Options for a similarity search.
///
/// # Example
///
/// ```rust
/// use vectorvault::SearchOptions;
///
/// let options = SearchOptions::new()
///     .with_top_k(10)
///     .with_score_threshold(0.7)
///     .with_filter("content_type", ["markdown"]);
/// assert_eq!(options.top_k, 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub top_k: usize,
    /// Results scoring below this are dropped.
    pub score_threshold: f32,
    /// Metadata pre-filter.
    pub filters: MetadataFilter,
    /// Whether results carry their embeddings.
    pub include_embeddings: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            filters: MetadataFilter::new(),
            include_embeddings: false,
        }
    }
}

impl SearchOptions {
    /// Creates options with defaults (`top_k = 5`, threshold `0.0`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result limit.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the score threshold.
    #[must_use]
    pub const fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Adds allowed values for a metadata field.
    #[must_use]
    pub fn with_filter<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<MetadataScalar>,
    {
        self.filters
            .entry(field.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Requests embeddings in the results.
    #[must_use]
    pub const fn with_embeddings(mut self, include: bool) -> Self {
        self.include_embeddings = include;
        self
    }

    /// Iterates the filter fields that actually constrain results.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &[MetadataScalar])> {
        self.filters
            .iter()
            .filter(|(_, allowed)| !allowed.is_empty())
            .map(|(field, allowed)| (field.as_str(), allowed.as_slice()))
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Entry id.
    pub id: String,
    /// Entry text.
    pub content: String,
    /// Entry metadata.
    pub metadata: FragmentMetadata,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Embedding, present only when requested.
    pub embedding: Option<Vec<f32>>,
}

/// Ranked results plus search bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Results in descending score order.
    pub results: Vec<SearchResult>,
    /// Matches after filtering and thresholding, before the `top_k` cut.
    pub total_found: usize,
    /// Wall time spent searching.
    pub query_time: Duration,
}

impl SearchResponse {
    /// Returns the result ids in rank order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SearchOptions::new();
        assert_eq!(options.top_k, 5);
        assert!(options.score_threshold.abs() < f32::EPSILON);
        assert!(options.filters.is_empty());
        assert!(!options.include_embeddings);
    }

    #[test]
    fn test_with_filter_accumulates() {
        let options = SearchOptions::new()
            .with_filter("tags", ["a"])
            .with_filter("tags", ["b"]);
        assert_eq!(options.filters["tags"].len(), 2);
    }

    #[test]
    fn test_active_filters_skip_empty() {
        let mut options = SearchOptions::new().with_filter("content_type", ["code"]);
        options.filters.insert("section".to_string(), Vec::new());
        let active: Vec<_> = options.active_filters().map(|(f, _)| f).collect();
        assert_eq!(active, vec!["content_type"]);
    }
}
