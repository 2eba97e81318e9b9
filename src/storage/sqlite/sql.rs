//! SQL helper functions for the `SQLite` backend.

use crate::models::{MetadataScalar, SearchOptions, is_denormalized_field};

/// Builds a WHERE fragment narrowing candidates by denormalized columns.
///
/// Only `document_id`, `section` and `content_type` have their own columns;
/// filters on other fields are left for the in-process pass over the decoded
/// metadata. The clause only narrows candidates; every row still goes through
/// the full metadata check afterwards.
///
/// # Returns
///
/// A tuple containing:
/// - The clause (prefixed with `" AND "` per filter, empty if nothing applies)
/// - The parameter values in order
/// - The next available parameter index
///
/// # Examples
///
/// ```ignore
/// let options = SearchOptions::new().with_filter("content_type", ["markdown", "code"]);
/// let (clause, params, next) = build_filter_clause_numbered(&options, 1);
/// assert!(clause.starts_with(" AND (content_type IN (?1, ?2) OR"));
/// assert_eq!(next, 3);
/// ```
#[must_use]
pub fn build_filter_clause_numbered(
    options: &SearchOptions,
    start_param: usize,
) -> (String, Vec<String>, usize) {
    let mut clause = String::new();
    let mut params = Vec::new();
    let mut next = start_param;

    for (field, allowed) in options.active_filters() {
        if !is_denormalized_field(field) {
            continue;
        }
        // Columns hold single text values only; any other shape leaves the
        // column NULL and is decided by the metadata check.
        let other_shapes =
            format!("({field} IS NULL AND json_extract(metadata, '$.{field}') IS NOT NULL)");
        let texts: Vec<&str> = allowed.iter().filter_map(MetadataScalar::as_text).collect();
        if texts.is_empty() {
            clause.push_str(&format!(" AND {other_shapes}"));
            continue;
        }
        let placeholders: Vec<String> = texts
            .into_iter()
            .map(|value| {
                params.push(value.to_string());
                let placeholder = format!("?{next}");
                next += 1;
                placeholder
            })
            .collect();
        clause.push_str(&format!(
            " AND ({field} IN ({}) OR {other_shapes})",
            placeholders.join(", ")
        ));
    }

    (clause, params, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters() {
        let (clause, params, next) = build_filter_clause_numbered(&SearchOptions::new(), 1);
        assert!(clause.is_empty());
        assert!(params.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn test_denormalized_filters_numbered() {
        let options = SearchOptions::new()
            .with_filter("content_type", ["markdown", "code"])
            .with_filter("document_id", ["a"]);
        let (clause, params, next) = build_filter_clause_numbered(&options, 2);
        // Filters iterate in field-name order
        assert_eq!(
            clause,
            " AND (content_type IN (?2, ?3) OR (content_type IS NULL \
             AND json_extract(metadata, '$.content_type') IS NOT NULL)) \
             AND (document_id IN (?4) OR (document_id IS NULL \
             AND json_extract(metadata, '$.document_id') IS NOT NULL))"
        );
        assert_eq!(params, vec!["markdown", "code", "a"]);
        assert_eq!(next, 5);
    }

    #[test]
    fn test_other_fields_skipped() {
        let options = SearchOptions::new().with_filter("language", ["rust"]);
        let (clause, _, _) = build_filter_clause_numbered(&options, 1);
        assert!(clause.is_empty());
    }

    #[test]
    fn test_non_text_value_on_column_defers_to_metadata() {
        let options = SearchOptions::new().with_filter("section", [3_i64]);
        let (clause, params, next) = build_filter_clause_numbered(&options, 1);
        assert_eq!(
            clause,
            " AND (section IS NULL AND json_extract(metadata, '$.section') IS NOT NULL)"
        );
        assert!(params.is_empty());
        assert_eq!(next, 1);
    }
}
