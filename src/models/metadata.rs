//! Fragment metadata and filter values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known metadata field: the source document of a fragment.
pub const FIELD_DOCUMENT_ID: &str = "document_id";
/// Well-known metadata field: the section a fragment was cut from.
pub const FIELD_SECTION: &str = "section";
/// Well-known metadata field: the kind of content (markdown, code, ...).
pub const FIELD_CONTENT_TYPE: &str = "content_type";

/// A single scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataScalar {
    /// Boolean value.
    Bool(bool),
    /// Integer value (timestamps, counters).
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl MetadataScalar {
    /// Returns the text if this is a text scalar.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality used by metadata filters.
    ///
    /// Integers and floats compare numerically so that `3` matches `3.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                *a as f64 == *b
            },
            _ => self == other,
        }
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MetadataScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataScalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetadataScalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetadataScalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for MetadataScalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for MetadataScalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// A metadata field value: one scalar or a sequence of scalars.
///
/// Sequence-valued fields match a filter when any element is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A single value.
    One(MetadataScalar),
    /// Several values (tags, keywords).
    Many(Vec<MetadataScalar>),
}

impl MetadataValue {
    /// Returns true if any of `allowed` equals this value (or one of its elements).
    #[must_use]
    pub fn matches_any(&self, allowed: &[MetadataScalar]) -> bool {
        match self {
            Self::One(value) => allowed.iter().any(|a| a.matches(value)),
            Self::Many(values) => values
                .iter()
                .any(|value| allowed.iter().any(|a| a.matches(value))),
        }
    }
}

impl MetadataValue {
    /// Returns the text if this is a single text scalar.
    ///
    /// Denormalized columns hold this view; any other shape leaves them NULL.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::One(scalar) => scalar.as_text(),
            Self::Many(_) => None,
        }
    }
}

impl From<MetadataScalar> for MetadataValue {
    fn from(value: MetadataScalar) -> Self {
        Self::One(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::One(value.into())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::One(value.into())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::One(value.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::One(value.into())
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::One(value.into())
    }
}

impl<T: Into<MetadataScalar>> From<Vec<T>> for MetadataValue {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Structured attributes attached to a fragment.
///
/// Every field, well-known or not, holds a scalar or a sequence of scalars.
/// The relational backends copy the text view of the three well-known fields
/// into their own columns; everything else lives in `extra`. JSON `null`
/// values are dropped on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFragmentMetadata")]
pub struct FragmentMetadata {
    /// Groups fragments cut from the same source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<MetadataValue>,
    /// Section heading or path within the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<MetadataValue>,
    /// Content kind, e.g. `markdown` or `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<MetadataValue>,
    /// Free-form searchable fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

/// Wire form accepting `null` for any field.
#[derive(Deserialize)]
struct RawFragmentMetadata {
    #[serde(default)]
    document_id: Option<MetadataValue>,
    #[serde(default)]
    section: Option<MetadataValue>,
    #[serde(default)]
    content_type: Option<MetadataValue>,
    #[serde(flatten)]
    extra: BTreeMap<String, Option<MetadataValue>>,
}

impl From<RawFragmentMetadata> for FragmentMetadata {
    fn from(raw: RawFragmentMetadata) -> Self {
        Self {
            document_id: raw.document_id,
            section: raw.section,
            content_type: raw.content_type,
            extra: raw
                .extra
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
        }
    }
}

impl FragmentMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document id.
    #[must_use]
    pub fn with_document_id(mut self, document_id: impl Into<MetadataValue>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Sets the section.
    #[must_use]
    pub fn with_section(mut self, section: impl Into<MetadataValue>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<MetadataValue>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets a free-form field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Text view of the document id, stored in the `document_id` column.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_ref().and_then(MetadataValue::as_text)
    }

    /// Text view of the section.
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.section.as_ref().and_then(MetadataValue::as_text)
    }

    /// Text view of the content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_ref().and_then(MetadataValue::as_text)
    }

    /// Returns the value of a field, well-known or free-form.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&MetadataValue> {
        match field {
            FIELD_DOCUMENT_ID => self.document_id.as_ref(),
            FIELD_SECTION => self.section.as_ref(),
            FIELD_CONTENT_TYPE => self.content_type.as_ref(),
            _ => self.extra.get(field),
        }
    }

    /// Returns true if the named field holds one of the allowed values.
    ///
    /// A missing field never matches.
    #[must_use]
    pub fn field_matches(&self, field: &str, allowed: &[MetadataScalar]) -> bool {
        self.get(field).is_some_and(|value| value.matches_any(allowed))
    }

    /// Serializes to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// Returns true if `field` is one of the denormalized columns.
#[must_use]
pub fn is_denormalized_field(field: &str) -> bool {
    matches!(field, FIELD_DOCUMENT_ID | FIELD_SECTION | FIELD_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_numeric_matching() {
        assert!(MetadataScalar::Integer(3).matches(&MetadataScalar::Float(3.0)));
        assert!(!MetadataScalar::Integer(3).matches(&MetadataScalar::Text("3".into())));
        assert!(MetadataScalar::from("a").matches(&MetadataScalar::from("a")));
    }

    #[test]
    fn test_well_known_field_matching() {
        let meta = FragmentMetadata::new().with_content_type("markdown");
        assert!(meta.field_matches("content_type", &["markdown".into(), "code".into()]));
        assert!(!meta.field_matches("content_type", &["code".into()]));
        assert!(!meta.field_matches("section", &["intro".into()]));
    }

    #[test]
    fn test_sequence_field_any_of() {
        let meta = FragmentMetadata::new().with_field(
            "tags",
            vec![MetadataScalar::from("rust"), MetadataScalar::from("db")],
        );
        assert!(meta.field_matches("tags", &["db".into()]));
        assert!(!meta.field_matches("tags", &["python".into()]));
    }

    #[test]
    fn test_serde_flattens_extra_fields() {
        let meta = FragmentMetadata::new()
            .with_document_id("doc-1")
            .with_field("year", 2024_i64)
            .with_field("tags", vec![MetadataScalar::from("a")]);

        let json = meta.to_json();
        assert_eq!(json["document_id"], "doc-1");
        assert_eq!(json["year"], 2024);
        assert_eq!(json["tags"][0], "a");
        assert!(json.get("section").is_none());

        let parsed: FragmentMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_well_known_fields_accept_any_scalar() {
        let meta: FragmentMetadata = serde_json::from_value(serde_json::json!({
            "document_id": "doc-1",
            "section": 2,
            "content_type": ["markdown", "code"]
        }))
        .unwrap();

        assert_eq!(meta.document_id(), Some("doc-1"));
        assert_eq!(meta.section, Some(MetadataValue::from(2_i64)));
        assert_eq!(meta.section(), None);
        assert_eq!(meta.content_type(), None);
        assert!(meta.field_matches("section", &[2_i64.into()]));
        assert!(meta.field_matches("content_type", &["code".into()]));

        let json = meta.to_json();
        assert_eq!(json["section"], 2);
        assert_eq!(json["content_type"][1], "code");
    }

    #[test]
    fn test_null_fields_are_dropped() {
        let meta: FragmentMetadata = serde_json::from_value(serde_json::json!({
            "document_id": null,
            "author": null,
            "year": 2024
        }))
        .unwrap();

        assert_eq!(meta.document_id, None);
        assert!(!meta.extra.contains_key("author"));
        assert_eq!(meta.extra.get("year"), Some(&MetadataValue::from(2024_i64)));
    }

    #[test]
    fn test_denormalized_fields() {
        assert!(is_denormalized_field("document_id"));
        assert!(is_denormalized_field("content_type"));
        assert!(!is_denormalized_field("tags"));
    }
}
