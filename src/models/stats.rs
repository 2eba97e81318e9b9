//! Store statistics, verification reports and the interchange document.

use super::VectorEntry;
use crate::config::BackendKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version tag written into interchange and snapshot documents.
pub const INTERCHANGE_VERSION: &str = "1.0";

/// Point-in-time summary of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of stored entries.
    pub total_chunks: usize,
    /// Configured embedding model name.
    pub embedding_model: String,
    /// Embedding dimension (0 while not yet fixed).
    pub dimension: usize,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last modification time, epoch milliseconds.
    pub updated_at: i64,
    /// Entry counts per `document_id`.
    pub documents: BTreeMap<String, usize>,
    /// Entry counts per `content_type`.
    pub content_types: BTreeMap<String, usize>,
    /// Backend that produced these stats.
    pub backend: BackendKind,
}

/// Outcome of an integrity scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// True when no errors were found.
    pub valid: bool,
    /// Integrity violations.
    pub errors: Vec<String>,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
    /// Number of entries inspected.
    pub checked: usize,
}

impl VerifyReport {
    /// Builds a report, deriving `valid` from the error list.
    #[must_use]
    pub fn new(checked: usize, errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            checked,
        }
    }

    /// A report for a scan that could not run at all.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(0, vec![reason.into()], Vec::new())
    }

    /// Converts a failed report into an `Integrity` error.
    pub fn into_result(self) -> Result<Self> {
        if self.valid {
            Ok(self)
        } else {
            Err(Error::Integrity(self.errors.join("; ")))
        }
    }
}

/// Scans entries for duplicate ids and dimension drift.
///
/// Returns the error list; `dimension == 0` takes the first entry's length as
/// the reference.
#[must_use]
pub fn scan_entries<'a>(
    entries: impl IntoIterator<Item = (&'a str, usize)>,
    dimension: usize,
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut errors = Vec::new();
    let mut reference = (dimension > 0).then_some(dimension);

    for (id, len) in entries {
        if !seen.insert(id) {
            errors.push(format!("duplicate id '{id}'"));
        }
        match reference {
            Some(expected) if expected != len => errors.push(format!(
                "entry '{id}' has dimension {len}, expected {expected}"
            )),
            Some(_) => {},
            None => reference = Some(len),
        }
    }

    errors
}

/// Canonical export/import document shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Format version.
    pub version: String,
    /// Embedding model of the exporting store.
    pub embedding_model: String,
    /// Embedding dimension of the exporting store.
    pub dimension: usize,
    /// Number of entries.
    pub total_chunks: usize,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last modification time, epoch milliseconds.
    pub updated_at: i64,
    /// All entries.
    pub entries: Vec<VectorEntry>,
}

impl ExportDocument {
    /// Creates a document around a set of entries.
    #[must_use]
    pub fn new(
        embedding_model: impl Into<String>,
        dimension: usize,
        created_at: i64,
        updated_at: i64,
        entries: Vec<VectorEntry>,
    ) -> Self {
        Self {
            version: INTERCHANGE_VERSION.to_string(),
            embedding_model: embedding_model.into(),
            dimension,
            total_chunks: entries.len(),
            created_at,
            updated_at,
            entries,
        }
    }

    /// Parses and validates a document from JSON.
    ///
    /// The `entries` field must be present and an array before anything else
    /// is interpreted.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value.get("entries") {
            Some(serde_json::Value::Array(_)) => {},
            Some(_) => {
                return Err(Error::InvalidInput(
                    "interchange document 'entries' must be an array".to_string(),
                ));
            },
            None => {
                return Err(Error::InvalidInput(
                    "interchange document is missing 'entries'".to_string(),
                ));
            },
        }

        serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("malformed interchange document: {e}")))
    }

    /// Parses and validates a document from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| Error::InvalidInput(format!("interchange document is not JSON: {e}")))?;
        Self::from_json(value)
    }

    /// Checks every entry against `dimension` (0 accepts any uniform length).
    pub fn validate_dimensions(&self, dimension: usize) -> Result<()> {
        let expected = if dimension > 0 {
            dimension
        } else {
            match self.entries.first() {
                Some(first) => first.embedding.len(),
                None => return Ok(()),
            }
        };

        match self.entries.iter().find(|e| e.embedding.len() != expected) {
            Some(bad) => Err(Error::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            }),
            None => Ok(()),
        }
    }
}
