//! # Vectorvault
//!
//! Pluggable vector storage for semantic retrieval of content fragments.
//!
//! Fragments (text + metadata) are stored alongside their embeddings and later
//! retrieved by cosine similarity to a query embedding, optionally narrowed by
//! metadata filters. The same [`VectorStore`] contract is served by three
//! backends sized for very different scales:
//!
//! | Backend | Scale | Search |
//! |---------|-------|--------|
//! | [`FileVectorStore`] | thousands | brute force over an in-memory snapshot |
//! | [`SqliteVectorStore`] | hundreds of thousands | brute force over rows from a single-file database |
//! | `PgvectorStore` | millions | pgvector HNSW index |
//!
//! [`StoreFactory`] builds a backend from a [`StoreConfig`], and
//! [`MigrationService`] copies every entry from one backend to another.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vectorvault::{SearchOptions, StoreConfig, StoreFactory};
//!
//! let store = StoreFactory::create_initialized(&StoreConfig::default()).await?;
//! store.insert("frag-1", "Use PostgreSQL for storage", &embedding, metadata).await?;
//! let response = store.search(&query, &SearchOptions::new().with_top_k(3)).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{BackendKind, Preset, StoreConfig};
pub use models::{
    BatchEntry, DocumentChunk, ExportDocument, FragmentMetadata, MetadataFilter, MetadataScalar,
    MetadataValue, SearchOptions, SearchResponse, SearchResult, StoreStats, VectorEntry,
    VerifyReport,
};
pub use services::{MigrationOptions, MigrationResult, MigrationService, StoreFactory};
pub use storage::{FileVectorStore, SqliteVectorStore, VectorStore};

#[cfg(feature = "postgres")]
pub use storage::PgvectorStore;

/// Error type for vectorvault operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotReady` | A store is used before `initialize()` or after `close()` |
/// | `DimensionMismatch` | An embedding length differs from the store dimension |
/// | `InvalidInput` | Malformed interchange documents, bad configuration, empty migration source |
/// | `Unsupported` | A capability the backend lacks (large-document chunking on the file store) |
/// | `OperationFailed` | File, `SQLite` or PostgreSQL I/O fails |
/// | `Integrity` | A caller escalates a failed [`VerifyReport`] |
/// | `FeatureNotEnabled` | The configured backend was compiled out |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The store has not been initialized, or has been closed.
    #[error("store not ready: {0}")]
    NotReady(String),

    /// An embedding does not match the store dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The store dimension.
        expected: usize,
        /// The dimension of the rejected embedding.
        actual: usize,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - An interchange document has no `entries` array
    /// - A configuration value is out of range
    /// - A migration source store is empty
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend does not support the requested operation.
    #[error("operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Snapshot files cannot be read or written
    /// - `SQLite` statements or transactions fail
    /// - PostgreSQL pool checkout, queries or transactions fail
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Stored data violates a store invariant.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Returns true for the validation family of errors.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::InvalidInput(_) | Self::Unsupported { .. }
        )
    }

    /// Returns true if the store was not ready.
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Builds an `OperationFailed` error from any displayable cause.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for vectorvault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// ```rust
/// let ts = vectorvault::current_timestamp_millis();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 3, got 2"
        );

        let err = Error::Unsupported {
            backend: "in-memory-file",
            operation: "insert_large_document",
        };
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidInput(String::new()).is_validation());
        assert!(
            Error::DimensionMismatch {
                expected: 1,
                actual: 2
            }
            .is_validation()
        );
        assert!(!Error::NotReady(String::new()).is_validation());
        assert!(Error::NotReady(String::new()).is_not_ready());
        assert!(!Error::operation("x", "y").is_not_ready());
    }

    #[test]
    fn test_current_timestamp_millis_is_recent() {
        // 2020-01-01 in epoch millis
        assert!(current_timestamp_millis() > 1_577_836_800_000);
    }
}
