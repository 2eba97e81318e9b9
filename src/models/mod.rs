//! Record types shared by every store backend.
//!
//! These are plain values with no storage behavior: entries and their
//! metadata, search options/results, large-document chunks, statistics and
//! the canonical interchange document used by export/import and migration.

mod entry;
mod metadata;
mod search;
mod stats;

pub use entry::{BatchEntry, DocumentChunk, VectorEntry};
pub use metadata::{
    FIELD_CONTENT_TYPE, FIELD_DOCUMENT_ID, FIELD_SECTION, FragmentMetadata, MetadataScalar,
    MetadataValue, is_denormalized_field,
};
pub use search::{
    DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K, MetadataFilter, SearchOptions, SearchResponse,
    SearchResult,
};
pub use stats::{ExportDocument, INTERCHANGE_VERSION, StoreStats, VerifyReport, scan_entries};
