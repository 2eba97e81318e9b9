//! Storage layer.
//!
//! Every backend implements [`VectorStore`]:
//! - **File**: whole collection in memory, persisted as one JSON snapshot
//! - **`SQLite`**: single-file database, brute-force search over rows
//! - **pgvector**: PostgreSQL with an HNSW cosine index
//!
//! The brute-force backends share [`similarity`] for ranking and every
//! chunking backend shares [`chunking`] for splitting large documents.

// Allow significant_drop_tightening - dropping guards or clients slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]
// Allow manual_let_else for clearer error handling in some contexts.
#![allow(clippy::manual_let_else)]

pub mod chunking;
mod lock;
mod metrics;
#[cfg(feature = "postgres")]
pub mod migrations;
pub mod similarity;
pub mod sqlite;
pub mod traits;
pub mod vector;

pub use lock::acquire_lock;
pub use metrics::{observe, record_operation_metrics};
pub use traits::VectorStore;
#[cfg(feature = "postgres")]
pub use vector::PgvectorStore;
pub use vector::{FileVectorStore, SqliteVectorStore};
