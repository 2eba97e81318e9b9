//! Vector store implementations.

mod file;
#[cfg(feature = "postgres")]
mod pgvector;
mod sqlite;

pub use file::FileVectorStore;
#[cfg(feature = "postgres")]
pub use pgvector::{PgvectorStore, build_filter_clause, format_embedding, parse_embedding};
pub use sqlite::SqliteVectorStore;
