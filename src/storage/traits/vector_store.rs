//! Vector store trait.
//!
//! Every backend implements the same contract so that callers, the factory and
//! the migration engine never depend on a concrete engine.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Chunking |
//! |---------|----------|----------|
//! | `FileVectorStore` | Small collections, whole-snapshot persistence | No |
//! | `SqliteVectorStore` | Single-file database, transactional batches | Yes |
//! | `PgvectorStore` | PostgreSQL + pgvector HNSW index, pooled | Yes |
//!
//! # Concurrency
//!
//! Methods take `&self` so stores can be shared as `Arc<dyn VectorStore>`, but
//! the contract performs no cross-call locking: two callers touching the same
//! id may interleave. Callers needing per-document atomicity (delete a
//! document, then insert its new fragments) must serialize those calls
//! themselves, for example behind a `tokio::sync::Mutex` around the store.
//! Only a single `insert_batch` call is atomic, and only on the relational
//! backends.

use crate::config::BackendKind;
use crate::models::{
    BatchEntry, DocumentChunk, ExportDocument, FragmentMetadata, SearchOptions, SearchResponse,
    StoreStats, VectorEntry, VerifyReport,
};
use crate::Result;
use async_trait::async_trait;

/// Trait for vector storage backends.
///
/// # Search
///
/// `search` behaves identically on every backend:
///
/// 1. entries failing any non-empty metadata filter are dropped,
/// 2. cosine similarity is computed (0 when either vector has zero magnitude),
/// 3. scores below `score_threshold` are dropped,
/// 4. the rest is ordered by score descending, ties by ascending id,
/// 5. the first `top_k` are returned with `total_found` counted before the cut.
///
/// # Batch Failures
///
/// `insert_batch` differs per backend and the difference is part of the
/// contract:
///
/// - file store: every entry is validated first, any invalid entry rejects the batch;
/// - `SQLite`: entries with an empty embedding are skipped before the
///   transaction starts; any failure inside the transaction rolls back all of it;
/// - PostgreSQL: nothing is skipped; any failure rolls back the whole batch.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Reports which concrete backend this is.
    fn backend(&self) -> BackendKind;

    /// Embedding model the store was configured with.
    fn embedding_model(&self) -> &str;

    /// Current dimension (0 while not yet fixed by a first insert).
    fn dimension(&self) -> usize;

    /// Returns true once `initialize` succeeded and until `close`.
    fn is_ready(&self) -> bool;

    /// Whether large documents can be stored as chunks.
    fn supports_chunking(&self) -> bool;

    /// Opens the backend and loads persisted data.
    ///
    /// Idempotent. Succeeds on a fresh location by creating an empty store.
    async fn initialize(&self) -> Result<()>;

    /// Flushes pending writes and releases resources.
    async fn close(&self) -> Result<()>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;

    /// Returns true if no entries are stored.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    /// Inserts or replaces one entry.
    async fn insert(
        &self,
        id: &str,
        content: &str,
        embedding: &[f32],
        metadata: FragmentMetadata,
    ) -> Result<()>;

    /// Inserts or replaces many entries as one unit.
    ///
    /// Returns the number of entries written.
    async fn insert_batch(&self, entries: Vec<BatchEntry>) -> Result<usize>;

    /// Inserts or replaces a full entry value.
    async fn upsert(&self, entry: VectorEntry) -> Result<()> {
        self.insert(&entry.id, &entry.content, &entry.embedding, entry.metadata)
            .await
    }

    /// Fetches an entry; a missing id is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<VectorEntry>>;

    /// Removes an entry, returning whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Removes every entry and stored chunk of a document.
    ///
    /// Returns the number of entries removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize>;

    /// All entry ids in ascending order.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Removes all entries and chunks.
    async fn clear(&self) -> Result<()>;

    /// Ranks entries by similarity to `query`.
    async fn search(&self, query: &[f32], options: &SearchOptions) -> Result<SearchResponse>;

    /// Splits `content` into fixed-size chunks and stores them.
    async fn insert_large_document(
        &self,
        document_id: &str,
        content: &str,
        metadata: FragmentMetadata,
        chunk_size: usize,
    ) -> Result<Vec<DocumentChunk>>;

    /// Reassembles a stored document; `Ok(None)` if it has no chunks.
    async fn retrieve_large_document(&self, document_id: &str) -> Result<Option<String>>;

    /// Stored chunks of a document, ordered by index.
    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>>;

    /// Point-in-time statistics.
    async fn get_stats(&self) -> Result<StoreStats>;

    /// Materializes every entry into the interchange document.
    async fn export(&self) -> Result<ExportDocument>;

    /// Upserts every entry of an interchange document.
    ///
    /// All entries are checked against the store dimension before anything
    /// is written. Returns the number of entries written.
    async fn import(&self, document: ExportDocument) -> Result<usize> {
        document.validate_dimensions(self.dimension())?;
        let entries = document.entries.into_iter().map(BatchEntry::from).collect();
        self.insert_batch(entries).await
    }

    /// Validates and imports a raw JSON interchange document.
    async fn import_json(&self, value: serde_json::Value) -> Result<usize> {
        let document = ExportDocument::from_json(value)?;
        self.import(document).await
    }

    /// Persists state; a no-op where writes are durable per operation.
    async fn save(&self) -> Result<()>;

    /// Reloads persisted state; a no-op where reads always hit storage.
    async fn load(&self) -> Result<()>;

    /// Backend-specific housekeeping.
    async fn optimize(&self) -> Result<()>;

    /// Integrity scan. Never fails; problems are reported in the result.
    async fn verify(&self) -> VerifyReport;
}
