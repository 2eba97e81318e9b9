//! `SQLite`-backed vector store.
//!
//! Entries live in a single database file. Similarity is computed in process
//! over rows narrowed by the denormalized metadata columns, so search cost is
//! linear in the number of candidate rows.

use crate::config::{BackendKind, SqliteStoreConfig};
use crate::models::{
    BatchEntry, DocumentChunk, ExportDocument, FragmentMetadata, SearchOptions, SearchResponse,
    StoreStats, VectorEntry, VerifyReport, scan_entries,
};
use crate::storage::chunking::{assemble, build_chunks};
use crate::storage::lock::acquire_lock;
use crate::storage::metrics::observe;
use crate::storage::similarity::{passes_filters, rank, validate_query};
use crate::storage::sqlite::{
    ENTRY_COLUMNS, EntryRow, build_filter_clause_numbered, decode_embedding, encode_metadata,
    fetch_chunks, fetch_entry, open_configured, upsert_entry,
};
use crate::storage::traits::VectorStore;
use crate::{Error, Result, current_timestamp_millis};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS embeddings (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        embedding TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        document_id TEXT,
        section TEXT,
        content_type TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_embeddings_document_id ON embeddings(document_id);
    CREATE INDEX IF NOT EXISTS idx_embeddings_section ON embeddings(section);
    CREATE INDEX IF NOT EXISTS idx_embeddings_content_type ON embeddings(content_type);

    CREATE TABLE IF NOT EXISTS document_chunks (
        document_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        chunk_content TEXT NOT NULL,
        total_chunks INTEGER NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        PRIMARY KEY (document_id, chunk_index)
    );

    CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// `SQLite`-based vector store.
///
/// # Concurrency Model
///
/// One `rusqlite::Connection` behind a mutex, used from
/// `tokio::task::spawn_blocking` so statements never block the async runtime.
/// WAL mode lets other processes read the file while this store writes.
///
/// # Schema
///
/// - `embeddings`: one row per entry; embedding and metadata as JSON text,
///   `document_id`, `section` and `content_type` copied into indexed columns
/// - `document_chunks`: large-document chunks keyed by `(document_id, chunk_index)`
/// - `store_meta`: embedding model, dimension and timestamps
///
/// # Persistence
///
/// Every write is committed immediately. `save` only checkpoints the WAL
/// into the main database file.
pub struct SqliteVectorStore {
    config: SqliteStoreConfig,
    embedding_model: String,
    dimension: Arc<AtomicUsize>,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteVectorStore {
    /// Creates a store for the database described by `config`.
    #[must_use]
    pub fn new(
        config: SqliteStoreConfig,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            config,
            embedding_model: embedding_model.into(),
            dimension: Arc::new(AtomicUsize::new(dimension)),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a store backed by an in-memory database.
    #[must_use]
    pub fn in_memory(embedding_model: impl Into<String>, dimension: usize) -> Self {
        Self::new(SqliteStoreConfig::in_memory(), embedding_model, dimension)
    }

    /// Returns the database path (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.config.path
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = acquire_lock(&conn);
            let conn = guard.as_mut().ok_or_else(|| {
                Error::NotReady(format!("sqlite store must be initialized before {operation}"))
            })?;
            f(conn)
        })
        .await
        .map_err(|e| Error::operation(operation, e))?
    }

    /// Opens the configured database, falling back to memory if it is unusable.
    fn open(config: &SqliteStoreConfig) -> Result<Connection> {
        match open_configured(config) {
            Ok(conn) => Ok(conn),
            Err(e) if !config.is_in_memory() => {
                tracing::warn!(
                    path = %config.path.display(),
                    error = %e,
                    "Failed to open SQLite vector database, falling back to in-memory"
                );
                metrics::counter!("sqlite_open_fallback_total").increment(1);
                open_configured(&SqliteStoreConfig::in_memory())
            },
            Err(e) => Err(e),
        }
    }
}

fn meta_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM store_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| Error::operation("read_store_meta", e))
}

fn meta_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(|e| Error::operation("write_store_meta", e))?;
    Ok(())
}

fn meta_i64(conn: &Connection, key: &str) -> Result<Option<i64>> {
    Ok(meta_get(conn, key)?.and_then(|v| v.parse().ok()))
}

fn touch(conn: &Connection, now: i64) -> Result<()> {
    meta_set(conn, "updated_at", &now.to_string())
}

/// Checks `len` against the store dimension, fixing it when still unset.
///
/// Returns true if this call fixed the dimension.
fn accept_dimension(dimension: &AtomicUsize, len: usize) -> Result<bool> {
    if len == 0 {
        return Err(Error::InvalidInput("embedding must not be empty".to_string()));
    }
    match dimension.compare_exchange(0, len, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => Ok(true),
        Err(expected) if expected == len => Ok(false),
        Err(expected) => Err(Error::DimensionMismatch {
            expected,
            actual: len,
        }),
    }
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .map_err(|e| Error::operation("count_rows", e))?;
    usize::try_from(count).map_err(|e| Error::operation("count_rows", e))
}

/// Runs `f` inside `BEGIN IMMEDIATE` / `COMMIT`, rolling back on error.
fn in_transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| Error::operation("begin_transaction", e))?;

    let result = f(conn);

    if result.is_ok() {
        if let Err(e) = conn.execute("COMMIT", []) {
            rollback(conn);
            return Err(Error::operation("commit_transaction", e));
        }
    } else {
        rollback(conn);
    }

    result
}

/// Rolls back the open transaction; a failure leaves the connection
/// mid-transaction, so it is logged.
fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute("ROLLBACK", []) {
        tracing::warn!(
            error = %e,
            autocommit = conn.is_autocommit(),
            "Failed to roll back SQLite transaction"
        );
    }
}

fn group_counts(conn: &Connection, column: &str) -> Result<BTreeMap<String, usize>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {column}, COUNT(*) FROM embeddings WHERE {column} IS NOT NULL GROUP BY {column}"
        ))
        .map_err(|e| Error::operation("prepare_group_counts", e))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| Error::operation("group_counts", e))?;

    let mut counts = BTreeMap::new();
    for row in rows {
        let (key, count) = row.map_err(|e| Error::operation("group_counts", e))?;
        counts.insert(key, usize::try_from(count).unwrap_or(0));
    }
    Ok(counts)
}

fn load_entries(conn: &Connection, clause: &str, params: &[String]) -> Result<Vec<VectorEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM embeddings WHERE 1 = 1{clause} ORDER BY rowid"
        ))
        .map_err(|e| Error::operation("prepare_load_entries", e))?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), EntryRow::from_row)
        .map_err(|e| Error::operation("load_entries", e))?;

    let mut entries = Vec::new();
    for row in rows {
        let row = row.map_err(|e| Error::operation("load_entries", e))?;
        entries.push(row.into_entry()?);
    }
    Ok(entries)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> BackendKind {
        BackendKind::EmbeddedRelational
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        acquire_lock(&self.conn).is_some()
    }

    fn supports_chunking(&self) -> bool {
        true
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %self.config.path.display()))]
    async fn initialize(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let config = self.config.clone();
        let model = self.embedding_model.clone();
        let dimension = Arc::clone(&self.dimension);
        let slot = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Self::open(&config)?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| Error::operation("create_schema", e))?;

            let now = current_timestamp_millis();
            if meta_get(&conn, "created_at")?.is_none() {
                meta_set(&conn, "created_at", &now.to_string())?;
                meta_set(&conn, "updated_at", &now.to_string())?;
            }

            match meta_get(&conn, "embedding_model")? {
                Some(stored) if stored != model => tracing::warn!(
                    stored = %stored,
                    configured = %model,
                    "SQLite vector database was written with a different embedding model"
                ),
                Some(_) => {},
                None => meta_set(&conn, "embedding_model", &model)?,
            }

            let stored = meta_i64(&conn, "dimension")?
                .and_then(|d| usize::try_from(d).ok())
                .unwrap_or(0);
            let configured = dimension.load(Ordering::Acquire);
            match (configured, stored) {
                (0, 0) => {},
                (0, stored) => dimension.store(stored, Ordering::Release),
                (configured, 0) => meta_set(&conn, "dimension", &configured.to_string())?,
                (configured, stored) if configured != stored => {
                    return Err(Error::DimensionMismatch {
                        expected: configured,
                        actual: stored,
                    });
                },
                _ => {},
            }

            let entries = count_rows(&conn, "embeddings")?;
            *acquire_lock(&slot) = Some(conn);
            tracing::info!(entries, "SQLite vector store ready");
            Ok(())
        })
        .await
        .map_err(|e| Error::operation("initialize", e))?
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn close(&self) -> Result<()> {
        let slot = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let Some(conn) = acquire_lock(&slot).take() else {
                return Ok(());
            };
            conn.close()
                .map_err(|(_, e)| Error::operation("close_sqlite", e))?;
            tracing::info!("SQLite vector store closed");
            Ok(())
        })
        .await
        .map_err(|e| Error::operation("close", e))?
    }

    async fn count(&self) -> Result<usize> {
        self.run("count", |conn| count_rows(conn, "embeddings"))
            .await
    }

    #[instrument(skip(self, content, embedding, metadata), fields(backend = BACKEND, entry.id = %id))]
    async fn insert(
        &self,
        id: &str,
        content: &str,
        embedding: &[f32],
        metadata: FragmentMetadata,
    ) -> Result<()> {
        let start = Instant::now();
        let id = id.to_string();
        let content = content.to_string();
        let embedding = embedding.to_vec();
        let dimension = Arc::clone(&self.dimension);

        let result = self
            .run("insert", move |conn| {
                let fixed = accept_dimension(&dimension, embedding.len())?;
                let now = current_timestamp_millis();
                let written = in_transaction(conn, |tx| {
                    if fixed {
                        meta_set(tx, "dimension", &embedding.len().to_string())?;
                    }
                    upsert_entry(tx, &id, &content, &embedding, &metadata, now)?;
                    touch(tx, now)
                });
                if written.is_err() && fixed {
                    dimension.store(0, Ordering::Release);
                }
                written
            })
            .await;
        observe(BACKEND, "insert", start, result)
    }

    #[instrument(skip(self, entries), fields(backend = BACKEND, count = entries.len()))]
    async fn insert_batch(&self, entries: Vec<BatchEntry>) -> Result<usize> {
        let start = Instant::now();
        let dimension = Arc::clone(&self.dimension);

        let result = self
            .run("insert_batch", move |conn| {
                let (entries, skipped): (Vec<_>, Vec<_>) =
                    entries.into_iter().partition(|e| !e.embedding.is_empty());
                for entry in &skipped {
                    tracing::warn!(entry.id = %entry.id, "Skipping batch entry without embedding");
                }
                if entries.is_empty() {
                    return Ok(0);
                }

                let now = current_timestamp_millis();
                let mut fixed = false;
                let written = in_transaction(conn, |tx| {
                    for entry in &entries {
                        if accept_dimension(&dimension, entry.embedding.len())? {
                            fixed = true;
                            meta_set(tx, "dimension", &entry.embedding.len().to_string())?;
                        }
                        upsert_entry(
                            tx,
                            &entry.id,
                            &entry.content,
                            &entry.embedding,
                            &entry.metadata,
                            now,
                        )?;
                    }
                    touch(tx, now)?;
                    Ok(entries.len())
                });
                if written.is_err() && fixed {
                    dimension.store(0, Ordering::Release);
                }
                written
            })
            .await;
        observe(BACKEND, "insert_batch", start, result)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorEntry>> {
        let start = Instant::now();
        let id = id.to_string();
        let result = self.run("get", move |conn| fetch_entry(conn, &id)).await;
        observe(BACKEND, "get", start, result)
    }

    #[instrument(skip(self), fields(backend = BACKEND, entry.id = %id))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run("delete", move |conn| {
            let removed = conn
                .execute("DELETE FROM embeddings WHERE id = ?1", params![id])
                .map_err(|e| Error::operation("delete_embedding", e))?;
            if removed > 0 {
                touch(conn, current_timestamp_millis())?;
            }
            Ok(removed > 0)
        })
        .await
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let document_id = document_id.to_string();
        self.run("delete_document", move |conn| {
            in_transaction(conn, |tx| {
                let removed = tx
                    .execute(
                        "DELETE FROM embeddings WHERE document_id = ?1",
                        params![document_id],
                    )
                    .map_err(|e| Error::operation("delete_document_embeddings", e))?;
                tx.execute(
                    "DELETE FROM document_chunks WHERE document_id = ?1",
                    params![document_id],
                )
                .map_err(|e| Error::operation("delete_document_chunks", e))?;
                touch(tx, current_timestamp_millis())?;
                Ok(removed)
            })
        })
        .await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        self.run("list_ids", |conn| {
            let mut stmt = conn
                .prepare("SELECT id FROM embeddings ORDER BY id")
                .map_err(|e| Error::operation("prepare_list_ids", e))?;
            let ids = stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| Error::operation("list_ids", e))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(|e| Error::operation("list_ids", e))?;
            Ok(ids)
        })
        .await
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn clear(&self) -> Result<()> {
        self.run("clear", |conn| {
            in_transaction(conn, |tx| {
                tx.execute_batch("DELETE FROM embeddings; DELETE FROM document_chunks;")
                    .map_err(|e| Error::operation("clear", e))?;
                touch(tx, current_timestamp_millis())
            })
        })
        .await
    }

    #[instrument(skip(self, query, options), fields(backend = BACKEND, top_k = options.top_k))]
    async fn search(&self, query: &[f32], options: &SearchOptions) -> Result<SearchResponse> {
        let start = Instant::now();
        let query = query.to_vec();
        let options = options.clone();
        let dimension = self.dimension();

        let result = self
            .run("search", move |conn| {
                validate_query(&query, dimension)?;
                let (clause, params, _) = build_filter_clause_numbered(&options, 1);
                let candidates = load_entries(conn, &clause, &params)?;
                let candidates = candidates
                    .iter()
                    .filter(|entry| passes_filters(&entry.metadata, &options));
                let (results, total_found) = rank(&query, candidates, &options);
                Ok(SearchResponse {
                    results,
                    total_found,
                    query_time: start.elapsed(),
                })
            })
            .await;
        observe(BACKEND, "search", start, result)
    }

    #[instrument(skip(self, content, metadata), fields(backend = BACKEND, document.id = %document_id))]
    async fn insert_large_document(
        &self,
        document_id: &str,
        content: &str,
        metadata: FragmentMetadata,
        chunk_size: usize,
    ) -> Result<Vec<DocumentChunk>> {
        let start = Instant::now();
        let chunks = build_chunks(document_id, content, &metadata, chunk_size)?;
        let document_id = document_id.to_string();

        let result = self
            .run("insert_large_document", move |conn| {
                let now = current_timestamp_millis();
                in_transaction(conn, |tx| {
                    tx.execute(
                        "DELETE FROM document_chunks WHERE document_id = ?1",
                        params![document_id],
                    )
                    .map_err(|e| Error::operation("replace_chunks", e))?;

                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO document_chunks
                                (document_id, chunk_index, chunk_content, total_chunks, metadata, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        )
                        .map_err(|e| Error::operation("prepare_insert_chunk", e))?;
                    for chunk in &chunks {
                        stmt.execute(params![
                            document_id,
                            i64::try_from(chunk.chunk_index).unwrap_or(i64::MAX),
                            chunk.content,
                            i64::try_from(chunk.total_chunks).unwrap_or(i64::MAX),
                            encode_metadata(&chunk.metadata)?,
                            now,
                        ])
                        .map_err(|e| Error::operation("insert_chunk", e))?;
                    }
                    touch(tx, now)
                })?;
                Ok(chunks)
            })
            .await;
        observe(BACKEND, "insert_large_document", start, result)
    }

    async fn retrieve_large_document(&self, document_id: &str) -> Result<Option<String>> {
        let document_id = document_id.to_string();
        self.run("retrieve_large_document", move |conn| {
            Ok(assemble(fetch_chunks(conn, &document_id)?))
        })
        .await
    }

    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        let document_id = document_id.to_string();
        self.run("get_document_chunks", move |conn| {
            fetch_chunks(conn, &document_id)
        })
        .await
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        let model = self.embedding_model.clone();
        let dimension = self.dimension();
        self.run("get_stats", move |conn| {
            let now = current_timestamp_millis();
            Ok(StoreStats {
                total_chunks: count_rows(conn, "embeddings")?,
                embedding_model: model,
                dimension,
                created_at: meta_i64(conn, "created_at")?.unwrap_or(now),
                updated_at: meta_i64(conn, "updated_at")?.unwrap_or(now),
                documents: group_counts(conn, "document_id")?,
                content_types: group_counts(conn, "content_type")?,
                backend: BackendKind::EmbeddedRelational,
            })
        })
        .await
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn export(&self) -> Result<ExportDocument> {
        let model = self.embedding_model.clone();
        let dimension = self.dimension();
        self.run("export", move |conn| {
            let entries = load_entries(conn, "", &[])?;
            let now = current_timestamp_millis();
            Ok(ExportDocument::new(
                model,
                dimension,
                meta_i64(conn, "created_at")?.unwrap_or(now),
                meta_i64(conn, "updated_at")?.unwrap_or(now),
                entries,
            ))
        })
        .await
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn save(&self) -> Result<()> {
        let start = Instant::now();
        let in_memory = self.config.is_in_memory();
        let result = self
            .run("save", move |conn| {
                if in_memory {
                    return Ok(());
                }
                // Returns (busy, log frames, checkpointed frames)
                let busy: i64 = conn
                    .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))
                    .map_err(|e| Error::operation("wal_checkpoint", e))?;
                if busy != 0 {
                    tracing::debug!("WAL checkpoint could not complete, readers still active");
                }
                Ok(())
            })
            .await;
        observe(BACKEND, "save", start, result)
    }

    async fn load(&self) -> Result<()> {
        self.run("load", |_| Ok(())).await
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn optimize(&self) -> Result<()> {
        let start = Instant::now();
        let result = self
            .run("optimize", |conn| {
                conn.execute_batch("ANALYZE; VACUUM;")
                    .map_err(|e| Error::operation("optimize", e))
            })
            .await;
        observe(BACKEND, "optimize", start, result)
    }

    async fn verify(&self) -> VerifyReport {
        let dimension = self.dimension();
        let result = self
            .run("verify", move |conn| {
                let mut errors = Vec::new();
                let mut warnings = Vec::new();

                let mut stmt = conn
                    .prepare("PRAGMA integrity_check")
                    .map_err(|e| Error::operation("integrity_check", e))?;
                let problems = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(|e| Error::operation("integrity_check", e))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::operation("integrity_check", e))?;
                errors.extend(problems.into_iter().filter(|p| p != "ok"));

                let mut stmt = conn
                    .prepare("SELECT id, embedding FROM embeddings ORDER BY rowid")
                    .map_err(|e| Error::operation("verify_embeddings", e))?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                    .map_err(|e| Error::operation("verify_embeddings", e))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::operation("verify_embeddings", e))?;

                let mut lengths = Vec::with_capacity(rows.len());
                for (id, raw) in &rows {
                    match decode_embedding(raw) {
                        Ok(embedding) => lengths.push((id.as_str(), embedding.len())),
                        Err(_) => errors.push(format!("entry '{id}' has an unreadable embedding")),
                    }
                }
                errors.extend(scan_entries(lengths, dimension));

                let mut stmt = conn
                    .prepare(
                        "SELECT document_id, COUNT(*), MIN(total_chunks), MAX(total_chunks)
                         FROM document_chunks GROUP BY document_id",
                    )
                    .map_err(|e| Error::operation("verify_chunks", e))?;
                let groups = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })
                    .map_err(|e| Error::operation("verify_chunks", e))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::operation("verify_chunks", e))?;
                for (document_id, count, min_total, max_total) in groups {
                    if min_total != max_total || count != max_total {
                        warnings.push(format!(
                            "document '{document_id}' has {count} chunks, expected {max_total}"
                        ));
                    }
                }

                Ok(VerifyReport::new(rows.len(), errors, warnings))
            })
            .await;
        result.unwrap_or_else(|e| VerifyReport::failed(e.to_string()))
    }
}
