//! PostgreSQL + pgvector vector store.
//!
//! Similarity is computed by the database with the cosine distance operator
//! (`<=>`) over an HNSW index. Connections come from a `deadpool-postgres`
//! pool and every multi-row write runs in one transaction.

use crate::config::{BackendKind, PostgresStoreConfig};
use crate::models::{
    BatchEntry, DocumentChunk, ExportDocument, FragmentMetadata, MetadataScalar, SearchOptions,
    SearchResponse, SearchResult, StoreStats, VectorEntry, VerifyReport, is_denormalized_field,
};
use crate::storage::chunking::{assemble, build_chunks};
use crate::storage::lock::acquire_lock;
use crate::storage::metrics::observe;
use crate::storage::migrations::{Migration, MigrationRunner};
use crate::storage::similarity::{finalize_results, validate_query};
use crate::storage::traits::VectorStore;
use crate::{Error, Result, current_timestamp_millis};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::instrument;

const BACKEND: &str = "pgvector";

/// Extra rows fetched past `top_k` so ties at the cut can be ordered by id.
const TIE_SLACK: usize = 16;

/// Embedded migrations for the entries table.
///
/// The pgvector extension is created by `initialize` before these run.
const EMBEDDING_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial embeddings table",
        sql: r"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                embedding vector({dimension}) NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                document_id TEXT,
                section TEXT,
                content_type TEXT,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            );
        ",
    },
    Migration {
        version: 2,
        description: "Add HNSW index for cosine similarity",
        sql: r"
            CREATE INDEX IF NOT EXISTS {table}_embedding_idx
            ON {table} USING hnsw (embedding vector_cosine_ops)
            WITH (m = 16, ef_construction = 64);
        ",
    },
    Migration {
        version: 3,
        description: "Add metadata indexes for filtering",
        sql: r"
            CREATE INDEX IF NOT EXISTS {table}_document_id_idx ON {table} (document_id);
            CREATE INDEX IF NOT EXISTS {table}_section_idx ON {table} (section);
            CREATE INDEX IF NOT EXISTS {table}_content_type_idx ON {table} (content_type);
            CREATE INDEX IF NOT EXISTS {table}_metadata_idx ON {table} USING GIN (metadata jsonb_path_ops);
        ",
    },
];

/// Embedded migrations for the large-document chunks table.
const CHUNK_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial document chunks table",
    sql: r"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            chunk_content TEXT NOT NULL,
            embedding vector({dimension}),
            total_chunks INTEGER NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at BIGINT NOT NULL,
            UNIQUE (document_id, chunk_index)
        );
    ",
}];

/// Boxed query parameter that can be held across awaits.
type SqlParam = Box<dyn ToSql + Sync + Send>;

fn pool_error(e: impl std::fmt::Display) -> Error {
    Error::operation("pgvector_get_client", e)
}

fn query_error(op: &str, e: impl std::fmt::Display) -> Error {
    Error::operation(op, e)
}

/// Formats an embedding as a pgvector literal: `[1,2,3]`.
#[must_use]
pub fn format_embedding(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    format!("[{}]", values.join(","))
}

/// Zero-vector literal stored for a chunk until its embedding is backfilled.
#[must_use]
pub fn placeholder_embedding(dimension: usize) -> String {
    format_embedding(&vec![0.0; dimension])
}

/// Parses the pgvector text form back into floats.
pub fn parse_embedding(raw: &str) -> Result<Vec<f32>> {
    serde_json::from_str(raw).map_err(|e| query_error("pgvector_parse_embedding", e))
}

fn metadata_from_json(value: serde_json::Value) -> Result<FragmentMetadata> {
    serde_json::from_value(value).map_err(|e| query_error("pgvector_decode_metadata", e))
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidInput(format!("{what} {value} out of range")))
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
const fn to_usize(value: i64) -> usize {
    if value < 0 { 0 } else { value as usize }
}

/// Builds the filter WHERE fragment and its parameters.
///
/// Every allowed value must be contained in the JSONB metadata either as the
/// scalar itself or as an element of an array value. Denormalized fields
/// also compare their text column so plain text values can use its index.
pub fn build_filter_clause(options: &SearchOptions, start_param: usize) -> (String, Vec<SqlParam>) {
    let mut clause = String::new();
    let mut params: Vec<SqlParam> = Vec::new();
    let mut next = start_param;

    for (field, allowed) in options.active_filters() {
        let mut alternatives = Vec::with_capacity(allowed.len() * 2 + 1);

        if is_denormalized_field(field) {
            let texts: Vec<String> = allowed
                .iter()
                .filter_map(MetadataScalar::as_text)
                .map(str::to_string)
                .collect();
            if !texts.is_empty() {
                alternatives.push(format!("{field} = ANY(${next})"));
                params.push(Box::new(texts));
                next += 1;
            }
        }

        for value in allowed {
            let scalar = serde_json::json!({ field: value.to_json() });
            let element = serde_json::json!({ field: [value.to_json()] });
            alternatives.push(format!("metadata @> ${next}"));
            alternatives.push(format!("metadata @> ${}", next + 1));
            params.push(Box::new(scalar));
            params.push(Box::new(element));
            next += 2;
        }
        clause.push_str(&format!(" AND ({})", alternatives.join(" OR ")));
    }

    (clause, params)
}

/// pgvector-based vector store.
///
/// # Schema
///
/// - `<prefix>embeddings`: `vector(dimension)` column with an HNSW cosine
///   index, JSONB metadata with a GIN index, denormalized filter columns
/// - `<prefix>document_chunks`: large-document chunks stored with a zero
///   placeholder embedding until [`PgvectorStore::set_chunk_embedding`]
///   backfills it
///
/// # Search
///
/// Rows are ordered by the database on cosine distance so the HNSW index can
/// serve the query; the final ordering and threshold are applied in process.
/// `total_found` counts the threshold-passing rows among those fetched, not
/// every matching row in the table.
///
/// # Dimension
///
/// The dimension is part of the column type and must be set up front.
pub struct PgvectorStore {
    config: PostgresStoreConfig,
    embedding_model: String,
    dimension: usize,
    embeddings_table: String,
    chunks_table: String,
    pool: Mutex<Option<Pool>>,
}

impl PgvectorStore {
    /// Creates a store; no connection is made until `initialize`.
    #[must_use]
    pub fn new(
        config: PostgresStoreConfig,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let embeddings_table = config.embeddings_table();
        let chunks_table = config.chunks_table();
        Self {
            config,
            embedding_model: embedding_model.into(),
            dimension,
            embeddings_table,
            chunks_table,
            pool: Mutex::new(None),
        }
    }

    /// Name of the entries table.
    #[must_use]
    pub fn embeddings_table(&self) -> &str {
        &self.embeddings_table
    }

    /// Name of the chunks table.
    #[must_use]
    pub fn chunks_table(&self) -> &str {
        &self.chunks_table
    }

    /// Builds a deadpool config from the store settings.
    ///
    /// # Pool Configuration
    ///
    /// - `pool_size` max connections
    /// - `connect_timeout_secs` for checkout, connect and recycle
    /// - fast recycling for connection reuse
    fn build_pool_config(config: &PostgresStoreConfig) -> Config {
        let timeout = config.connect_timeout();
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = config.password().map(String::from);
        cfg.dbname = Some(config.database.clone());
        cfg.connect_timeout = Some(timeout);
        if config.ssl {
            cfg.ssl_mode = Some(deadpool_postgres::SslMode::Require);
        }

        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size.max(1),
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(timeout),
                create: Some(timeout),
                recycle: Some(Duration::from_secs(5)),
            },
            ..Default::default()
        });

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg
    }

    #[cfg(feature = "postgres-tls")]
    fn create_pool(config: &PostgresStoreConfig) -> Result<Pool> {
        let cfg = Self::build_pool_config(config);
        if config.ssl {
            let roots = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            return cfg
                .create_pool(Some(Runtime::Tokio1), tls)
                .map_err(|e| query_error("pgvector_create_pool", e));
        }
        cfg.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| query_error("pgvector_create_pool", e))
    }

    #[cfg(not(feature = "postgres-tls"))]
    fn create_pool(config: &PostgresStoreConfig) -> Result<Pool> {
        if config.ssl {
            return Err(Error::FeatureNotEnabled("postgres-tls".to_string()));
        }
        Self::build_pool_config(config)
            .create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| query_error("pgvector_create_pool", e))
    }

    fn pool(&self, operation: &str) -> Result<Pool> {
        acquire_lock(&self.pool).clone().ok_or_else(|| {
            Error::NotReady(format!("pgvector store must be initialized before {operation}"))
        })
    }

    async fn client(&self, operation: &str) -> Result<deadpool_postgres::Object> {
        self.pool(operation)?.get().await.map_err(pool_error)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(Error::InvalidInput("embedding must not be empty".to_string()));
        }
        if embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    fn upsert_sql(&self) -> String {
        format!(
            r"INSERT INTO {} (id, content, embedding, metadata, document_id, section, content_type, created_at, updated_at)
            VALUES ($1, $2, $3::text::vector, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                embedding = EXCLUDED.embedding,
                metadata = EXCLUDED.metadata,
                document_id = EXCLUDED.document_id,
                section = EXCLUDED.section,
                content_type = EXCLUDED.content_type,
                updated_at = EXCLUDED.updated_at",
            self.embeddings_table
        )
    }

    fn entry_from_row(row: &Row) -> Result<VectorEntry> {
        let embedding: String = row.get(2);
        Ok(VectorEntry {
            id: row.get(0),
            content: row.get(1),
            embedding: parse_embedding(&embedding)?,
            metadata: metadata_from_json(row.get(3))?,
        })
    }

    async fn group_counts(
        client: &deadpool_postgres::Object,
        table: &str,
        column: &str,
    ) -> Result<BTreeMap<String, usize>> {
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM {table} WHERE {column} IS NOT NULL GROUP BY {column}"
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| query_error("pgvector_group_counts", e))?;
        Ok(rows
            .iter()
            .map(|row| (row.get::<_, String>(0), to_usize(row.get::<_, i64>(1))))
            .collect())
    }

    /// Stores the embedding of one chunk of a large document.
    ///
    /// Returns false if the chunk does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch or query failure.
    #[instrument(skip(self, embedding), fields(backend = BACKEND, document.id = %document_id))]
    pub async fn set_chunk_embedding(
        &self,
        document_id: &str,
        chunk_index: usize,
        embedding: &[f32],
    ) -> Result<bool> {
        self.check_dimension(embedding)?;
        let client = self.client("set_chunk_embedding").await?;
        let sql = format!(
            "UPDATE {} SET embedding = $3::text::vector WHERE document_id = $1 AND chunk_index = $2",
            self.chunks_table
        );
        let updated = client
            .execute(
                &sql,
                &[
                    &document_id,
                    &to_i32(chunk_index, "chunk index")?,
                    &format_embedding(embedding),
                ],
            )
            .await
            .map_err(|e| query_error("pgvector_set_chunk_embedding", e))?;
        Ok(updated > 0)
    }
}

#[async_trait]
impl VectorStore for PgvectorStore {
    fn backend(&self) -> BackendKind {
        BackendKind::ServerRelational
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_ready(&self) -> bool {
        acquire_lock(&self.pool).is_some()
    }

    fn supports_chunking(&self) -> bool {
        true
    }

    #[instrument(skip(self), fields(backend = BACKEND, url = %self.config.redacted_url()))]
    async fn initialize(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        if self.dimension == 0 {
            return Err(Error::InvalidInput(
                "pgvector store requires a dimension greater than zero".to_string(),
            ));
        }

        let start = Instant::now();
        let result = async {
            let pool = Self::create_pool(&self.config)?;

            let client = pool.get().await.map_err(pool_error)?;
            client
                .batch_execute("CREATE EXTENSION IF NOT EXISTS vector")
                .await
                .map_err(|e| query_error("pgvector_create_extension", e))?;
            drop(client);

            let dimension = self.dimension.to_string();
            MigrationRunner::new(pool.clone(), &self.embeddings_table)
                .with_param("dimension", dimension.as_str())
                .run(EMBEDDING_MIGRATIONS)
                .await?;
            MigrationRunner::new(pool.clone(), &self.chunks_table)
                .with_param("dimension", dimension)
                .run(CHUNK_MIGRATIONS)
                .await?;

            *acquire_lock(&self.pool) = Some(pool);
            tracing::info!(table = %self.embeddings_table, "pgvector store ready");
            Ok(())
        }
        .await;
        observe(BACKEND, "initialize", start, result)
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn close(&self) -> Result<()> {
        if let Some(pool) = acquire_lock(&self.pool).take() {
            pool.close();
            tracing::info!("pgvector store closed");
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let client = self.client("count").await?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.embeddings_table);
        let row = client
            .query_one(&sql, &[])
            .await
            .map_err(|e| query_error("pgvector_count", e))?;
        Ok(to_usize(row.get(0)))
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
        let result = async {
            self.check_dimension(embedding)?;
            let client = self.client("insert").await?;
            client
                .execute(
                    &self.upsert_sql(),
                    &[
                        &id,
                        &content,
                        &format_embedding(embedding),
                        &metadata.to_json(),
                        &metadata.document_id(),
                        &metadata.section(),
                        &metadata.content_type(),
                        &current_timestamp_millis(),
                    ],
                )
                .await
                .map_err(|e| query_error("pgvector_upsert", e))?;
            Ok(())
        }
        .await;
        observe(BACKEND, "insert", start, result)
    }

    #[instrument(skip(self, entries), fields(backend = BACKEND, count = entries.len()))]
    async fn insert_batch(&self, entries: Vec<BatchEntry>) -> Result<usize> {
        let start = Instant::now();
        let result = async {
            let mut client = self.client("insert_batch").await?;
            if entries.is_empty() {
                return Ok(0);
            }

            // Dropping the transaction without commit rolls it back
            let tx = client
                .transaction()
                .await
                .map_err(|e| query_error("pgvector_begin_tx", e))?;
            let stmt = tx
                .prepare(&self.upsert_sql())
                .await
                .map_err(|e| query_error("pgvector_prepare_upsert", e))?;

            let now = current_timestamp_millis();
            for entry in &entries {
                self.check_dimension(&entry.embedding)?;
                tx.execute(
                    &stmt,
                    &[
                        &entry.id,
                        &entry.content,
                        &format_embedding(&entry.embedding),
                        &entry.metadata.to_json(),
                        &entry.metadata.document_id(),
                        &entry.metadata.section(),
                        &entry.metadata.content_type(),
                        &now,
                    ],
                )
                .await
                .map_err(|e| query_error("pgvector_batch_upsert", e))?;
            }

            tx.commit()
                .await
                .map_err(|e| query_error("pgvector_commit", e))?;
            Ok(entries.len())
        }
        .await;
        observe(BACKEND, "insert_batch", start, result)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorEntry>> {
        let client = self.client("get").await?;
        let sql = format!(
            "SELECT id, content, embedding::text, metadata FROM {} WHERE id = $1",
            self.embeddings_table
        );
        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| query_error("pgvector_get", e))?;
        row.as_ref().map(Self::entry_from_row).transpose()
    }

    #[instrument(skip(self), fields(backend = BACKEND, entry.id = %id))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let client = self.client("delete").await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", self.embeddings_table);
        let rows = client
            .execute(&sql, &[&id])
            .await
            .map_err(|e| query_error("pgvector_delete", e))?;
        Ok(rows > 0)
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let mut client = self.client("delete_document").await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| query_error("pgvector_begin_tx", e))?;

        let removed = tx
            .execute(
                &format!("DELETE FROM {} WHERE document_id = $1", self.embeddings_table),
                &[&document_id],
            )
            .await
            .map_err(|e| query_error("pgvector_delete_document", e))?;
        tx.execute(
            &format!("DELETE FROM {} WHERE document_id = $1", self.chunks_table),
            &[&document_id],
        )
        .await
        .map_err(|e| query_error("pgvector_delete_document_chunks", e))?;

        tx.commit()
            .await
            .map_err(|e| query_error("pgvector_commit", e))?;
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let client = self.client("list_ids").await?;
        let sql = format!("SELECT id FROM {} ORDER BY id", self.embeddings_table);
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| query_error("pgvector_list_ids", e))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn clear(&self) -> Result<()> {
        let client = self.client("clear").await?;
        client
            .batch_execute(&format!(
                "TRUNCATE TABLE {}, {}",
                self.embeddings_table, self.chunks_table
            ))
            .await
            .map_err(|e| query_error("pgvector_clear", e))?;
        Ok(())
    }

    #[instrument(skip(self, query, options), fields(backend = BACKEND, top_k = options.top_k))]
    async fn search(&self, query: &[f32], options: &SearchOptions) -> Result<SearchResponse> {
        let start = Instant::now();
        let result = async {
            let client = self.client("search").await?;
            validate_query(query, self.dimension)?;
            if options.top_k == 0 {
                return Ok(SearchResponse {
                    results: Vec::new(),
                    total_found: 0,
                    query_time: start.elapsed(),
                });
            }

            let embedding_str = format_embedding(query);
            let (filter_clause, filter_params) = build_filter_clause(options, 2);
            let embedding_column = if options.include_embeddings {
                "embedding::text"
            } else {
                "NULL::text"
            };
            let limit = options.top_k.saturating_add(TIE_SLACK);

            let sql = format!(
                r"SELECT id, content, metadata, {embedding_column},
                    1 - (embedding <=> $1::text::vector) AS similarity
                FROM {}
                WHERE TRUE{filter_clause}
                ORDER BY embedding <=> $1::text::vector
                LIMIT {limit}",
                self.embeddings_table
            );

            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(filter_params.len() + 1);
            params.push(&embedding_str);
            for param in &filter_params {
                params.push(&**param);
            }

            let rows = client
                .query(&sql, &params)
                .await
                .map_err(|e| query_error("pgvector_search", e))?;

            let mut results = Vec::with_capacity(rows.len());
            for row in &rows {
                let embedding: Option<String> = row.get(3);
                let similarity: Option<f64> = row.get(4);
                // Zero-magnitude vectors yield NaN distance
                #[allow(clippy::cast_possible_truncation)]
                let score = similarity.filter(|s| s.is_finite()).unwrap_or(0.0) as f32;
                results.push(SearchResult {
                    id: row.get(0),
                    content: row.get(1),
                    metadata: metadata_from_json(row.get(2))?,
                    score,
                    embedding: embedding.as_deref().map(parse_embedding).transpose()?,
                });
            }

            let (results, total_found) = finalize_results(results, options);
            Ok(SearchResponse {
                results,
                total_found,
                query_time: start.elapsed(),
            })
        }
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
        let result = async {
            let chunks = build_chunks(document_id, content, &metadata, chunk_size)?;
            let mut client = self.client("insert_large_document").await?;
            let tx = client
                .transaction()
                .await
                .map_err(|e| query_error("pgvector_begin_tx", e))?;

            tx.execute(
                &format!("DELETE FROM {} WHERE document_id = $1", self.chunks_table),
                &[&document_id],
            )
            .await
            .map_err(|e| query_error("pgvector_replace_chunks", e))?;

            let stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} (document_id, chunk_index, chunk_content, embedding, total_chunks, metadata, created_at)
                     VALUES ($1, $2, $3, $4::text::vector, $5, $6, $7)",
                    self.chunks_table
                ))
                .await
                .map_err(|e| query_error("pgvector_prepare_chunk", e))?;

            let placeholder = placeholder_embedding(self.dimension);
            let now = current_timestamp_millis();
            for chunk in &chunks {
                tx.execute(
                    &stmt,
                    &[
                        &document_id,
                        &to_i32(chunk.chunk_index, "chunk index")?,
                        &chunk.content,
                        &placeholder,
                        &to_i32(chunk.total_chunks, "chunk count")?,
                        &chunk.metadata.to_json(),
                        &now,
                    ],
                )
                .await
                .map_err(|e| query_error("pgvector_insert_chunk", e))?;
            }

            tx.commit()
                .await
                .map_err(|e| query_error("pgvector_commit", e))?;
            Ok(chunks)
        }
        .await;
        observe(BACKEND, "insert_large_document", start, result)
    }

    async fn retrieve_large_document(&self, document_id: &str) -> Result<Option<String>> {
        Ok(assemble(self.get_document_chunks(document_id).await?))
    }

    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        let client = self.client("get_document_chunks").await?;
        let sql = format!(
            "SELECT chunk_index, chunk_content, total_chunks, metadata
             FROM {} WHERE document_id = $1 ORDER BY chunk_index",
            self.chunks_table
        );
        let rows = client
            .query(&sql, &[&document_id])
            .await
            .map_err(|e| query_error("pgvector_get_chunks", e))?;

        rows.iter()
            .map(|row| {
                let chunk_index = to_usize(i64::from(row.get::<_, i32>(0)));
                Ok(DocumentChunk {
                    chunk_id: DocumentChunk::chunk_id_for(document_id, chunk_index),
                    chunk_index,
                    total_chunks: to_usize(i64::from(row.get::<_, i32>(2))),
                    content: row.get(1),
                    metadata: metadata_from_json(row.get(3))?,
                })
            })
            .collect()
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        let client = self.client("get_stats").await?;
        let sql = format!(
            "SELECT COUNT(*), MIN(created_at), MAX(updated_at) FROM {}",
            self.embeddings_table
        );
        let row = client
            .query_one(&sql, &[])
            .await
            .map_err(|e| query_error("pgvector_stats", e))?;
        let now = current_timestamp_millis();

        Ok(StoreStats {
            total_chunks: to_usize(row.get(0)),
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            created_at: row.get::<_, Option<i64>>(1).unwrap_or(now),
            updated_at: row.get::<_, Option<i64>>(2).unwrap_or(now),
            documents: Self::group_counts(&client, &self.embeddings_table, "document_id").await?,
            content_types: Self::group_counts(&client, &self.embeddings_table, "content_type")
                .await?,
            backend: BackendKind::ServerRelational,
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn export(&self) -> Result<ExportDocument> {
        let stats = self.get_stats().await?;
        let client = self.client("export").await?;
        let sql = format!(
            "SELECT id, content, embedding::text, metadata FROM {} ORDER BY created_at, id",
            self.embeddings_table
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| query_error("pgvector_export", e))?;
        let entries = rows
            .iter()
            .map(Self::entry_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ExportDocument::new(
            self.embedding_model.clone(),
            self.dimension,
            stats.created_at,
            stats.updated_at,
            entries,
        ))
    }

    async fn save(&self) -> Result<()> {
        self.pool("save").map(|_| ())
    }

    async fn load(&self) -> Result<()> {
        self.pool("load").map(|_| ())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn optimize(&self) -> Result<()> {
        let start = Instant::now();
        let result = async {
            let client = self.client("optimize").await?;
            client
                .batch_execute(&format!(
                    "VACUUM ANALYZE {}; VACUUM ANALYZE {}",
                    self.embeddings_table, self.chunks_table
                ))
                .await
                .map_err(|e| query_error("pgvector_optimize", e))
        }
        .await;
        observe(BACKEND, "optimize", start, result)
    }

    async fn verify(&self) -> VerifyReport {
        let result: Result<VerifyReport> = async {
            let client = self.client("verify").await?;
            let dimension = to_i32(self.dimension, "dimension")?;
            let mut errors = Vec::new();
            let mut warnings = Vec::new();

            let checked = to_usize(
                client
                    .query_one(&format!("SELECT COUNT(*) FROM {}", self.embeddings_table), &[])
                    .await
                    .map_err(|e| query_error("pgvector_verify_count", e))?
                    .get(0),
            );

            let bad = client
                .query(
                    &format!(
                        "SELECT id, vector_dims(embedding) FROM {} WHERE vector_dims(embedding) <> $1 ORDER BY id",
                        self.embeddings_table
                    ),
                    &[&dimension],
                )
                .await
                .map_err(|e| query_error("pgvector_verify_dimensions", e))?;
            for row in &bad {
                let id: String = row.get(0);
                let dims: i32 = row.get(1);
                errors.push(format!(
                    "entry '{id}' has dimension {dims}, expected {dimension}"
                ));
            }

            let groups = client
                .query(
                    &format!(
                        "SELECT document_id, COUNT(*), MIN(total_chunks), MAX(total_chunks)
                         FROM {} GROUP BY document_id",
                        self.chunks_table
                    ),
                    &[],
                )
                .await
                .map_err(|e| query_error("pgvector_verify_chunks", e))?;
            for row in &groups {
                let document_id: String = row.get(0);
                let count: i64 = row.get(1);
                let min_total: i32 = row.get(2);
                let max_total: i32 = row.get(3);
                if min_total != max_total || count != i64::from(max_total) {
                    warnings.push(format!(
                        "document '{document_id}' has {count} chunks, expected {max_total}"
                    ));
                }
            }

            Ok(VerifyReport::new(checked, errors, warnings))
        }
        .await;
        result.unwrap_or_else(|e| VerifyReport::failed(e.to_string()))
    }
}
