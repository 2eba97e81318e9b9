//! In-memory vector store persisted as one JSON snapshot.
//!
//! All entries live in memory in insertion order. Search is a brute-force
//! O(n) scan, which is fine for a few thousand fragments. Writes only become
//! durable on an explicit [`save`](VectorStore::save); `close` saves too.

use crate::config::{BackendKind, FileStoreConfig};
use crate::models::{
    BatchEntry, DocumentChunk, ExportDocument, FragmentMetadata, SearchOptions, SearchResponse,
    StoreStats, VectorEntry, VerifyReport, scan_entries,
};
use crate::storage::lock::acquire_lock;
use crate::storage::metrics::observe;
use crate::storage::similarity::{rank, validate_query};
use crate::storage::traits::VectorStore;
use crate::{Error, Result, current_timestamp_millis};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "file";

/// Mutable state of an initialized store.
#[derive(Debug)]
struct FileState {
    entries: Vec<VectorEntry>,
    created_at: i64,
    updated_at: i64,
    /// Bumped on every mutation.
    revision: u64,
    /// Revision last written to disk.
    saved_revision: u64,
}

impl FileState {
    fn empty() -> Self {
        let now = current_timestamp_millis();
        Self {
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
            saved_revision: 0,
        }
    }

    fn from_document(document: ExportDocument) -> Self {
        Self {
            entries: document.entries,
            created_at: document.created_at,
            updated_at: document.updated_at,
            revision: 0,
            saved_revision: 0,
        }
    }

    const fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = current_timestamp_millis();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Replaces an entry with the same id, or appends.
    fn put(&mut self, entry: VectorEntry) {
        match self.position(&entry.id) {
            Some(index) => self.entries[index] = entry,
            None => self.entries.push(entry),
        }
    }
}

/// Vector store holding every entry in memory.
///
/// # Persistence
///
/// The snapshot file has the same shape as the interchange document
/// ([`ExportDocument`]) and is rewritten wholesale by `save`. A store with an
/// empty path never touches disk.
///
/// # Dimension
///
/// A configured dimension of 0 is fixed by the first insert.
pub struct FileVectorStore {
    path: PathBuf,
    embedding_model: String,
    dimension: AtomicUsize,
    state: Mutex<Option<FileState>>,
}

impl FileVectorStore {
    /// Creates a store persisted at `config.path`.
    #[must_use]
    pub fn new(config: &FileStoreConfig, embedding_model: impl Into<String>, dimension: usize) -> Self {
        Self::with_path(config.path.clone(), embedding_model, dimension)
    }

    /// Creates a store persisted at `path`.
    #[must_use]
    pub fn with_path(
        path: impl Into<PathBuf>,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            path: path.into(),
            embedding_model: embedding_model.into(),
            dimension: AtomicUsize::new(dimension),
            state: Mutex::new(None),
        }
    }

    /// Creates a store that never persists.
    #[must_use]
    pub fn in_memory(embedding_model: impl Into<String>, dimension: usize) -> Self {
        Self::with_path(PathBuf::new(), embedding_model, dimension)
    }

    /// Returns the snapshot path (empty for in-memory stores).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if there are writes not yet saved.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        acquire_lock(&self.state)
            .as_ref()
            .is_some_and(FileState::is_dirty)
    }

    fn persists(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }

    fn with_state<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut FileState) -> Result<T>,
    ) -> Result<T> {
        let mut guard = acquire_lock(&self.state);
        match guard.as_mut() {
            Some(state) => f(state),
            None => Err(Error::NotReady(format!(
                "file store must be initialized before {operation}"
            ))),
        }
    }

    /// Checks an embedding, fixing the dimension on first use.
    fn accept_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(Error::InvalidInput("embedding must not be empty".to_string()));
        }
        let expected = self.dimension.load(Ordering::Acquire);
        if expected == 0 {
            self.dimension.store(embedding.len(), Ordering::Release);
            return Ok(());
        }
        if embedding.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    fn to_document(&self, state: &FileState) -> ExportDocument {
        ExportDocument::new(
            self.embedding_model.clone(),
            self.dimension(),
            state.created_at,
            state.updated_at,
            state.entries.clone(),
        )
    }

    /// Reads the snapshot; `Ok(None)` when there is nothing to read.
    async fn read_snapshot(&self) -> Result<Option<ExportDocument>> {
        if !self.persists() {
            return Ok(None);
        }
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::operation("file_read_snapshot", e)),
        };
        let document = ExportDocument::from_json_str(&content)?;

        let configured = self.dimension();
        if configured > 0 && document.dimension > 0 && document.dimension != configured {
            return Err(Error::DimensionMismatch {
                expected: configured,
                actual: document.dimension,
            });
        }
        document.validate_dimensions(configured.max(document.dimension))?;
        Ok(Some(document))
    }

    /// Adopts a loaded snapshot as the current state.
    fn install(&self, document: Option<ExportDocument>) {
        let state = match document {
            Some(document) => {
                if self.dimension() == 0 {
                    let dimension = if document.dimension > 0 {
                        document.dimension
                    } else {
                        document.entries.first().map_or(0, |e| e.embedding.len())
                    };
                    self.dimension.store(dimension, Ordering::Release);
                }
                FileState::from_document(document)
            },
            None => FileState::empty(),
        };
        *acquire_lock(&self.state) = Some(state);
    }

    async fn write_snapshot(&self) -> Result<()> {
        let snapshot = self.with_state("save", |state| {
            Ok(state
                .is_dirty()
                .then(|| (state.revision, self.to_document(state))))
        })?;
        let Some((revision, document)) = snapshot else {
            return Ok(());
        };

        let content =
            serde_json::to_vec(&document).map_err(|e| Error::operation("file_serialize", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::operation("file_create_dir", e))?;
        }

        // Write then rename so a crash never leaves a truncated snapshot
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::operation("file_write_snapshot", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::operation("file_rename_snapshot", e))?;

        self.with_state("save", |state| {
            state.saved_revision = state.saved_revision.max(revision);
            Ok(())
        })?;

        tracing::debug!(
            path = %self.path.display(),
            entries = document.total_chunks,
            "Saved vector snapshot"
        );
        Ok(())
    }

    /// Path an unreadable snapshot is moved to: `<path>.corrupt`.
    #[must_use]
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Moves an unreadable snapshot out of the way so the next save cannot
    /// overwrite it.
    async fn set_aside_snapshot(&self) {
        if !self.persists() {
            return;
        }
        let corrupt = self.corrupt_path();
        match tokio::fs::rename(&self.path, &corrupt).await {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                moved_to = %corrupt.display(),
                "Moved unreadable vector snapshot aside"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to move unreadable vector snapshot aside"
            ),
        }
    }

    fn unsupported(operation: &'static str) -> Error {
        Error::Unsupported {
            backend: BackendKind::InMemoryFile.as_str(),
            operation,
        }
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    fn backend(&self) -> BackendKind {
        BackendKind::InMemoryFile
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        acquire_lock(&self.state).is_some()
    }

    fn supports_chunking(&self) -> bool {
        false
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %self.path.display()))]
    async fn initialize(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let document = match self.read_snapshot().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load vector snapshot, starting empty"
                );
                self.set_aside_snapshot().await;
                None
            },
        };

        let loaded = document.as_ref().map_or(0, |d| d.entries.len());
        self.install(document);
        tracing::info!(entries = loaded, "File vector store ready");
        Ok(())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn close(&self) -> Result<()> {
        if !self.is_ready() {
            return Ok(());
        }
        if self.persists() {
            self.write_snapshot().await?;
        }
        *acquire_lock(&self.state) = None;
        tracing::info!("File vector store closed");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.with_state("count", |state| Ok(state.entries.len()))
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
        let result = self.with_state("insert", |state| {
            self.accept_dimension(embedding)?;
            state.put(VectorEntry::new(id, content, embedding.to_vec(), metadata));
            state.touch();
            Ok(())
        });
        observe(BACKEND, "insert", start, result)
    }

    #[instrument(skip(self, entries), fields(backend = BACKEND, count = entries.len()))]
    async fn insert_batch(&self, entries: Vec<BatchEntry>) -> Result<usize> {
        let start = Instant::now();
        let result = self.with_state("insert_batch", |state| {
            // Validate everything first so a bad entry leaves the store untouched
            let expected = match self.dimension() {
                0 => entries.first().map_or(0, |e| e.embedding.len()),
                fixed => fixed,
            };
            for entry in &entries {
                if entry.embedding.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "entry '{}' has an empty embedding",
                        entry.id
                    )));
                }
                if entry.embedding.len() != expected {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: entry.embedding.len(),
                    });
                }
            }
            if entries.is_empty() {
                return Ok(0);
            }

            self.accept_dimension(&entries[0].embedding)?;
            let written = entries.len();
            for entry in entries {
                state.put(entry.into());
            }
            state.touch();
            Ok(written)
        });
        observe(BACKEND, "insert_batch", start, result)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorEntry>> {
        self.with_state("get", |state| {
            Ok(state.position(id).map(|index| state.entries[index].clone()))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND, entry.id = %id))]
    async fn delete(&self, id: &str) -> Result<bool> {
        self.with_state("delete", |state| {
            let Some(index) = state.position(id) else {
                return Ok(false);
            };
            state.entries.remove(index);
            state.touch();
            Ok(true)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        self.with_state("delete_document", |state| {
            let before = state.entries.len();
            state
                .entries
                .retain(|e| e.metadata.document_id() != Some(document_id));
            let removed = before - state.entries.len();
            if removed > 0 {
                state.touch();
            }
            Ok(removed)
        })
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        self.with_state("list_ids", |state| {
            let mut ids: Vec<String> = state.entries.iter().map(|e| e.id.clone()).collect();
            ids.sort();
            Ok(ids)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn clear(&self) -> Result<()> {
        self.with_state("clear", |state| {
            state.entries.clear();
            state.touch();
            Ok(())
        })
    }

    #[instrument(skip(self, query, options), fields(backend = BACKEND, top_k = options.top_k))]
    async fn search(&self, query: &[f32], options: &SearchOptions) -> Result<SearchResponse> {
        let start = Instant::now();
        let result = self.with_state("search", |state| {
            validate_query(query, self.dimension())?;
            let (results, total_found) = rank(query, &state.entries, options);
            Ok(SearchResponse {
                results,
                total_found,
                query_time: start.elapsed(),
            })
        });
        observe(BACKEND, "search", start, result)
    }

    async fn insert_large_document(
        &self,
        _document_id: &str,
        _content: &str,
        _metadata: FragmentMetadata,
        _chunk_size: usize,
    ) -> Result<Vec<DocumentChunk>> {
        Err(Self::unsupported("insert_large_document"))
    }

    async fn retrieve_large_document(&self, _document_id: &str) -> Result<Option<String>> {
        Err(Self::unsupported("retrieve_large_document"))
    }

    async fn get_document_chunks(&self, _document_id: &str) -> Result<Vec<DocumentChunk>> {
        Err(Self::unsupported("get_document_chunks"))
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        self.with_state("get_stats", |state| {
            let mut documents = BTreeMap::new();
            let mut content_types = BTreeMap::new();
            for entry in &state.entries {
                if let Some(doc) = entry.metadata.document_id() {
                    *documents.entry(doc.to_string()).or_insert(0) += 1;
                }
                if let Some(kind) = entry.metadata.content_type() {
                    *content_types.entry(kind.to_string()).or_insert(0) += 1;
                }
            }
            Ok(StoreStats {
                total_chunks: state.entries.len(),
                embedding_model: self.embedding_model.clone(),
                dimension: self.dimension(),
                created_at: state.created_at,
                updated_at: state.updated_at,
                documents,
                content_types,
                backend: BackendKind::InMemoryFile,
            })
        })
    }

    async fn export(&self) -> Result<ExportDocument> {
        self.with_state("export", |state| Ok(self.to_document(state)))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn save(&self) -> Result<()> {
        let start = Instant::now();
        let result = if self.persists() {
            self.write_snapshot().await
        } else {
            self.with_state("save", |_| Ok(()))
        };
        observe(BACKEND, "save", start, result)
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn load(&self) -> Result<()> {
        let start = Instant::now();
        let result = async {
            self.with_state("load", |_| Ok(()))?;
            let document = self.read_snapshot().await?;
            self.install(document);
            Ok(())
        }
        .await;
        observe(BACKEND, "load", start, result)
    }

    async fn optimize(&self) -> Result<()> {
        self.with_state("optimize", |state| {
            // Keep the last write per id in case a snapshot was hand-edited
            let mut seen = std::collections::HashSet::new();
            let before = state.entries.len();
            let mut kept: Vec<VectorEntry> = state
                .entries
                .drain(..)
                .rev()
                .filter(|e| seen.insert(e.id.clone()))
                .collect();
            kept.reverse();
            state.entries = kept;
            state.entries.shrink_to_fit();
            if state.entries.len() != before {
                state.touch();
            }
            tracing::debug!(
                removed = before - state.entries.len(),
                "Optimized file vector store"
            );
            Ok(())
        })
    }

    async fn verify(&self) -> VerifyReport {
        let result = self.with_state("verify", |state| {
            let errors = scan_entries(
                state.entries.iter().map(|e| (e.id.as_str(), e.embedding.len())),
                self.dimension(),
            );
            let mut warnings = Vec::new();
            if self.persists() && state.is_dirty() {
                warnings.push("store has unsaved changes".to_string());
            }
            Ok(VerifyReport::new(state.entries.len(), errors, warnings))
        });
        result.unwrap_or_else(|e| VerifyReport::failed(e.to_string()))
    }
}

impl Drop for FileVectorStore {
    fn drop(&mut self) {
        if self.persists() && self.has_unsaved_changes() {
            tracing::warn!(
                path = %self.path.display(),
                "File vector store dropped with unsaved changes"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(content_type: &str) -> FragmentMetadata {
        FragmentMetadata::new()
            .with_document_id("doc")
            .with_content_type(content_type)
    }

    async fn ready_store(dimension: usize) -> FileVectorStore {
        let store = FileVectorStore::in_memory("test-model", dimension);
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_not_ready_before_initialize() {
        let store = FileVectorStore::in_memory("m", 2);
        assert!(!store.is_ready());
        let err = store.insert("a", "c", &[1.0, 0.0], meta("t")).await;
        assert!(matches!(err, Err(Error::NotReady(_))));
        assert!(matches!(store.get("a").await, Err(Error::NotReady(_))));
        assert!(matches!(
            store.search(&[1.0, 0.0], &SearchOptions::new()).await,
            Err(Error::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_replaces_same_id() {
        let store = ready_store(2).await;
        store.insert("a", "first", &[1.0, 0.0], meta("t")).await.unwrap();
        store.insert("a", "second", &[0.0, 1.0], meta("t")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let entry = store.get("a").await.unwrap().unwrap();
        assert_eq!(entry.content, "second");
        assert_eq!(entry.embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_dimension_fixed_at_first_insert() {
        let store = ready_store(0).await;
        store.insert("a", "c", &[1.0, 2.0, 3.0], meta("t")).await.unwrap();
        assert_eq!(store.dimension(), 3);
        let err = store.insert("b", "c", &[1.0], meta("t")).await;
        assert!(matches!(
            err,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_insert_batch_rejects_whole_batch() {
        let store = ready_store(2).await;
        let batch = vec![
            BatchEntry {
                id: "ok".into(),
                content: "c".into(),
                embedding: vec![1.0, 0.0],
                metadata: meta("t"),
            },
            BatchEntry {
                id: "bad".into(),
                content: "c".into(),
                embedding: vec![1.0],
                metadata: meta("t"),
            },
        ];
        assert!(store.insert_batch(batch).await.is_err());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_chunking_unsupported() {
        let store = ready_store(2).await;
        assert!(!store.supports_chunking());
        let err = store
            .insert_large_document("doc", "content", FragmentMetadata::new(), 4)
            .await;
        assert!(matches!(err, Err(Error::Unsupported { .. })));
        assert!(store.retrieve_large_document("doc").await.is_err());
        assert!(store.get_document_chunks("doc").await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vectors.json");

        let store = FileVectorStore::with_path(&path, "m", 2);
        store.initialize().await.unwrap();
        store.insert("a", "alpha", &[1.0, 0.0], meta("markdown")).await.unwrap();
        assert!(store.has_unsaved_changes());
        store.save().await.unwrap();
        assert!(!store.has_unsaved_changes());

        let reopened = FileVectorStore::with_path(&path, "m", 2);
        reopened.initialize().await.unwrap();
        let entry = reopened.get("a").await.unwrap().unwrap();
        assert_eq!(entry.content, "alpha");
        assert_eq!(entry.metadata.content_type(), Some("markdown"));
    }

    #[tokio::test]
    async fn test_snapshot_has_interchange_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.json");
        let store = FileVectorStore::with_path(&path, "m", 2);
        store.initialize().await.unwrap();
        store.insert("a", "alpha", &[1.0, 0.0], meta("t")).await.unwrap();
        store.close().await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert_eq!(raw["embeddingModel"], "m");
        assert_eq!(raw["dimension"], 2);
        assert_eq!(raw["totalChunks"], 1);
        assert!(raw["entries"].is_array());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileVectorStore::with_path(&path, "m", 2);
        store.initialize().await.unwrap();
        assert!(store.is_ready());
        assert!(store.is_empty().await.unwrap());

        // The unreadable file survives a later save of the degraded store
        store.insert("new", "fresh", &[1.0, 0.0], meta("t")).await.unwrap();
        store.close().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(store.corrupt_path()).unwrap(),
            "{ not json"
        );
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["entries"][0]["id"], "new");
    }

    #[tokio::test]
    async fn test_snapshot_with_loose_metadata_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.json");
        let snapshot = serde_json::json!({
            "version": "1.0",
            "embeddingModel": "m",
            "dimension": 2,
            "totalChunks": 2,
            "createdAt": 1,
            "updatedAt": 2,
            "entries": [
                {
                    "id": "keep",
                    "content": "kept",
                    "embedding": [1.0, 0.0],
                    "metadata": { "document_id": "doc" }
                },
                {
                    "id": "loose",
                    "content": "numbers and nulls",
                    "embedding": [0.0, 1.0],
                    "metadata": { "section": 2, "author": null }
                }
            ]
        });
        std::fs::write(&path, snapshot.to_string()).unwrap();

        let store = FileVectorStore::with_path(&path, "m", 2);
        store.initialize().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let loose = store.get("loose").await.unwrap().unwrap();
        assert!(loose.metadata.field_matches("section", &[2_i64.into()]));
        assert!(!loose.metadata.extra.contains_key("author"));

        let sections = store
            .search(
                &[0.0, 1.0],
                &SearchOptions::new().with_filter("section", [2_i64]),
            )
            .await
            .unwrap();
        assert_eq!(sections.ids(), vec!["loose"]);
        assert!(!store.corrupt_path().exists());
    }

    #[tokio::test]
    async fn test_close_makes_store_not_ready() {
        let store = ready_store(2).await;
        store.close().await.unwrap();
        assert!(!store.is_ready());
        assert!(matches!(store.count().await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = ready_store(2).await;
        store.insert("a", "c", &[1.0, 0.0], meta("t")).await.unwrap();
        store.insert("b", "c", &[1.0, 0.0], meta("t")).await.unwrap();
        store
            .insert("c", "c", &[1.0, 0.0], FragmentMetadata::new().with_document_id("other"))
            .await
            .unwrap();
        assert_eq!(store.delete_document("doc").await.unwrap(), 2);
        assert_eq!(store.list_ids().await.unwrap(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_verify_reports_unsaved_changes() {
        let dir = TempDir::new().unwrap();
        let store = FileVectorStore::with_path(dir.path().join("v.json"), "m", 2);
        store.initialize().await.unwrap();
        store.insert("a", "c", &[1.0, 0.0], meta("t")).await.unwrap();

        let report = store.verify().await;
        assert!(report.valid);
        assert_eq!(report.checked, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_before_initialize_does_not_fail() {
        let store = FileVectorStore::in_memory("m", 2);
        let report = store.verify().await;
        assert!(!report.valid);
    }
}
