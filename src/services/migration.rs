//! Migration service.
//!
//! Copies every entry from one store to another, whatever the two backends
//! are. A run has three phases:
//!
//! 1. **Prepare**: read source stats, refuse an empty source, optionally clear
//!    the target.
//! 2. **Migrate**: export the source and upsert each entry into the target in
//!    fixed-size batches, pausing between batches. A failing entry is recorded
//!    and the run continues.
//! 3. **Verify**: compare entry count, dimension and embedding model of both
//!    stores. Mismatches are reported, never raised.

use crate::Result;
use crate::models::{StoreStats, VectorEntry};
use crate::storage::VectorStore;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default number of entries per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of processed entries between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Default pause between batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(50);

/// Options for a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Remove everything from the target before copying.
    pub clear_target: bool,
    /// Entries per batch.
    pub batch_size: usize,
    /// Processed entries between progress reports.
    pub progress_interval: usize,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Compare source and target stats after the run.
    pub verify: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clear_target: false,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            batch_delay: DEFAULT_BATCH_DELAY,
            verify: true,
        }
    }

    /// Sets the `clear_target` option.
    #[must_use]
    pub const fn with_clear_target(mut self, clear_target: bool) -> Self {
        self.clear_target = clear_target;
        self
    }

    /// Sets the batch size (at least 1).
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// Sets the progress interval (at least 1).
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = if interval == 0 { 1 } else { interval };
        self
    }

    /// Sets the pause between batches.
    #[must_use]
    pub const fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Sets the verify option.
    #[must_use]
    pub const fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Progress snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationProgress {
    /// Entries attempted so far.
    pub processed: usize,
    /// Entries written so far.
    pub migrated: usize,
    /// Entries that failed so far.
    pub failed: usize,
    /// Entries in the source export.
    pub total: usize,
}

impl MigrationProgress {
    /// Completion in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

/// One entry that could not be written to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationErrorEntry {
    /// Entry id.
    pub id: String,
    /// Failure message.
    pub error: String,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    /// Entries written to the target.
    pub migrated_chunks: usize,
    /// Entries in the source export.
    pub total: usize,
    /// Per-entry failures.
    pub errors: Vec<MigrationErrorEntry>,
    /// Post-run stat mismatches between source and target.
    pub discrepancies: Vec<String>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl MigrationResult {
    /// True when every entry was written.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "migrated {}/{} entries in {:.2}s ({} errors, {} discrepancies)",
            self.migrated_chunks,
            self.total,
            self.duration.as_secs_f64(),
            self.errors.len(),
            self.discrepancies.len()
        )
    }
}

type ProgressCallback = Box<dyn Fn(MigrationProgress) + Send + Sync>;

/// Service that copies entries between stores.
///
/// # Example
///
/// ```rust,ignore
/// use vectorvault::{MigrationOptions, MigrationService};
///
/// let service = MigrationService::new(MigrationOptions::new().with_clear_target(true))
///     .with_progress(|p| println!("{:.0}%", p.percent()));
/// let result = service.migrate(source.as_ref(), target.as_ref()).await?;
/// assert!(result.success());
/// ```
pub struct MigrationService {
    options: MigrationOptions,
    progress: Option<ProgressCallback>,
}

impl Default for MigrationService {
    fn default() -> Self {
        Self::new(MigrationOptions::default())
    }
}

impl MigrationService {
    /// Creates a service with the given options.
    #[must_use]
    pub fn new(options: MigrationOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    /// Registers a progress callback.
    #[must_use]
    pub fn with_progress(
        mut self,
        callback: impl Fn(MigrationProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Copies every entry of `source` into `target`.
    ///
    /// Both stores must be initialized.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the source is empty, and propagates failures
    /// of the source export or the target clear. Failures of individual
    /// entries are collected in `errors`, and a failed final target save is
    /// reported in `discrepancies`, so the counts always come back.
    #[instrument(
        skip(self, source, target),
        fields(source_backend = %source.backend(), target_backend = %target.backend())
    )]
    pub async fn migrate(
        &self,
        source: &dyn VectorStore,
        target: &dyn VectorStore,
    ) -> Result<MigrationResult> {
        let start = Instant::now();

        let source_stats = source.get_stats().await?;
        if source_stats.total_chunks == 0 {
            return Err(crate::Error::InvalidInput(
                "migration source store is empty".to_string(),
            ));
        }
        if self.options.clear_target {
            tracing::info!(target_backend = %target.backend(), "Clearing migration target");
            target.clear().await?;
        }

        let document = source.export().await?;
        let mut result = MigrationResult {
            total: document.entries.len(),
            ..MigrationResult::default()
        };

        self.copy_entries(document.entries, target, &mut result).await;
        if let Err(e) = target.save().await {
            result.discrepancies.push(format!("target save failed: {e}"));
        }

        if self.options.verify {
            match target.get_stats().await {
                Ok(target_stats) => {
                    result
                        .discrepancies
                        .extend(compare_stats(&source_stats, &target_stats));
                },
                Err(e) => result
                    .discrepancies
                    .push(format!("target stats unavailable: {e}")),
            }
            for discrepancy in &result.discrepancies {
                tracing::warn!(discrepancy = %discrepancy, "Migration verification mismatch");
            }
        }

        result.duration = start.elapsed();
        tracing::info!(
            migrated = result.migrated_chunks,
            total = result.total,
            errors = result.errors.len(),
            discrepancies = result.discrepancies.len(),
            duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            "Migration finished"
        );
        Ok(result)
    }

    async fn copy_entries(
        &self,
        entries: Vec<VectorEntry>,
        target: &dyn VectorStore,
        result: &mut MigrationResult,
    ) {
        // Fields are public, so a literal can bypass the clamping builders
        let batch_size = self.options.batch_size.max(1);
        let progress_interval = self.options.progress_interval.max(1);
        let batch_count = entries.len().div_ceil(batch_size);
        let mut processed = 0usize;
        let mut entries = entries.into_iter();

        for batch_index in 0..batch_count {
            if batch_index > 0 && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }

            for entry in entries.by_ref().take(batch_size) {
                let id = entry.id.clone();
                match target.upsert(entry).await {
                    Ok(()) => {
                        result.migrated_chunks += 1;
                        metrics::counter!("migration_entries_total", "outcome" => "success")
                            .increment(1);
                    },
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "Failed to migrate entry");
                        metrics::counter!("migration_entries_total", "outcome" => "failure")
                            .increment(1);
                        result.errors.push(MigrationErrorEntry {
                            id,
                            error: e.to_string(),
                        });
                    },
                }

                processed += 1;
                if processed % progress_interval == 0 || processed == result.total {
                    self.report(MigrationProgress {
                        processed,
                        migrated: result.migrated_chunks,
                        failed: result.errors.len(),
                        total: result.total,
                    });
                }
            }
        }
    }

    fn report(&self, progress: MigrationProgress) {
        tracing::debug!(
            processed = progress.processed,
            total = progress.total,
            failed = progress.failed,
            "Migration progress"
        );
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

/// Lists the stat fields that differ between source and target.
#[must_use]
pub fn compare_stats(source: &StoreStats, target: &StoreStats) -> Vec<String> {
    let mut discrepancies = Vec::new();
    if source.total_chunks != target.total_chunks {
        discrepancies.push(format!(
            "total_chunks: source {} vs target {}",
            source.total_chunks, target.total_chunks
        ));
    }
    if source.dimension != target.dimension {
        discrepancies.push(format!(
            "dimension: source {} vs target {}",
            source.dimension, target.dimension
        ));
    }
    if source.embedding_model != target.embedding_model {
        discrepancies.push(format!(
            "embedding_model: source '{}' vs target '{}'",
            source.embedding_model, target.embedding_model
        ));
    }
    discrepancies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FragmentMetadata;
    use crate::storage::{FileVectorStore, SqliteVectorStore};
    use std::sync::{Arc, Mutex};

    fn fast() -> MigrationOptions {
        MigrationOptions::new().with_batch_delay(Duration::ZERO)
    }

    async fn seeded_source(count: usize) -> FileVectorStore {
        let store = FileVectorStore::in_memory("model", 3);
        store.initialize().await.unwrap();
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32;
            store
                .insert(
                    &format!("e{i:03}"),
                    &format!("content {i}"),
                    &[1.0, x, 0.5],
                    FragmentMetadata::new().with_document_id(format!("doc-{}", i % 4)),
                )
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn test_migration_options_defaults() {
        let options = MigrationOptions::default();
        assert!(!options.clear_target);
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.progress_interval, 10);
        assert_eq!(options.batch_delay, Duration::from_millis(50));
        assert!(options.verify);
    }

    #[test]
    fn test_migration_options_builders() {
        let options = MigrationOptions::new()
            .with_clear_target(true)
            .with_batch_size(0)
            .with_progress_interval(0)
            .with_verify(false);
        assert!(options.clear_target);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.progress_interval, 1);
        assert!(!options.verify);
    }

    #[tokio::test]
    async fn test_zero_sizes_in_literal_options_are_clamped() {
        let source = seeded_source(3).await;
        let target = FileVectorStore::in_memory("model", 3);
        target.initialize().await.unwrap();

        let options = MigrationOptions {
            batch_size: 0,
            progress_interval: 0,
            ..fast()
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let result = MigrationService::new(options)
            .with_progress(move |p| sink.lock().unwrap().push(p.processed))
            .migrate(&source, &target)
            .await
            .unwrap();

        assert_eq!(result.migrated_chunks, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_target_save_keeps_counts() {
        let dir = tempfile::TempDir::new().unwrap();
        // A regular file where the snapshot's parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let target = FileVectorStore::with_path(blocker.join("vectors.json"), "model", 3);
        target.initialize().await.unwrap();

        let source = seeded_source(4).await;
        let result = MigrationService::new(fast())
            .migrate(&source, &target)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.migrated_chunks, 4);
        assert_eq!(result.total, 4);
        assert_eq!(result.discrepancies.len(), 1, "{:?}", result.discrepancies);
        assert!(result.discrepancies[0].starts_with("target save failed"));
    }

    #[test]
    fn test_progress_percent() {
        let progress = MigrationProgress {
            processed: 25,
            migrated: 25,
            failed: 0,
            total: 100,
        };
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_source_fails_fast() {
        let source = FileVectorStore::in_memory("model", 3);
        source.initialize().await.unwrap();
        let target = SqliteVectorStore::in_memory("model", 3);
        target.initialize().await.unwrap();

        let err = MigrationService::new(fast())
            .migrate(&source, &target)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_migrate_file_to_sqlite() {
        let source = seeded_source(25).await;
        let target = SqliteVectorStore::in_memory("model", 3);
        target.initialize().await.unwrap();

        let result = MigrationService::new(fast().with_batch_size(10))
            .migrate(&source, &target)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.migrated_chunks, 25);
        assert_eq!(result.total, 25);
        assert!(result.discrepancies.is_empty(), "{:?}", result.discrepancies);
        assert_eq!(target.count().await.unwrap(), 25);
        assert_eq!(target.get("e007").await.unwrap(), source.get("e007").await.unwrap());
    }

    #[tokio::test]
    async fn test_progress_reported_every_interval() {
        let source = seeded_source(25).await;
        let target = FileVectorStore::in_memory("model", 3);
        target.initialize().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        MigrationService::new(fast())
            .with_progress(move |p| sink.lock().unwrap().push(p.processed))
            .migrate(&source, &target)
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 25]);
    }

    #[tokio::test]
    async fn test_entry_failures_do_not_abort() {
        let source = seeded_source(5).await;

        // A target fixed to another dimension rejects every entry.
        let narrow = FileVectorStore::in_memory("model", 2);
        narrow.initialize().await.unwrap();
        let result = MigrationService::new(fast())
            .migrate(&source, &narrow)
            .await
            .unwrap();

        assert!(!result.success());
        assert_eq!(result.migrated_chunks, 0);
        assert_eq!(result.errors.len(), 5);
        assert_eq!(result.errors[0].id, "e000");
        assert!(result.discrepancies.iter().any(|d| d.starts_with("total_chunks")));
    }

    #[tokio::test]
    async fn test_clear_target_and_model_discrepancy() {
        let source = seeded_source(3).await;
        let target = FileVectorStore::in_memory("other-model", 3);
        target.initialize().await.unwrap();
        target
            .insert("stale", "old", &[0.0, 1.0, 0.0], FragmentMetadata::new())
            .await
            .unwrap();

        let result = MigrationService::new(fast().with_clear_target(true))
            .migrate(&source, &target)
            .await
            .unwrap();

        assert!(result.success());
        assert!(target.get("stale").await.unwrap().is_none());
        assert_eq!(result.discrepancies.len(), 1);
        assert!(result.discrepancies[0].starts_with("embedding_model"));
    }

    #[test]
    fn test_compare_stats_identical() {
        let stats = StoreStats {
            total_chunks: 1,
            embedding_model: "m".to_string(),
            dimension: 2,
            created_at: 0,
            updated_at: 0,
            documents: std::collections::BTreeMap::new(),
            content_types: std::collections::BTreeMap::new(),
            backend: crate::config::BackendKind::InMemoryFile,
        };
        assert!(compare_stats(&stats, &stats.clone()).is_empty());
    }
}
