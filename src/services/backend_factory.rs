//! Store factory.
//!
//! Centralizes backend construction so that the CLI, the migration engine and
//! library callers all get a store through one path:
//!
//! ```text
//! StoreFactory
//!   ├── create()             → Box<dyn VectorStore>   (not yet initialized)
//!   ├── create_shared()      → Arc<dyn VectorStore>
//!   ├── create_initialized() → Box<dyn VectorStore>   (initialize() already run)
//!   └── for_preset()         → StoreConfig
//! ```
//!
//! Missing backend sub-configuration is filled with defaults before
//! construction; the configuration is validated first, so a bad config fails
//! here and not on the first query.

use crate::config::{BackendKind, Preset, StoreConfig};
use crate::storage::{FileVectorStore, SqliteVectorStore, VectorStore};
use crate::Result;
use std::sync::Arc;

/// Factory for creating store backends.
///
/// # Example
///
/// ```rust,ignore
/// use vectorvault::{StoreConfig, StoreFactory};
///
/// let config = StoreConfig::sqlite("/tmp/vectors.db").with_dimension(384);
/// let store = StoreFactory::create_initialized(&config).await?;
/// assert!(store.is_ready());
/// ```
pub struct StoreFactory;

impl StoreFactory {
    /// Creates the store selected by `config.backend`.
    ///
    /// The store is returned uninitialized.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the configuration does not validate and
    /// `FeatureNotEnabled` if the selected backend was compiled out.
    pub fn create(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
        if let Err(e) = config.validate() {
            tracing::warn!(
                backend = config.backend.as_str(),
                error = %e,
                "Rejected store configuration"
            );
            return Err(e);
        }

        let store: Box<dyn VectorStore> = match config.backend {
            BackendKind::InMemoryFile => Box::new(FileVectorStore::new(
                &config.file_config(),
                config.embedding_model.clone(),
                config.dimension,
            )),
            BackendKind::EmbeddedRelational => Box::new(SqliteVectorStore::new(
                config.sqlite_config(),
                config.embedding_model.clone(),
                config.dimension,
            )),
            BackendKind::ServerRelational => Self::create_server(config)?,
        };

        tracing::debug!(
            backend = config.backend.as_str(),
            embedding_model = %config.embedding_model,
            dimension = config.dimension,
            "Created store"
        );
        Ok(store)
    }

    /// Creates a store wrapped for sharing across tasks.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub fn create_shared(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
        Self::create(config).map(Arc::from)
    }

    /// Creates a store and runs `initialize()` on it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], plus any initialization failure of the backend.
    pub async fn create_initialized(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
        let store = Self::create(config)?;
        if let Err(e) = store.initialize().await {
            tracing::warn!(
                backend = config.backend.as_str(),
                error = %e,
                "Store initialization failed"
            );
            return Err(e);
        }
        Ok(store)
    }

    /// Recommended configuration for a preset.
    #[must_use]
    pub fn for_preset(
        preset: Preset,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> StoreConfig {
        StoreConfig::from_preset(preset, embedding_model, dimension)
    }

    #[cfg(feature = "postgres")]
    fn create_server(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
        Ok(Box::new(crate::storage::PgvectorStore::new(
            config.postgres_config(),
            config.embedding_model.clone(),
            config.dimension,
        )))
    }

    #[cfg(not(feature = "postgres"))]
    fn create_server(_config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
        tracing::warn!("server-relational backend requested but postgres feature is disabled");
        Err(crate::Error::FeatureNotEnabled("postgres".to_string()))
    }
}
