//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `store.rs`: store inspection and housekeeping (stats, verify, optimize)
//! - `io.rs`: interchange export/import
//! - `search.rs`: similarity search with metadata filters
//! - `migrate.rs`: cross-backend migration
//! - `config.rs`: configuration display

mod config;
mod io;
mod migrate;
mod search;
mod store;

use anyhow::Context;
use vectorvault::{StoreConfig, StoreFactory, VectorStore};

// Re-export command functions
pub use config::cmd_config;
pub use io::{cmd_export, cmd_import};
pub use migrate::cmd_migrate;
pub use search::cmd_search;
pub use store::{cmd_optimize, cmd_stats, cmd_verify};

/// Builds and initializes the configured store.
async fn open_store(config: &StoreConfig) -> anyhow::Result<Box<dyn VectorStore>> {
    StoreFactory::create_initialized(config)
        .await
        .with_context(|| format!("failed to open {} store", config.backend))
}

/// Closes a store, flushing pending state.
async fn close_store(store: Box<dyn VectorStore>) -> anyhow::Result<()> {
    store.close().await.context("failed to close store")
}
