//! Services built on top of the store contract.
//!
//! - [`StoreFactory`]: builds a backend from a [`crate::StoreConfig`]
//! - [`MigrationService`]: copies all entries between two stores

mod backend_factory;
mod migration;

pub use backend_factory::StoreFactory;
pub use migration::{
    DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL, MigrationErrorEntry,
    MigrationOptions, MigrationProgress, MigrationResult, MigrationService, compare_stats,
};
