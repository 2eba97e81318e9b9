//! Migration command handler.
//!
//! Copies every entry of the configured store into a second store described
//! by its own config file, for example when a collection outgrows the
//! file-backed backend.

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use vectorvault::{MigrationOptions, MigrationService, StoreConfig};

use super::{close_store, open_store};

/// Migrate command.
pub async fn cmd_migrate(
    config: &StoreConfig,
    target_config_path: &Path,
    clear_target: bool,
    batch_size: usize,
) -> anyhow::Result<()> {
    let target_config = StoreConfig::load_from_file(target_config_path)
        .with_context(|| format!("failed to load {}", target_config_path.display()))?;

    println!("Migrating entries...");
    println!("Source: {}", config.backend);
    println!("Target: {}", target_config.backend);
    println!("Clear target: {clear_target}");
    println!();

    let source = open_store(config).await?;
    let target = match open_store(&target_config).await {
        Ok(target) => target,
        Err(e) => {
            close_store(source).await?;
            return Err(e);
        },
    };

    let service = MigrationService::new(
        MigrationOptions::new()
            .with_clear_target(clear_target)
            .with_batch_size(batch_size),
    )
    .with_progress(|progress| {
        print!(
            "\rProgress: {}/{} ({:.0}%)",
            progress.processed,
            progress.total,
            progress.percent()
        );
        let _ = std::io::stdout().flush();
    });

    let result = service.migrate(source.as_ref(), target.as_ref()).await;
    close_store(source).await?;
    close_store(target).await?;
    let result = result?;

    println!();
    println!();
    println!("Migration complete!");
    println!("  Migrated: {}", result.migrated_chunks);
    println!("  Errors: {}", result.errors.len());
    println!("  Total: {}", result.total);
    println!("  Duration: {:.2}s", result.duration.as_secs_f64());

    for error in &result.errors {
        println!("  failed {}: {}", error.id, error.error);
    }
    for discrepancy in &result.discrepancies {
        println!("  discrepancy: {discrepancy}");
    }

    if !result.success() {
        anyhow::bail!("{} entries failed to migrate", result.errors.len());
    }
    Ok(())
}
