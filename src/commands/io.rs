//! Import and export command handlers.

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use vectorvault::StoreConfig;

use super::{close_store, open_store};

/// Executes the export command.
///
/// Writes the interchange document to `file`, or to stdout for `-`.
pub async fn cmd_export(config: &StoreConfig, file: &Path) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let document = store.export().await;
    close_store(store).await?;
    let document = document?;

    let content = serde_json::to_vec_pretty(&document)?;
    if file.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&content)?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }

    tokio::fs::write(file, &content)
        .await
        .with_context(|| format!("failed to write {}", file.display()))?;
    eprintln!(
        "Exported {} entries to {}",
        document.total_chunks,
        file.display()
    );
    Ok(())
}

/// Executes the import command.
pub async fn cmd_import(config: &StoreConfig, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let store = open_store(config).await?;
    let imported = store.import_json(value).await;
    let saved = match &imported {
        Ok(_) => store.save().await,
        Err(_) => Ok(()),
    };
    close_store(store).await?;
    let imported = imported?;
    saved?;

    println!("Imported {imported} entries from {}", file.display());
    Ok(())
}
