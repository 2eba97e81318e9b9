//! Store inspection command handlers.

use chrono::{TimeZone, Utc};
use vectorvault::StoreConfig;

use super::{close_store, open_store};

/// Stats command.
pub async fn cmd_stats(config: &StoreConfig, json: bool) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let stats = store.get_stats().await;
    close_store(store).await?;
    let stats = stats?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Store Statistics");
    println!("================");
    println!("Backend: {}", stats.backend);
    println!("Embedding Model: {}", stats.embedding_model);
    println!("Dimension: {}", stats.dimension);
    println!("Entries: {}", stats.total_chunks);
    println!("Created: {}", format_millis(stats.created_at));
    println!("Updated: {}", format_millis(stats.updated_at));

    if !stats.documents.is_empty() {
        println!();
        println!("Documents ({}):", stats.documents.len());
        for (document_id, count) in &stats.documents {
            println!("  {document_id}: {count}");
        }
    }
    if !stats.content_types.is_empty() {
        println!();
        println!("Content Types:");
        for (content_type, count) in &stats.content_types {
            println!("  {content_type}: {count}");
        }
    }

    Ok(())
}

/// Verify command.
///
/// Fails when the report is invalid so scripts can rely on the exit code.
pub async fn cmd_verify(config: &StoreConfig, json: bool) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let report = store.verify().await;
    close_store(store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Checked {} entries: {}",
            report.checked,
            if report.valid { "valid" } else { "INVALID" }
        );
        for error in &report.errors {
            println!("  error: {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }

    report.into_result()?;
    Ok(())
}

/// Optimize command.
pub async fn cmd_optimize(config: &StoreConfig) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let result = store.optimize().await;
    close_store(store).await?;
    result?;

    println!("Optimized {} store", config.backend);
    Ok(())
}

fn format_millis(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map_or_else(|| millis.to_string(), |ts| ts.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_millis(i64::MAX), i64::MAX.to_string());
    }
}
