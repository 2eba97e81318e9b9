//! Config command handler.
//!
//! Contains the implementation of the `config` CLI command and
//! display helpers for configuration output.

use vectorvault::StoreConfig;
use vectorvault::config::{BackendKind, default_config_path};

/// Config command.
pub fn cmd_config(config: &StoreConfig, show: bool) -> anyhow::Result<()> {
    if !show {
        match default_config_path() {
            Some(path) => println!("Default config file: {}", path.display()),
            None => println!("No default config location on this platform"),
        }
        println!("Use --show to display the effective configuration");
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Backend: {}", config.backend);
    println!("Embedding Model: {}", config.embedding_model);
    println!(
        "Dimension: {}",
        if config.dimension == 0 {
            "(fixed at first insert)".to_string()
        } else {
            config.dimension.to_string()
        }
    );
    println!();

    match config.backend {
        BackendKind::InMemoryFile => {
            let file = config.file_config();
            println!("File Store:");
            println!("  Path: {}", file.path.display());
        },
        BackendKind::EmbeddedRelational => {
            let sqlite = config.sqlite_config();
            println!("SQLite Store:");
            println!("  Path: {}", sqlite.path.display());
            println!("  WAL: {}", sqlite.wal);
            println!("  Cache Size: {} KiB", sqlite.cache_size_kib);
        },
        BackendKind::ServerRelational => {
            let pg = config.postgres_config();
            println!("PostgreSQL Store:");
            println!("  URL: {}", pg.redacted_url());
            println!("  SSL: {}", pg.ssl);
            println!("  Pool Size: {}", pg.pool_size);
            println!("  Connect Timeout: {}s", pg.connect_timeout_secs);
            println!("  Tables: {}, {}", pg.embeddings_table(), pg.chunks_table());
        },
    }

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {e}");
    }

    Ok(())
}
