//! Connection handling for the `SQLite` backend.

use crate::config::SqliteStoreConfig;
use crate::{Error, Result};
use rusqlite::Connection;

/// Configures a `SQLite` connection for the vector store workload.
///
/// # Configuration Applied
///
/// - **WAL mode** (when enabled): concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: waits up to 5 seconds on lock contention
/// - **`cache_size`**: page cache budget in KiB
/// - **`foreign_keys`**: on
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a pragma that must hold cannot be set.
pub fn configure_connection(conn: &Connection, config: &SqliteStoreConfig) -> Result<()> {
    // journal_mode returns a row ("wal", or "memory" for in-memory databases),
    // so the result is ignored instead of going through execute_batch
    if config.wal {
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
    }
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    // Negative cache_size is interpreted as KiB
    conn.pragma_update(None, "cache_size", -i64::from(config.cache_size_kib))
        .map_err(|e| Error::operation("configure_cache_size", e))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::operation("configure_foreign_keys", e))?;

    Ok(())
}

/// Opens the database described by `config`.
///
/// Creates parent directories for file databases.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be opened.
pub fn open_connection(config: &SqliteStoreConfig) -> Result<Connection> {
    if config.is_in_memory() {
        return Connection::open_in_memory().map_err(|e| Error::operation("open_sqlite_in_memory", e));
    }

    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_sqlite_dir", e))?;
    }
    Connection::open(&config.path).map_err(|e| Error::operation("open_sqlite", e))
}

/// Opens and configures a connection, checking the file is a usable database.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be opened, is not a
/// database, or rejects configuration.
pub fn open_configured(config: &SqliteStoreConfig) -> Result<Connection> {
    let conn = open_connection(config)?;
    // Opening is lazy; the first read surfaces "file is not a database"
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| Error::operation("read_sqlite_schema", e))?;
    configure_connection(&conn, config)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configure_connection() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, &SqliteStoreConfig::in_memory()).unwrap();

        // In-memory databases cannot use WAL and report "memory"
        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert!(
            journal_mode.eq_ignore_ascii_case("wal") || journal_mode.eq_ignore_ascii_case("memory"),
            "unexpected journal mode '{journal_mode}'"
        );

        let synchronous: i32 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .unwrap();
        assert_eq!(synchronous, 1);

        let busy_timeout: i32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 5000);
    }

    #[test]
    fn test_open_configured_file_uses_wal() {
        let dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig {
            path: dir.path().join("sub").join("v.db"),
            ..SqliteStoreConfig::default()
        };
        let conn = open_configured(&config).unwrap();
        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert!(journal_mode.eq_ignore_ascii_case("wal"));
    }

    #[test]
    fn test_open_configured_rejects_garbage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![0x42_u8; 4096]).unwrap();
        let config = SqliteStoreConfig {
            path,
            ..SqliteStoreConfig::default()
        };
        assert!(open_configured(&config).is_err());
    }
}
