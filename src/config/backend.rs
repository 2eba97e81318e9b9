//! Backend discriminator and per-backend connection settings.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// The concrete storage engine behind a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Whole collection in memory, persisted as one JSON snapshot.
    #[default]
    #[serde(rename = "in-memory-file", alias = "file", alias = "memory")]
    InMemoryFile,
    /// Single-file `SQLite` database.
    #[serde(rename = "embedded-relational", alias = "sqlite")]
    EmbeddedRelational,
    /// PostgreSQL with the pgvector extension.
    #[serde(
        rename = "server-relational",
        alias = "postgres",
        alias = "postgresql",
        alias = "pgvector"
    )]
    ServerRelational,
}

impl BackendKind {
    /// All backends, smallest scale first.
    pub const ALL: [Self; 3] = [
        Self::InMemoryFile,
        Self::EmbeddedRelational,
        Self::ServerRelational,
    ];

    /// Returns the configuration name of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InMemoryFile => "in-memory-file",
            Self::EmbeddedRelational => "embedded-relational",
            Self::ServerRelational => "server-relational",
        }
    }

    /// Parses a backend name, accepting the short aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in-memory-file" | "file" | "memory" => Some(Self::InMemoryFile),
            "embedded-relational" | "sqlite" => Some(Self::EmbeddedRelational),
            "server-relational" | "postgres" | "postgresql" | "pgvector" => {
                Some(Self::ServerRelational)
            },
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| crate::Error::InvalidInput(format!("unknown backend '{s}'")))
    }
}

/// Settings for the in-memory/file-backed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Snapshot file location.
    pub path: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: super::default_data_dir().join("vectors.json"),
        }
    }
}

/// Settings for the embedded `SQLite` store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file location (`:memory:` for a throwaway database).
    pub path: PathBuf,
    /// Enable write-ahead logging.
    #[serde(default = "default_true")]
    pub wal: bool,
    /// Page cache size in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
}

impl SqliteStoreConfig {
    /// Path marker for an in-memory database.
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Configuration for a non-persistent database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(Self::IN_MEMORY),
            ..Self::default()
        }
    }

    /// Returns true if this points at an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == Self::IN_MEMORY
    }
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: super::default_data_dir().join("vectors.db"),
            wal: true,
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

/// Settings for the PostgreSQL + pgvector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStoreConfig {
    /// Server host.
    #[serde(default = "default_pg_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_pg_port")]
    pub port: u16,
    /// Database name.
    #[serde(default = "default_pg_database")]
    pub database: String,
    /// Role name.
    #[serde(default = "default_pg_user")]
    pub user: String,
    /// Role password.
    #[serde(default, with = "optional_secret_serde")]
    pub password: Option<SecretString>,
    /// Require TLS (needs the `postgres-tls` feature).
    #[serde(default)]
    pub ssl: bool,
    /// Maximum pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Connect/checkout timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Prefix for the `embeddings` and `document_chunks` tables.
    #[serde(default)]
    pub table_prefix: String,
}

impl PostgresStoreConfig {
    /// Connection timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Name of the entries table.
    #[must_use]
    pub fn embeddings_table(&self) -> String {
        format!("{}embeddings", self.table_prefix)
    }

    /// Name of the large-document chunks table.
    #[must_use]
    pub fn chunks_table(&self) -> String {
        format!("{}document_chunks", self.table_prefix)
    }

    /// Connection summary safe for logs.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let auth = if self.password.is_some() { ":***" } else { "" };
        format!(
            "postgresql://{}{auth}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    /// Returns the password, if any.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Builds settings from a `postgresql://` URL or key/value string.
    ///
    /// Fields the URL leaves out keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the string cannot be parsed.
    #[cfg(feature = "postgres")]
    pub fn from_url(url: &str) -> crate::Result<Self> {
        let parsed = url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| crate::Error::InvalidInput(format!("invalid PostgreSQL URL: {e}")))?;

        let mut config = Self::default();
        if let Some(host) = parsed.get_hosts().first() {
            config.host = host_to_string(host);
        }
        if let Some(port) = parsed.get_ports().first() {
            config.port = *port;
        }
        if let Some(user) = parsed.get_user() {
            config.user = user.to_string();
        }
        if let Some(password) = parsed.get_password() {
            config.password = Some(SecretString::from(
                String::from_utf8_lossy(password).to_string(),
            ));
        }
        if let Some(dbname) = parsed.get_dbname() {
            config.database = dbname.to_string();
        }
        config.ssl = matches!(parsed.get_ssl_mode(), tokio_postgres::config::SslMode::Require);
        if let Some(timeout) = parsed.get_connect_timeout() {
            config.connect_timeout_secs = timeout.as_secs().max(1);
        }
        Ok(config)
    }
}

#[cfg(all(feature = "postgres", unix))]
fn host_to_string(h: &tokio_postgres::config::Host) -> String {
    match h {
        tokio_postgres::config::Host::Tcp(s) => s.clone(),
        tokio_postgres::config::Host::Unix(p) => p.to_string_lossy().to_string(),
    }
}

#[cfg(all(feature = "postgres", not(unix)))]
fn host_to_string(h: &tokio_postgres::config::Host) -> String {
    let tokio_postgres::config::Host::Tcp(s) = h;
    s.clone()
}

impl Default for PostgresStoreConfig {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            database: default_pg_database(),
            user: default_pg_user(),
            password: None,
            ssl: false,
            pool_size: default_pool_size(),
            connect_timeout_secs: default_timeout_secs(),
            table_prefix: String::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_cache_size_kib() -> u32 {
    16_384
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

const fn default_pg_port() -> u16 {
    5432
}

fn default_pg_database() -> String {
    "vectorvault".to_string()
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

const fn default_pool_size() -> usize {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Serde module for an optional `SecretString`.
mod optional_secret_serde {
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Never serialize the actual secret
        match secret {
            Some(_) => serializer.serialize_some("***REDACTED***"),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(SecretString::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("file", BackendKind::InMemoryFile)]
    #[test_case("in-memory-file", BackendKind::InMemoryFile)]
    #[test_case("SQLite", BackendKind::EmbeddedRelational)]
    #[test_case("embedded-relational", BackendKind::EmbeddedRelational)]
    #[test_case("pgvector", BackendKind::ServerRelational)]
    #[test_case("server-relational", BackendKind::ServerRelational)]
    fn test_backend_parse(input: &str, expected: BackendKind) {
        assert_eq!(BackendKind::parse(input), Some(expected));
        assert_eq!(input.parse::<BackendKind>().ok(), Some(expected));
    }

    #[test]
    fn test_backend_parse_unknown() {
        assert!(BackendKind::parse("redis").is_none());
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_serde_names() {
        for kind in BackendKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let parsed: BackendKind = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_postgres_password_redacted() {
        let config = PostgresStoreConfig {
            password: Some(SecretString::from("hunter2".to_string())),
            ..PostgresStoreConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
        assert!(!config.redacted_url().contains("hunter2"));
        assert_eq!(config.password(), Some("hunter2"));
    }

    #[test]
    fn test_table_names() {
        let config = PostgresStoreConfig {
            table_prefix: "test_".to_string(),
            ..PostgresStoreConfig::default()
        };
        assert_eq!(config.embeddings_table(), "test_embeddings");
        assert_eq!(config.chunks_table(), "test_document_chunks");
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_postgres_from_url() {
        let config =
            PostgresStoreConfig::from_url("postgresql://alice:pw@db.internal:6543/vectors").unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.user, "alice");
        assert_eq!(config.password(), Some("pw"));
        assert_eq!(config.database, "vectors");
        assert!(!config.ssl);
        assert_eq!(config.pool_size, 10);

        let tls = PostgresStoreConfig::from_url("postgresql://localhost/db?sslmode=require").unwrap();
        assert!(tls.ssl);
    }

    #[test]
    fn test_sqlite_in_memory_marker() {
        assert!(SqliteStoreConfig::in_memory().is_in_memory());
        assert!(!SqliteStoreConfig::default().is_in_memory());
    }
}
