//! Configuration management.
//!
//! A [`StoreConfig`] selects a backend and carries the embedding model and
//! dimension every stored entry must conform to. It can be built in code, from
//! a [`Preset`], or loaded from a TOML file with `VECTORVAULT_*` environment
//! overrides:
//!
//! ```toml
//! backend = "embedded-relational"
//! embedding_model = "all-MiniLM-L6-v2"
//! dimension = 384
//!
//! [sqlite]
//! path = "/var/lib/vectorvault/vectors.db"
//! wal = true
//! ```

mod backend;

pub use backend::{BackendKind, FileStoreConfig, PostgresStoreConfig, SqliteStoreConfig};

use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;

/// Fragment count below which the file-backed store is recommended.
pub const SMALL_SCALE_LIMIT: usize = 10_000;

/// Fragment count below which the embedded store is recommended.
pub const MEDIUM_SCALE_LIMIT: usize = 100_000;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "VECTORVAULT_";

/// Store selection and conformance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to construct.
    #[serde(default)]
    pub backend: BackendKind,
    /// Embedding model the stored vectors come from.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Embedding dimension; 0 lets schema-less backends fix it at first insert.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// File-backed store settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileStoreConfig>,
    /// Embedded `SQLite` store settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteStoreConfig>,
    /// PostgreSQL store settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresStoreConfig>,
}

/// Recommended configurations keyed to expected fragment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// A few thousand fragments: file-backed store.
    Small,
    /// Tens of thousands: embedded `SQLite` store.
    Medium,
    /// Hundreds of thousands and up: PostgreSQL + pgvector.
    Large,
}

impl Preset {
    /// Picks the preset for an expected number of fragments.
    #[must_use]
    pub const fn for_expected_fragments(count: usize) -> Self {
        if count < SMALL_SCALE_LIMIT {
            Self::Small
        } else if count < MEDIUM_SCALE_LIMIT {
            Self::Medium
        } else {
            Self::Large
        }
    }

    /// Backend used by this preset.
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        match self {
            Self::Small => BackendKind::InMemoryFile,
            Self::Medium => BackendKind::EmbeddedRelational,
            Self::Large => BackendKind::ServerRelational,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

const fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(BackendKind::default())
    }
}

/// Returns the platform data directory for vectorvault.
///
/// Falls back to `./.vectorvault` when no home directory is available.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "vectorvault").map_or_else(
        || PathBuf::from(".vectorvault"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Returns the default config file location.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vectorvault")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl StoreConfig {
    /// Creates a configuration for `backend` with default model and dimension.
    #[must_use]
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            embedding_model: default_embedding_model(),
            dimension: DEFAULT_DIMENSION,
            file: None,
            sqlite: None,
            postgres: None,
        }
    }

    /// Builds the recommended configuration for a preset.
    #[must_use]
    pub fn from_preset(preset: Preset, embedding_model: impl Into<String>, dimension: usize) -> Self {
        let mut config = Self::new(preset.backend())
            .with_embedding_model(embedding_model)
            .with_dimension(dimension);
        match preset {
            Preset::Small => config.file = Some(FileStoreConfig::default()),
            Preset::Medium => {
                config.sqlite = Some(SqliteStoreConfig {
                    wal: true,
                    cache_size_kib: 65_536,
                    ..SqliteStoreConfig::default()
                });
            },
            Preset::Large => {
                config.postgres = Some(PostgresStoreConfig {
                    pool_size: 20,
                    connect_timeout_secs: 30,
                    ..PostgresStoreConfig::default()
                });
            },
        }
        config
    }

    /// Builds the recommended configuration for an expected fragment count.
    #[must_use]
    pub fn for_expected_fragments(
        count: usize,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self::from_preset(Preset::for_expected_fragments(count), embedding_model, dimension)
    }

    /// File-backed store at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(BackendKind::InMemoryFile);
        config.file = Some(FileStoreConfig { path: path.into() });
        config
    }

    /// Embedded store at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(BackendKind::EmbeddedRelational);
        config.sqlite = Some(SqliteStoreConfig {
            path: path.into(),
            ..SqliteStoreConfig::default()
        });
        config
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Sets the dimension.
    #[must_use]
    pub const fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// File settings, defaulted when absent.
    #[must_use]
    pub fn file_config(&self) -> FileStoreConfig {
        self.file.clone().unwrap_or_default()
    }

    /// `SQLite` settings, defaulted when absent.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        self.sqlite.clone().unwrap_or_default()
    }

    /// PostgreSQL settings, defaulted when absent.
    #[must_use]
    pub fn postgres_config(&self) -> PostgresStoreConfig {
        self.postgres.clone().unwrap_or_default()
    }

    /// Checks the settings relevant to the selected backend.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(Error::InvalidInput(
                "embedding_model must not be empty".to_string(),
            ));
        }

        match self.backend {
            BackendKind::InMemoryFile => {
                if self.file_config().path.as_os_str().is_empty() {
                    return Err(Error::InvalidInput("file.path must not be empty".to_string()));
                }
            },
            BackendKind::EmbeddedRelational => {
                if self.sqlite_config().path.as_os_str().is_empty() {
                    return Err(Error::InvalidInput(
                        "sqlite.path must not be empty".to_string(),
                    ));
                }
            },
            BackendKind::ServerRelational => {
                let pg = self.postgres_config();
                if self.dimension == 0 {
                    return Err(Error::InvalidInput(
                        "server-relational backend requires a fixed dimension".to_string(),
                    ));
                }
                if pg.pool_size == 0 {
                    return Err(Error::InvalidInput(
                        "postgres.pool_size must be at least 1".to_string(),
                    ));
                }
                if pg.host.is_empty() || pg.database.is_empty() {
                    return Err(Error::InvalidInput(
                        "postgres.host and postgres.database are required".to_string(),
                    ));
                }
            },
        }

        Ok(())
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })
    }

    /// Loads configuration the way the CLI does.
    ///
    /// Reads `.env` if present, then the explicit file or the default config
    /// location (falling back to defaults), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::load_from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `VECTORVAULT_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(backend) = var("BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding_model = model;
        }
        if let Some(dimension) = var("DIMENSION") {
            self.dimension = parse_number("DIMENSION", &dimension)?;
        }
        if let Some(path) = var("FILE_PATH") {
            self.file = Some(FileStoreConfig { path: path.into() });
        }
        if let Some(path) = var("SQLITE_PATH") {
            let mut sqlite = self.sqlite_config();
            sqlite.path = path.into();
            self.sqlite = Some(sqlite);
        }

        let pg_keys = [
            "PG_HOST",
            "PG_PORT",
            "PG_DATABASE",
            "PG_USER",
            "PG_PASSWORD",
            "PG_SSL",
            "PG_POOL_SIZE",
        ];
        if pg_keys.iter().any(|key| var(key).is_some()) {
            let mut pg = self.postgres_config();
            if let Some(host) = var("PG_HOST") {
                pg.host = host;
            }
            if let Some(port) = var("PG_PORT") {
                pg.port = parse_number("PG_PORT", &port)?;
            }
            if let Some(database) = var("PG_DATABASE") {
                pg.database = database;
            }
            if let Some(user) = var("PG_USER") {
                pg.user = user;
            }
            if let Some(password) = var("PG_PASSWORD") {
                pg.password = Some(SecretString::from(password));
            }
            if let Some(ssl) = var("PG_SSL") {
                pg.ssl = matches!(ssl.to_lowercase().as_str(), "1" | "true" | "yes" | "require");
            }
            if let Some(pool_size) = var("PG_POOL_SIZE") {
                pg.pool_size = parse_number("PG_POOL_SIZE", &pool_size)?;
            }
            self.postgres = Some(pg);
        }

        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{ENV_PREFIX}{name} must be a number, got '{value}'")))
}
