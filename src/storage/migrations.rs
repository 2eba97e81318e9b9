//! PostgreSQL schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order when a
//! store initializes. Applied versions are recorded per table in
//! `<table>_schema_migrations`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vectorvault::storage::migrations::{Migration, MigrationRunner};
//!
//! const MIGRATIONS: &[Migration] = &[
//!     Migration {
//!         version: 1,
//!         description: "Initial table",
//!         sql: "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, v vector({dimension}));",
//!     },
//! ];
//!
//! let runner = MigrationRunner::new(pool, "vv_embeddings").with_param("dimension", "384");
//! runner.run(MIGRATIONS).await?;
//! ```

use crate::{Error, Result};
use deadpool_postgres::Pool;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements separated by semicolons).
    ///
    /// `{table}` is replaced by the runner's table name, `{name}` by the
    /// value registered with [`MigrationRunner::with_param`].
    pub sql: &'static str,
}

/// Runs migrations for a PostgreSQL table.
pub struct MigrationRunner {
    pool: Pool,
    table_name: String,
    params: Vec<(String, String)>,
}

impl MigrationRunner {
    /// Creates a new migration runner.
    #[must_use]
    pub fn new(pool: Pool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
            params: Vec::new(),
        }
    }

    /// Registers an extra `{name}` placeholder.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((format!("{{{name}}}"), value.into()));
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails; earlier migrations stay applied.
    pub async fn run(&self, migrations: &[Migration]) -> Result<()> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::operation("migration_get_connection", e))?;

        self.ensure_migrations_table(&client).await?;
        let current_version = self.get_current_version(&client).await?;

        for migration in migrations {
            if migration.version > current_version {
                self.apply_migration(&mut client, migration).await?;
            }
        }

        Ok(())
    }

    /// Returns the current schema version (0 before any migration).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub async fn current_version(&self) -> Result<i32> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::operation("migration_get_connection", e))?;

        if !self.table_exists(&client, &self.migrations_table_name()).await? {
            return Ok(0);
        }
        self.get_current_version(&client).await
    }

    fn migrations_table_name(&self) -> String {
        format!("{}_schema_migrations", self.table_name)
    }

    /// Substitutes placeholders in migration SQL.
    fn render(&self, sql: &str) -> String {
        let mut rendered = sql.replace("{table}", &self.table_name);
        for (placeholder, value) in &self.params {
            rendered = rendered.replace(placeholder, value);
        }
        rendered
    }

    async fn ensure_migrations_table(&self, client: &deadpool_postgres::Object) -> Result<()> {
        let migrations_table = self.migrations_table_name();
        let sql = format!(
            r"
            CREATE TABLE IF NOT EXISTS {migrations_table} (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "
        );

        client
            .execute(&sql, &[])
            .await
            .map_err(|e| Error::operation("create_migrations_table", e))?;
        Ok(())
    }

    async fn table_exists(&self, client: &deadpool_postgres::Object, table_name: &str) -> Result<bool> {
        let sql = r"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_name = $1
            )
        ";

        client
            .query_one(sql, &[&table_name])
            .await
            .map(|row| row.get(0))
            .map_err(|e| Error::operation("migration_table_exists", e))
    }

    async fn get_current_version(&self, client: &deadpool_postgres::Object) -> Result<i32> {
        let sql = format!(
            "SELECT COALESCE(MAX(version), 0) FROM {}",
            self.migrations_table_name()
        );

        client
            .query_one(&sql, &[])
            .await
            .map(|row| row.get(0))
            .map_err(|e| Error::operation("migration_current_version", e))
    }

    /// Applies one migration and records it in a single transaction.
    async fn apply_migration(
        &self,
        client: &mut deadpool_postgres::Object,
        migration: &Migration,
    ) -> Result<()> {
        let migrations_table = self.migrations_table_name();
        let sql = self.render(migration.sql);

        let tx = client
            .transaction()
            .await
            .map_err(|e| Error::operation(format!("migration_v{}_begin_tx", migration.version), e))?;

        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            tx.execute(statement, &[]).await.map_err(|e| {
                Error::operation(
                    format!("migration_v{}: {}", migration.version, migration.description),
                    e,
                )
            })?;
        }

        let record_sql =
            format!("INSERT INTO {migrations_table} (version, description) VALUES ($1, $2)");
        tx.execute(&record_sql, &[&migration.version, &migration.description])
            .await
            .map_err(|e| Error::operation("record_migration", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::operation(format!("migration_v{}_commit", migration.version), e))?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            table = self.table_name,
            "Applied migration"
        );

        Ok(())
    }
}

/// Maximum version across a set of migrations.
#[must_use]
pub fn max_version(migrations: &[Migration]) -> i32 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATIONS: &[Migration] = &[
        Migration {
            version: 1,
            description: "first",
            sql: "CREATE TABLE {table} (v vector({dimension}))",
        },
        Migration {
            version: 3,
            description: "third",
            sql: "SELECT 1",
        },
    ];

    #[test]
    fn test_max_version() {
        assert_eq!(max_version(MIGRATIONS), 3);
        assert_eq!(max_version(&[]), 0);
    }

    #[test]
    fn test_migrations_are_sequential() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }
}
