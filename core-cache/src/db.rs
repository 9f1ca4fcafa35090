//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling for the offline shelf cache.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable max connections with timeouts
//! - **Foreign Keys**: Enforced for referential integrity
//! - **Inline Schema**: The cache table is created on first open
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_cache::db::{create_pool, DatabaseConfig};
//!
//! let config = DatabaseConfig::new("/data/shelf.db");
//! let pool = create_pool(config).await?;
//! ```
//!
//! ## Testing
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::error::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path, `None` for an in-memory database
    path: Option<PathBuf>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a configuration for the given database file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(database_path.into()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// Pinned to a single connection: every in-memory SQLite connection
    /// opens its own empty database, so a second connection would not see
    /// the initialized schema.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            None => SqliteConnectOptions::new().in_memory(true),
        };

        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// Creates the parent directory and database file when missing and
/// initializes the cache schema.
///
/// # Errors
///
/// Returns an error if the database file cannot be created or opened, or
/// if schema initialization fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    info!(
        path = ?config.path,
        max_connections = config.max_connections,
        "Opening shelf cache database"
    );

    if let Some(parent) = config.path.as_ref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect_options())
        .await?;

    init_schema(&pool).await?;

    info!("Shelf cache database ready");

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Initialize the cache schema
///
/// Idempotent: uses `IF NOT EXISTS` so reopening an existing cache is a
/// no-op.
async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shelf_entries (
            item_key TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            authors TEXT NOT NULL DEFAULT '',
            year INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            is_book_like INTEGER NOT NULL DEFAULT 0,
            cover_path TEXT,
            download_path TEXT,
            username TEXT NOT NULL DEFAULT '',
            collection_keys TEXT NOT NULL DEFAULT '',
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_shelf_entries_updated_at ON shelf_entries(updated_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_shelf_entries_mime_type ON shelf_entries(mime_type)",
    )
    .execute(pool)
    .await?;

    debug!("Shelf cache schema initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = create_test_pool().await;
        assert!(pool.is_ok(), "Should create in-memory pool successfully");
    }

    #[tokio::test]
    async fn test_schema_created() {
        let pool = create_test_pool().await.unwrap();

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='shelf_entries'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 1, "shelf_entries table should exist");
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_journal_mode() {
        let pool = create_test_pool().await.unwrap();

        // In-memory databases report "memory" instead of WAL
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();

        let mode = result.0.to_lowercase();
        assert!(
            mode == "wal" || mode == "memory",
            "Journal mode should be WAL or memory, got: {}",
            mode
        );
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DatabaseConfig::in_memory()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(60));

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
    }
}
