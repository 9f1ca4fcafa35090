//! # Shelf Cache Gateway
//!
//! Provides database persistence for shelf entries.
//!
//! ## Overview
//!
//! The gateway handles the offline copy of the shelf, including:
//! - Upserting entries after each refresh (last write wins per item key)
//! - Filtered queries that mirror the view options applied online
//! - Stale-entry purging by age
//!
//! Rows carry everything needed to rebuild a display item without the
//! network, so a refresh that cannot reach the API can still serve the
//! previous shelf.

use crate::error::Result;
use crate::models::{CachedEntry, EPUB_MIME, PDF_MIME};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

// ============================================================================
// Entry Filter
// ============================================================================

/// Filter applied to cached entries, mirroring the online view options
///
/// The same predicate the refresh pipeline applies to fresh API data is
/// expressed here in SQL so the offline shelf matches what the user last
/// configured.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    /// Restrict to members of this collection
    pub collection_key: Option<String>,

    /// Include EPUB attachments
    pub show_epubs: bool,

    /// Include PDF attachments
    pub show_pdfs: bool,

    /// Restrict to entries whose parent record is book-like
    pub books_only: bool,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            collection_key: None,
            show_epubs: true,
            show_pdfs: true,
            books_only: false,
        }
    }
}

impl EntryFilter {
    /// Whether this filter can match anything at all
    pub fn matches_nothing(&self) -> bool {
        !self.show_epubs && !self.show_pdfs
    }
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// Gateway trait for shelf entry persistence
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Insert or replace a single entry by item key
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn upsert(&self, entry: &CachedEntry) -> Result<()>;

    /// Insert or replace a batch of entries in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no entry is
    /// persisted when any of them fails
    async fn upsert_all(&self, entries: &[CachedEntry]) -> Result<()>;

    /// All cached entries, unfiltered
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn query_all(&self) -> Result<Vec<CachedEntry>>;

    /// Cached entries matching the given view filter
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn query_filtered(&self, filter: &EntryFilter) -> Result<Vec<CachedEntry>>;

    /// Entries last refreshed before the cutoff
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn query_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<CachedEntry>>;

    /// Number of cached entries
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn count(&self) -> Result<u64>;

    /// Delete entries last refreshed before the cutoff, returning how many
    /// rows were removed
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete every cached entry, returning how many rows were removed
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn delete_all(&self) -> Result<u64>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of `CacheGateway`
pub struct SqliteCacheGateway {
    pool: SqlitePool,
}

impl SqliteCacheGateway {
    /// Create a new SQLite cache gateway
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO shelf_entries (
        item_key, title, authors, year, mime_type, is_book_like,
        cover_path, download_path, username, collection_keys, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(item_key) DO UPDATE SET
        title = excluded.title,
        authors = excluded.authors,
        year = excluded.year,
        mime_type = excluded.mime_type,
        is_book_like = excluded.is_book_like,
        cover_path = excluded.cover_path,
        download_path = excluded.download_path,
        username = excluded.username,
        collection_keys = excluded.collection_keys,
        updated_at = excluded.updated_at
"#;

const SELECT_COLUMNS: &str = "item_key, title, authors, year, mime_type, is_book_like, \
     cover_path, download_path, username, collection_keys, updated_at";

#[async_trait]
impl CacheGateway for SqliteCacheGateway {
    async fn upsert(&self, entry: &CachedEntry) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(&entry.item_key)
            .bind(&entry.title)
            .bind(&entry.authors)
            .bind(entry.year)
            .bind(&entry.mime_type)
            .bind(entry.is_book_like)
            .bind(&entry.cover_path)
            .bind(&entry.download_path)
            .bind(&entry.username)
            .bind(&entry.collection_keys)
            .bind(entry.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_all(&self, entries: &[CachedEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(UPSERT_SQL)
                .bind(&entry.item_key)
                .bind(&entry.title)
                .bind(&entry.authors)
                .bind(entry.year)
                .bind(&entry.mime_type)
                .bind(entry.is_book_like)
                .bind(&entry.cover_path)
                .bind(&entry.download_path)
                .bind(&entry.username)
                .bind(&entry.collection_keys)
                .bind(entry.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!("Upserted {} cache entries", entries.len());

        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<CachedEntry>> {
        let sql = format!(
            "SELECT {} FROM shelf_entries ORDER BY item_key",
            SELECT_COLUMNS
        );

        let entries = sqlx::query_as::<_, CachedEntry>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn query_filtered(&self, filter: &EntryFilter) -> Result<Vec<CachedEntry>> {
        if filter.matches_nothing() {
            return Ok(Vec::new());
        }

        let mut conditions: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        match (filter.show_epubs, filter.show_pdfs) {
            (true, true) => {
                conditions.push("mime_type IN (?, ?)");
                binds.push(EPUB_MIME.to_string());
                binds.push(PDF_MIME.to_string());
            }
            (true, false) => {
                conditions.push("mime_type = ?");
                binds.push(EPUB_MIME.to_string());
            }
            (false, true) => {
                conditions.push("mime_type = ?");
                binds.push(PDF_MIME.to_string());
            }
            (false, false) => unreachable!("handled by matches_nothing"),
        }

        if filter.books_only {
            conditions.push("is_book_like = 1");
        }

        if let Some(key) = &filter.collection_key {
            conditions.push("collection_keys LIKE '%;' || ? || ';%'");
            binds.push(key.clone());
        }

        let sql = format!(
            "SELECT {} FROM shelf_entries WHERE {} ORDER BY item_key",
            SELECT_COLUMNS,
            conditions.join(" AND ")
        );

        let mut query = sqlx::query_as::<_, CachedEntry>(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let entries = query.fetch_all(&self.pool).await?;

        Ok(entries)
    }

    async fn query_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<CachedEntry>> {
        let sql = format!(
            "SELECT {} FROM shelf_entries WHERE updated_at < ? ORDER BY item_key",
            SELECT_COLUMNS
        );

        let entries = sqlx::query_as::<_, CachedEntry>(&sql)
            .bind(cutoff.timestamp())
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn count(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shelf_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shelf_entries WHERE updated_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shelf_entries")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Tests
// ============================================================================
