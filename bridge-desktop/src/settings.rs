//! Desktop settings bridge backed by SQLite.
//!
//! Persists the key-value preferences surface (`bridge_traits::SettingsStore`)
//! in a single `settings` table next to the rest of the app data. Values are
//! stored as text with a type tag so a key written as one type cannot be
//! silently read back as another.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    settings::SettingsStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tracing::{debug, error};

const SETTINGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    value_type TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

/// SQLite-backed [`SettingsStore`].
///
/// One row per key, upserted on write. All operations go through a small
/// connection pool, so the store can be shared behind an `Arc` across tasks.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Opens (creating if necessary) the settings database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to open settings database: {}", e))
        })?;

        Self::ensure_schema(&pool).await?;
        debug!(path = ?db_path, "Settings store ready");

        Ok(Self { pool })
    }

    /// Opens an in-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        // One connection only: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to open in-memory database: {}", e))
            })?;

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(SETTINGS_SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to create settings table: {}", e))
            })?;
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    async fn write(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, value_type, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to write setting: {}", e)))?;

        debug!(key, value_type, "Setting written");
        Ok(())
    }

    async fn read(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read setting: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.get(0);
        let stored_type: String = row.get(1);
        if stored_type != expected_type {
            error!(key, expected = expected_type, stored = %stored_type, "Setting type mismatch");
            return Err(BridgeError::OperationFailed(format!(
                "Type mismatch for '{}': expected {}, got {}",
                key, expected_type, stored_type
            )));
        }

        Ok(Some(value))
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.read(key, "string").await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.write(key, &value.to_string(), "bool").await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.read(key, "bool")
            .await?
            .map(|s| {
                s.parse().map_err(|e| {
                    BridgeError::OperationFailed(format!("Corrupt bool for '{}': {}", key, e))
                })
            })
            .transpose()
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.write(key, &value.to_string(), "i64").await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.read(key, "i64")
            .await?
            .map(|s| {
                s.parse().map_err(|e| {
                    BridgeError::OperationFailed(format!("Corrupt i64 for '{}': {}", key, e))
                })
            })
            .transpose()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to delete setting: {}", e))
            })?;

        debug!(key, "Setting deleted");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to list keys: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to clear settings: {}", e))
            })?;

        debug!("All settings cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteSettingsStore {
        SqliteSettingsStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_string_round_trip_and_delete() {
        let store = store().await;

        store
            .set_string("zotero.selected_collection", "ABCD2345")
            .await
            .unwrap();
        assert_eq!(
            store.get_string("zotero.selected_collection").await.unwrap(),
            Some("ABCD2345".to_string())
        );

        store.delete("zotero.selected_collection").await.unwrap();
        assert_eq!(
            store.get_string("zotero.selected_collection").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_writes_upsert_in_place() {
        let store = store().await;

        store.set_string("sort_mode", "title").await.unwrap();
        store.set_string("sort_mode", "author").await.unwrap();

        assert_eq!(
            store.get_string("sort_mode").await.unwrap(),
            Some("author".to_string())
        );
        assert_eq!(store.list_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bool_and_i64_round_trips() {
        let store = store().await;

        store.set_bool("view.show_epubs", true).await.unwrap();
        assert_eq!(store.get_bool("view.show_epubs").await.unwrap(), Some(true));

        store.set_i64("tabs.current", 2).await.unwrap();
        assert_eq!(store.get_i64("tabs.current").await.unwrap(), Some(2));

        assert_eq!(store.get_bool("view.show_pdfs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reading_with_wrong_type_is_an_error() {
        let store = store().await;

        store.set_string("view.books_only", "yes").await.unwrap();
        let err = store.get_bool("view.books_only").await.unwrap_err();
        assert!(err.to_string().contains("Type mismatch"));
    }

    #[tokio::test]
    async fn test_keys_list_sorted() {
        let store = store().await;

        store.set_string("zotero.username", "reader42").await.unwrap();
        store.set_bool("view.show_pdfs", false).await.unwrap();

        assert_eq!(
            store.list_keys().await.unwrap(),
            vec!["view.show_pdfs", "zotero.username"]
        );
        assert!(store.has_key("zotero.username").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all_empties_the_table() {
        let store = store().await;

        store.set_string("a", "1").await.unwrap();
        store.set_bool("b", false).await.unwrap();
        store.clear_all().await.unwrap();

        assert!(store.list_keys().await.unwrap().is_empty());
        assert!(!store.has_key("a").await.unwrap());
    }
}
