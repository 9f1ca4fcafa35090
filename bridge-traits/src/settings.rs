//! Key-Value Settings Storage
//!
//! Platform-agnostic trait for persistent user preferences. Desktop builds
//! back this with SQLite; host applications may inject their native settings
//! system instead.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Values are typed at the call site; implementations must reject a read
/// whose stored type does not match the requested one rather than coercing.
/// Reads of never-written keys return `Ok(None)`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::settings::SettingsStore;
///
/// async fn remember_collection(store: &dyn SettingsStore, key: &str) -> Result<()> {
///     store.set_string("collection_key", key).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Remove a single key; missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn has_key(&self, key: &str) -> Result<bool>;

    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Drops every stored key. Used when the user signs out.
    async fn clear_all(&self) -> Result<()>;
}
