//! # Core Configuration
//!
//! Builder-validated wiring for the shelf core: where persisted data lives
//! and which platform bridges back the HTTP and settings traits.
//!
//! A [`CoreConfig`] is assembled once at startup by the hosting shell and
//! handed to the aggregator. The builder fails fast: a missing settings store
//! or an out-of-range tunable is reported at `build()` time with a message
//! that says how to fix it, instead of surfacing later as a refresh failure.
//!
//! With the `desktop-shims` feature enabled (the default), omitted bridges
//! fall back to the desktop implementations: a reqwest-backed [`HttpClient`]
//! and a SQLite-backed [`SettingsStore`] created under the data directory.
//! Embedders targeting other platforms disable the feature and must inject
//! both bridges themselves.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/home/reader/.local/share/shelf")
//!     .max_concurrent_downloads(6)
//!     .build()?;
//! ```
//!
//! Omitting the data directory is always an error:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! CoreConfig::builder().build().expect("missing data directory");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Assembled runtime wiring for the shelf core.
///
/// Construct through [`CoreConfig::builder`]; the fields are public so the
/// aggregator and embedders can read the resolved paths back out.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root directory for all persisted data
    pub data_dir: PathBuf,

    /// Directory for downloaded attachment files
    pub downloads_dir: PathBuf,

    /// Directory for extracted cover thumbnails
    pub covers_dir: PathBuf,

    /// Path to the offline cache SQLite database
    pub cache_db_path: PathBuf,

    /// HTTP client for API requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Maximum number of attachments materialized concurrently
    pub max_concurrent_downloads: usize,

    /// Page size for attachment listing requests
    pub item_page_limit: u32,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Trait objects have no useful Debug output; show presence only.
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("downloads_dir", &self.downloads_dir)
            .field("covers_dir", &self.covers_dir)
            .field("cache_db_path", &self.cache_db_path)
            .field("http_client", &self.http_client.is_some())
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("item_page_limit", &self.item_page_limit)
            .finish()
    }
}

impl CoreConfig {
    /// Starts a new [`CoreConfigBuilder`].
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks value-level constraints.
    ///
    /// Called automatically by `build()`; exposed so embedders that mutate a
    /// cloned config can re-check it.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "Max concurrent downloads must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_downloads > 64 {
            return Err(Error::Config(
                "Max concurrent downloads exceeds maximum of 64".to_string(),
            ));
        }

        if self.item_page_limit == 0 {
            return Err(Error::Config(
                "Item page limit must be greater than 0".to_string(),
            ));
        }

        if self.item_page_limit > 100 {
            return Err(Error::Config(
                "Item page limit exceeds the Zotero API maximum of 100".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for user preferences. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore). \
                 Web: inject localStorage-based settings store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    Some(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    None
}

/// Opens the default SQLite settings store at `<data_dir>/settings.db`.
///
/// `build()` is synchronous while store construction is async, so a throwaway
/// runtime drives it. When build() itself runs inside a Tokio runtime on this
/// thread, `Runtime::new` + `block_on` would panic, so the work moves to a
/// fresh thread first.
#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(data_dir: &std::path::Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use tokio::runtime::{Handle, Runtime};

    fn open_store(path: PathBuf) -> Result<SqliteSettingsStore> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!("Failed to create runtime for settings store: {}", e))
        })?;
        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| Error::Internal(format!("Failed to open default settings store: {}", e)))
    }

    let db_path = data_dir.join("settings.db");
    let store = if Handle::try_current().is_ok() {
        std::thread::spawn(move || open_store(db_path))
            .join()
            .map_err(|_| {
                Error::Internal("Settings store init thread panicked".to_string())
            })??
    } else {
        open_store(db_path)?
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_data_dir: &std::path::Path) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Incremental builder for [`CoreConfig`].
///
/// Only `data_dir` is mandatory on desktop builds; every other knob has a
/// default derived from it.
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    downloads_dir: Option<PathBuf>,
    covers_dir: Option<PathBuf>,
    cache_db_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    max_concurrent_downloads: Option<usize>,
    item_page_limit: Option<u32>,
}

impl CoreConfigBuilder {
    /// Sets the root data directory (required).
    ///
    /// Downloads, covers and the cache database default to subpaths of this
    /// directory unless overridden.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Overrides the directory for downloaded attachment files.
    ///
    /// Default: `<data_dir>/downloads`
    pub fn downloads_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.downloads_dir = Some(path.into());
        self
    }

    /// Overrides the directory for extracted cover thumbnails.
    ///
    /// Default: `<data_dir>/covers`
    pub fn covers_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.covers_dir = Some(path.into());
        self
    }

    /// Overrides the path of the offline cache database.
    ///
    /// Default: `<data_dir>/shelf.db`
    pub fn cache_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_db_path = Some(path.into());
        self
    }

    /// Injects the HTTP client used for every Zotero API call and download.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Injects the store backing user preferences (credentials, file type
    /// toggles, sort mode, saved tabs).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Bounds how many attachments the refresh pipeline materializes at once.
    ///
    /// Default: 4
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = Some(max);
        self
    }

    /// Sets the page size for attachment listing requests.
    ///
    /// Default: 100 (the Zotero API maximum)
    pub fn item_page_limit(mut self, limit: u32) -> Self {
        self.item_page_limit = Some(limit);
        self
    }

    /// Resolves defaults, injects platform shims where enabled, and
    /// validates the result.
    pub fn build(self) -> Result<CoreConfig> {
        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let downloads_dir = self
            .downloads_dir
            .unwrap_or_else(|| data_dir.join("downloads"));
        let covers_dir = self.covers_dir.unwrap_or_else(|| data_dir.join("covers"));
        let cache_db_path = self
            .cache_db_path
            .unwrap_or_else(|| data_dir.join("shelf.db"));

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&data_dir)?,
        };

        let http_client = self.http_client.or_else(provide_default_http_client);

        let config = CoreConfig {
            data_dir,
            downloads_dir,
            covers_dir,
            cache_db_path,
            http_client,
            settings_store,
            max_concurrent_downloads: self.max_concurrent_downloads.unwrap_or(4),
            item_page_limit: self.item_page_limit.unwrap_or(100),
        };

        config.validate()?;
        Ok(config)
    }
}
