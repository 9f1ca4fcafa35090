//! # User Preferences
//!
//! Typed access to persisted user preferences on top of the `SettingsStore`
//! bridge, plus the [`ViewOptions`] value object handed to the shelf pipeline.
//!
//! ## Overview
//!
//! The shelf behaves differently depending on a handful of user-controlled
//! toggles: which file types to show, whether to restrict to book-like parent
//! types, how to sort and how to label items. Rather than letting modules read
//! ambient settings, those options are materialized into an explicit
//! [`ViewOptions`] snapshot and passed into the aggregator and sorter at call
//! time.
//!
//! Saved tabs (one independent library view each) are persisted as a JSON
//! array under a single settings key, together with the active tab index.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::prefs::PreferencesStore;
//!
//! let prefs = PreferencesStore::new(settings_store);
//! let options = prefs.view_options().await?;
//! let items = aggregator.fetch_display_items(&options).await?;
//! ```

use bridge_traits::{BridgeError, Result, SettingsStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Settings keys used by the preferences store.
pub mod keys {
    pub const USER_ID: &str = "user_id";
    pub const API_KEY: &str = "api_key";
    pub const USERNAME: &str = "username";
    pub const COLLECTION_KEY: &str = "collection_key";
    pub const COLLECTION_NAME: &str = "collection_name";
    pub const SHOW_EPUBS: &str = "show_epubs";
    pub const SHOW_PDFS: &str = "show_pdfs";
    pub const BOOKS_ONLY: &str = "books_only";
    pub const SORT_MODE: &str = "sort_mode";
    pub const DISPLAY_MODE: &str = "display_mode";
    pub const TABS: &str = "tabs";
    pub const CURRENT_TAB_INDEX: &str = "current_tab_index";
}

/// Ordering applied to the aggregated item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Case-insensitive title order, leading English articles stripped.
    #[default]
    Title,
    /// First author's surname, title as secondary key.
    Author,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Title => "title",
            SortMode::Author => "author",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "title" => Some(SortMode::Title),
            "author" => Some(SortMode::Author),
            _ => None,
        }
    }
}

/// How shelf entries are labelled in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Title only.
    #[default]
    TitleOnly,
    /// Author only.
    AuthorOnly,
    /// "Author - Title".
    AuthorDashTitle,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::TitleOnly => "title-only",
            DisplayMode::AuthorOnly => "author-only",
            DisplayMode::AuthorDashTitle => "author-dash-title",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "title-only" => Some(DisplayMode::TitleOnly),
            "author-only" => Some(DisplayMode::AuthorOnly),
            "author-dash-title" => Some(DisplayMode::AuthorDashTitle),
            _ => None,
        }
    }
}

/// One saved library view: an optional collection scope plus an optional
/// semicolon-delimited tag filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[serde(default)]
    pub collection_key: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub tag_filter: Option<String>,
}

impl Tab {
    /// A tab showing the whole library with no tag filter.
    pub fn all_collections() -> Self {
        Self::default()
    }

    /// Human-readable tab label.
    pub fn label(&self) -> &str {
        self.collection_name.as_deref().unwrap_or("All Collections")
    }
}

/// Snapshot of every option that influences one shelf fetch.
///
/// Constructed from stored preferences (optionally overlaid with a tab's
/// scope) and passed explicitly into the aggregator and sorter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    /// Collection to scope the fetch to; `None` means the whole library.
    pub collection_key: Option<String>,
    /// Semicolon-delimited tag names, combined with AND semantics.
    pub tag_filter: Option<String>,
    /// Include EPUB attachments.
    pub show_epubs: bool,
    /// Include PDF attachments.
    pub show_pdfs: bool,
    /// Restrict to items whose resolved parent type is book-like.
    pub books_only: bool,
    /// Ordering of the result list.
    pub sort_mode: SortMode,
    /// Label format for display.
    pub display_mode: DisplayMode,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            collection_key: None,
            tag_filter: None,
            show_epubs: true,
            show_pdfs: true,
            books_only: false,
            sort_mode: SortMode::default(),
            display_mode: DisplayMode::default(),
        }
    }
}

impl ViewOptions {
    /// Scope these options to a collection.
    pub fn with_collection(mut self, key: impl Into<String>) -> Self {
        self.collection_key = Some(key.into());
        self
    }

    /// Apply a semicolon-delimited tag filter.
    pub fn with_tag_filter(mut self, tags: impl Into<String>) -> Self {
        self.tag_filter = Some(tags.into());
        self
    }

    /// True when no file type is enabled, meaning a fetch would always be empty.
    pub fn no_file_types_enabled(&self) -> bool {
        !self.show_epubs && !self.show_pdfs
    }
}

/// Typed preference accessors over a [`SettingsStore`] bridge.
#[derive(Clone)]
pub struct PreferencesStore {
    settings: Arc<dyn SettingsStore>,
}

impl PreferencesStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// Returns the stored (user id, API key) pair.
    pub async fn credentials(&self) -> Result<(Option<String>, Option<String>)> {
        let user_id = self.settings.get_string(keys::USER_ID).await?;
        let api_key = self.settings.get_string(keys::API_KEY).await?;
        Ok((user_id, api_key))
    }

    pub async fn set_credentials(&self, user_id: &str, api_key: &str) -> Result<()> {
        self.settings.set_string(keys::USER_ID, user_id).await?;
        self.settings.set_string(keys::API_KEY, api_key).await?;
        Ok(())
    }

    /// Display username used for permalinks and cache attribution.
    pub async fn username(&self) -> Result<Option<String>> {
        self.settings.get_string(keys::USERNAME).await
    }

    pub async fn set_username(&self, username: &str) -> Result<()> {
        self.settings.set_string(keys::USERNAME, username).await
    }

    // ------------------------------------------------------------------
    // View options
    // ------------------------------------------------------------------

    /// The persisted collection selection, as a (key, name) pair.
    pub async fn selected_collection(&self) -> Result<(Option<String>, Option<String>)> {
        let key = self.settings.get_string(keys::COLLECTION_KEY).await?;
        let name = self.settings.get_string(keys::COLLECTION_NAME).await?;
        Ok((key, name))
    }

    pub async fn set_selected_collection(&self, key: &str, name: &str) -> Result<()> {
        self.settings.set_string(keys::COLLECTION_KEY, key).await?;
        self.settings.set_string(keys::COLLECTION_NAME, name).await?;
        Ok(())
    }

    pub async fn set_show_epubs(&self, enabled: bool) -> Result<()> {
        self.settings.set_bool(keys::SHOW_EPUBS, enabled).await
    }

    pub async fn set_show_pdfs(&self, enabled: bool) -> Result<()> {
        self.settings.set_bool(keys::SHOW_PDFS, enabled).await
    }

    pub async fn set_books_only(&self, enabled: bool) -> Result<()> {
        self.settings.set_bool(keys::BOOKS_ONLY, enabled).await
    }

    pub async fn set_sort_mode(&self, mode: SortMode) -> Result<()> {
        self.settings.set_string(keys::SORT_MODE, mode.as_str()).await
    }

    pub async fn set_display_mode(&self, mode: DisplayMode) -> Result<()> {
        self.settings
            .set_string(keys::DISPLAY_MODE, mode.as_str())
            .await
    }

    /// Assembles a [`ViewOptions`] snapshot from stored preferences.
    ///
    /// Missing values fall back to defaults: both file types enabled,
    /// books-only off, title sort, title-only display. Unrecognized stored
    /// mode strings also fall back to the default rather than failing.
    pub async fn view_options(&self) -> Result<ViewOptions> {
        let defaults = ViewOptions::default();

        let show_epubs = self
            .settings
            .get_bool(keys::SHOW_EPUBS)
            .await?
            .unwrap_or(defaults.show_epubs);
        let show_pdfs = self
            .settings
            .get_bool(keys::SHOW_PDFS)
            .await?
            .unwrap_or(defaults.show_pdfs);
        let books_only = self
            .settings
            .get_bool(keys::BOOKS_ONLY)
            .await?
            .unwrap_or(defaults.books_only);

        let sort_mode = match self.settings.get_string(keys::SORT_MODE).await? {
            Some(value) => SortMode::parse(&value).unwrap_or_else(|| {
                debug!(value = %value, "Unrecognized sort mode, using default");
                SortMode::default()
            }),
            None => SortMode::default(),
        };

        let display_mode = match self.settings.get_string(keys::DISPLAY_MODE).await? {
            Some(value) => DisplayMode::parse(&value).unwrap_or_else(|| {
                debug!(value = %value, "Unrecognized display mode, using default");
                DisplayMode::default()
            }),
            None => DisplayMode::default(),
        };

        let (collection_key, _) = self.selected_collection().await?;

        Ok(ViewOptions {
            collection_key,
            tag_filter: None,
            show_epubs,
            show_pdfs,
            books_only,
            sort_mode,
            display_mode,
        })
    }

    /// Like [`view_options`](Self::view_options), but scoped to a tab's
    /// collection and tag filter instead of the persisted selection.
    pub async fn view_options_for_tab(&self, tab: &Tab) -> Result<ViewOptions> {
        let mut options = self.view_options().await?;
        options.collection_key = tab.collection_key.clone();
        options.tag_filter = tab.tag_filter.clone();
        Ok(options)
    }

    // ------------------------------------------------------------------
    // Tabs
    // ------------------------------------------------------------------

    /// Loads the saved tab list. An empty library view is returned when no
    /// tabs have been saved yet.
    pub async fn tabs(&self) -> Result<Vec<Tab>> {
        match self.settings.get_string(keys::TABS).await? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to decode saved tabs: {}", e))
            }),
            None => Ok(vec![Tab::all_collections()]),
        }
    }

    pub async fn save_tabs(&self, tabs: &[Tab]) -> Result<()> {
        let json = serde_json::to_string(tabs).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode tabs: {}", e))
        })?;
        self.settings.set_string(keys::TABS, &json).await
    }

    /// Index of the active tab, clamped to 0 when unset.
    pub async fn current_tab_index(&self) -> Result<usize> {
        let index = self
            .settings
            .get_i64(keys::CURRENT_TAB_INDEX)
            .await?
            .unwrap_or(0);
        Ok(index.max(0) as usize)
    }

    pub async fn set_current_tab_index(&self, index: usize) -> Result<()> {
        self.settings
            .set_i64(keys::CURRENT_TAB_INDEX, index as i64)
            .await
    }
}

impl std::fmt::Debug for PreferencesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferencesStore").finish()
    }
}
