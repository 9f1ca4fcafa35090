//! Error types for shelf aggregation

use core_cache::CacheError;
use core_runtime::prefs::ViewOptions;
use provider_zotero::ZoteroError;
use thiserror::Error;

use crate::aggregator::{DataOrigin, ShelfOutcome};

/// Errors terminating a shelf run
///
/// Item-local failures never surface here: a failed download or cover
/// extraction degrades that one item instead. These variants are the
/// run-level outcomes a caller has to handle.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// User ID or API key missing before any call was attempted
    #[error("Zotero user ID and API key must be configured")]
    EmptyCredentials,

    /// A refresh run is already active; the new request was rejected
    #[error("A shelf refresh is already in progress")]
    RefreshInProgress,

    /// The initial fetch or another run-scale API call failed
    #[error("Zotero API request failed: {0}")]
    Api(ZoteroError),

    /// Connectivity failure and the offline cache has nothing to show
    #[error("Network unavailable and the offline cache is empty")]
    NoCachedData,

    /// Offline cache read or write failed
    #[error("Offline cache error: {0}")]
    Cache(#[from] CacheError),

    /// Local file storage failed at run scale
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<ZoteroError> for ShelfError {
    fn from(err: ZoteroError) -> Self {
        match err {
            ZoteroError::EmptyCredentials => ShelfError::EmptyCredentials,
            other => ShelfError::Api(other),
        }
    }
}

impl ShelfError {
    /// User-facing message for this error
    pub fn user_message(&self) -> &'static str {
        match self {
            ShelfError::EmptyCredentials => {
                "Add your Zotero user ID and API key in settings to load your library."
            }
            ShelfError::RefreshInProgress => {
                "A refresh is already running. Wait for it to finish."
            }
            ShelfError::Api(ZoteroError::Unauthorized) => {
                "Your Zotero API key was rejected. Check the key in settings."
            }
            ShelfError::Api(ZoteroError::Forbidden) => {
                "Your API key does not have access to this library."
            }
            ShelfError::Api(ZoteroError::NotFound { .. }) => {
                "The requested Zotero resource was not found."
            }
            ShelfError::Api(_) => "Could not load your Zotero library. Try again later.",
            ShelfError::NoCachedData => {
                "Network error and no items are saved for offline use yet."
            }
            ShelfError::Cache(_) => "The offline cache hit a database error.",
            ShelfError::Storage(_) => "Could not write downloaded files to storage.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;

/// Explanation attached to an empty or degraded shelf view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Credentials were never configured
    NoCredentials,
    /// Both file type toggles are off
    NoFileTypesEnabled,
    /// The fetch succeeded but matched nothing
    NoItems,
    /// A tag filter was active and matched nothing
    NoItemsMatchingTags,
    /// Connectivity failed; cached items are shown instead
    NetworkErrorCacheAvailable,
    /// Connectivity failed and nothing is cached
    NetworkErrorNoCache,
}

impl EmptyReason {
    /// Classify a successful fetch for status display
    ///
    /// Returns `None` when the view needs no explanation (a populated
    /// remote result).
    pub fn for_outcome(options: &ViewOptions, outcome: &ShelfOutcome) -> Option<Self> {
        if !outcome.items.is_empty() {
            return match outcome.origin {
                DataOrigin::OfflineCache => Some(EmptyReason::NetworkErrorCacheAvailable),
                DataOrigin::Remote => None,
            };
        }

        if options.no_file_types_enabled() {
            Some(EmptyReason::NoFileTypesEnabled)
        } else if options.tag_filter.is_some() {
            Some(EmptyReason::NoItemsMatchingTags)
        } else {
            Some(EmptyReason::NoItems)
        }
    }

    /// Classify a failed fetch for status display
    ///
    /// Returns `None` for errors that should be shown as errors rather
    /// than empty states.
    pub fn for_error(error: &ShelfError) -> Option<Self> {
        match error {
            ShelfError::EmptyCredentials => Some(EmptyReason::NoCredentials),
            ShelfError::NoCachedData => Some(EmptyReason::NetworkErrorNoCache),
            _ => None,
        }
    }

    /// User-facing message for this state
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoCredentials => {
                "Add your Zotero user ID and API key in settings to load your library."
            }
            EmptyReason::NoFileTypesEnabled => {
                "No file types are enabled. Turn on EPUB or PDF files in settings."
            }
            EmptyReason::NoItems => "No EPUB or PDF attachments were found in this view.",
            EmptyReason::NoItemsMatchingTags => {
                "No items matched the tag filter. Tags are case-sensitive and every listed tag must be present."
            }
            EmptyReason::NetworkErrorCacheAvailable => {
                "Network error. Showing items saved for offline use."
            }
            EmptyReason::NetworkErrorNoCache => {
                "Network error and no items are saved for offline use yet."
            }
        }
    }
}
