//! Error types for the Zotero web API connector

use thiserror::Error;

use bridge_traits::error::BridgeError;

/// Zotero connector errors
#[derive(Error, Debug)]
pub enum ZoteroError {
    /// User ID or API key is missing
    #[error("Zotero user ID and API key must be configured")]
    EmptyCredentials,

    /// API key was rejected (HTTP 401)
    #[error("Zotero API key was rejected (status 401)")]
    Unauthorized,

    /// API key lacks access to the requested library (HTTP 403)
    #[error("Access to this Zotero library is forbidden (status 403)")]
    Forbidden,

    /// Requested resource does not exist (HTTP 404)
    #[error("Zotero resource not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success API response
    #[error("Zotero API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse an API response body
    #[error("Failed to parse Zotero API response: {0}")]
    Decode(String),

    /// Transport-level failure from the HTTP client
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for Zotero operations
pub type Result<T> = std::result::Result<T, ZoteroError>;

impl ZoteroError {
    /// True when the request never reached the Zotero API, as opposed to the
    /// API answering with an error status. Callers use this to decide whether
    /// falling back to cached data is appropriate.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ZoteroError::Bridge(e) if e.is_connectivity())
    }
}
