//! Error types for the offline shelf cache

use thiserror::Error;

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
