//! # Shelf Cache
//!
//! SQLite-backed offline persistence for shelf entries.
//!
//! ## Overview
//!
//! This crate provides:
//! - A connection pool configured for a small single-writer cache (WAL,
//!   busy timeout, inline schema)
//! - The [`CacheGateway`] trait with a SQLite implementation
//! - Filtered queries mirroring the online view options, so offline
//!   fallback shows the same shelf the user configured
//! - Age-based purging for cache maintenance
//!
//! The cache is a projection of the last successful refresh: rows are
//! replaced wholesale by item key and never merged.

pub mod db;
pub mod error;
pub mod gateway;
pub mod models;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CacheError, Result};
pub use gateway::{CacheGateway, EntryFilter, SqliteCacheGateway};
pub use models::{encode_collection_keys, CachedEntry, EPUB_MIME, PDF_MIME};
