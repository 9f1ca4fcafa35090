//! # Shelf Module
//!
//! Turns a Zotero library into a display-ready bookshelf.
//!
//! ## Overview
//!
//! This module owns everything between the Zotero connector and a
//! rendered shelf:
//! - Fetching and filtering attachment items (EPUB/PDF, books-only)
//! - Resolving parent bibliographic metadata concurrently
//! - Downloading binaries and extracting cover artifacts
//! - Persisting the offline cache and falling back to it when the
//!   network is unreachable
//! - Rebuilding the collection sidebar tree
//!
//! ## Components
//!
//! - **Aggregator** (`aggregator`): One-call refresh pipeline with run
//!   guard, cache fallback and maintenance operations
//! - **Collections** (`collections`): Flat-to-tree sidebar reconstruction
//! - **Items** (`item`): Parent/attachment metadata resolution and the
//!   display item type
//! - **Sorting** (`sort`): Title and author orderings with stable
//!   unknown-value placement
//! - **Errors** (`error`): Run-scale failures and empty-shelf reasons

pub mod aggregator;
pub mod collections;
pub mod error;
pub mod item;
pub mod sort;

pub use aggregator::{
    AggregatorConfig, DataOrigin, PurgeStats, ShelfAggregator, ShelfOutcome,
};
pub use collections::{build_tree, CollectionNode, CollectionRecord, ALL_COLLECTIONS_LABEL};
pub use error::{EmptyReason, Result, ShelfError};
pub use item::{
    extract_year, ResolvedMetadata, ShelfItem, BOOK_LIKE_TYPES, UNKNOWN_TITLE, UNKNOWN_YEAR,
};
pub use sort::{author_sort_key, sort_items, title_sort_key, UNKNOWN_AUTHOR_KEY};
