//! # Zotero Provider
//!
//! Read-only connector for the Zotero web API v3.
//!
//! ## Overview
//!
//! This crate provides:
//! - Attachment listing for a user library, optionally scoped to a
//!   collection and filtered by tags
//! - Parent item lookups for bibliographic metadata
//! - Paginated collection listing
//! - Authenticated attachment file downloads
//!
//! All requests authenticate with a per-user API key; HTTP transport comes
//! from the [`bridge_traits::http::HttpClient`] abstraction so the connector
//! stays testable and platform-neutral.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::ZoteroConnector;
pub use error::{Result, ZoteroError};
pub use types::{CollectionData, Creator, ItemData, ItemMeta, Tag, ZoteroCollection, ZoteroItem};
