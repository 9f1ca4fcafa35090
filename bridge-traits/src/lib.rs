//! # Host Bridge Traits
//!
//! The contract between the shelf core and whatever hosts it. The core is
//! platform-agnostic: it never opens sockets or touches preference storage
//! directly, it asks these traits to do it. Each host (desktop CLI, mobile
//! app, test harness) supplies its own implementations.
//!
//! Two capabilities are defined:
//!
//! - [`HttpClient`](http::HttpClient): async HTTP with retry and TLS,
//!   carrying every Zotero API call and attachment download
//! - [`SettingsStore`](settings::SettingsStore): typed key-value storage
//!   for credentials and view preferences
//!
//! Missing capabilities are a startup error, not a runtime surprise: the
//! core's config builder refuses to assemble without them and says which
//! injection is missing (see `core_runtime::config`). On desktop the
//! `bridge-desktop` crate provides both implementations out of the box.
//!
//! Every trait method returns [`error::Result`]. The one error distinction
//! the core depends on: [`BridgeError::Network`](error::BridgeError) marks
//! connectivity-level failures, which is what flips the shelf into its
//! offline-cache fallback.

pub mod error;
pub mod http;
pub mod settings;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use settings::SettingsStore;
