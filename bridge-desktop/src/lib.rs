//! # Desktop Bridges
//!
//! Ready-made `bridge-traits` implementations for macOS, Windows and Linux:
//! [`ReqwestHttpClient`] for HTTP (connection pooling, rustls, retry with
//! backoff) and [`SqliteSettingsStore`] for preferences (one upserted row
//! per key).
//!
//! Hosts that want zero wiring get both injected automatically through the
//! workspace's `desktop-shims` feature; hosts with their own transport or
//! storage construct these directly and pass them to the core config:
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new());
//! let settings = Arc::new(SqliteSettingsStore::new(data_dir.join("settings.db")).await?);
//! ```

mod http;
mod settings;

pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
