//! # Core Runtime
//!
//! Shared plumbing under the shelf modules: [`config`] assembles and
//! validates the bridge wiring, [`logging`] installs the tracing subscriber,
//! [`events`] broadcasts refresh progress, and [`prefs`] types the raw
//! settings keys into credentials, view options and saved tabs.
//!
//! Nothing in this crate knows about Zotero item shapes or shelf semantics;
//! it is the layer the domain crates stand on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod prefs;

pub use error::{Error, Result};
