//! Runtime-level error type
//!
//! Failures raised while assembling the core: configuration validation,
//! missing platform bridges and internal wiring faults. Domain modules
//! (shelf, cache, covers, connector) define their own error types; this
//! one covers only the runtime scaffolding.

use thiserror::Error;

/// Errors raised during core initialization and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required platform bridge was not injected and no default exists
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Unexpected failure inside the runtime itself
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
