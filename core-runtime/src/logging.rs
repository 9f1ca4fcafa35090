//! # Logging
//!
//! `tracing` subscriber setup for the whole workspace. Every crate logs
//! through `tracing` macros with structured fields (`run_id`, `item_key`,
//! `collection_key`); this module decides once, at startup, how those events
//! are filtered and rendered.
//!
//! Three output formats are supported: `Pretty` for development, `Compact`
//! for terminals that dislike multi-line events, and `Json` for shipping
//! logs to a collector. Debug builds default to `Pretty`, release builds to
//! `Json`.
//!
//! Zotero API keys and usernames are personal data, so redaction helpers
//! ([`redact_if_sensitive`], [`strip_path`]) are provided for call sites that
//! must mention them, and the default filter keeps dependency noise
//! (hyper, sqlx) at `warn`.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug),
//! )?;
//! ```

use crate::error::{Error, Result};

use std::io;

use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Minimum severity for emitted log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output with colors
    Pretty,
    /// One JSON object per event, fields flattened
    Json,
    /// Single-line human-readable output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level for workspace crates
    pub level: LogLevel,
    /// Enable PII redaction
    pub redact_pii: bool,
    /// Custom filter string (e.g., "core_shelf=debug,provider_zotero=trace")
    pub filter: Option<String>,
    /// Emit span enter/exit events
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread ids and names
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    /// Replaces the default filter entirely; the string is an `EnvFilter`
    /// directive list.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Installs the global subscriber.
///
/// Call once at startup, before anything logs. A second call fails because
/// the global dispatcher is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    match config.format {
        LogFormat::Pretty => init_pretty_logging(config, filter),
        LogFormat::Json => init_json_logging(config, filter),
        LogFormat::Compact => init_compact_logging(config, filter),
    }
}

/// Workspace crates at the configured level, known-noisy deps pinned to warn.
fn default_directives(level: LogLevel) -> String {
    let level = level.as_str();
    let mut directives: Vec<String> = [
        env!("CARGO_PKG_NAME"),
        "core_runtime",
        "core_cache",
        "core_covers",
        "core_shelf",
        "provider_zotero",
        "bridge_desktop",
    ]
    .iter()
    .map(|krate| format!("{}={}", krate, level))
    .collect();

    for noisy in ["h2", "hyper", "reqwest", "sqlx"] {
        directives.push(format!("{}=warn", noisy));
    }

    directives.join(",")
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn try_install<S: SubscriberInitExt>(subscriber: S) -> Result<()> {
    subscriber
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn init_pretty_logging(config: LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_span_events(if config.enable_spans {
            tracing_subscriber::fmt::format::FmtSpan::ACTIVE
        } else {
            tracing_subscriber::fmt::format::FmtSpan::NONE
        })
        .with_writer(io::stdout);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
    if config.redact_pii {
        try_install(registry.with(PiiRedactionLayer))
    } else {
        try_install(registry)
    }
}

fn init_json_logging(config: LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(config.enable_spans)
        .with_span_list(config.enable_spans)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
    if config.redact_pii {
        try_install(registry.with(PiiRedactionLayer))
    } else {
        try_install(registry)
    }
}

fn init_compact_logging(config: LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
    if config.redact_pii {
        try_install(registry.with(PiiRedactionLayer))
    } else {
        try_install(registry)
    }
}

/// Hook for scrubbing events before they reach the writer.
///
/// Field-level redaction happens at call sites via [`redact_if_sensitive`];
/// the layer exists so a stricter policy can be added in one place without
/// touching the format layers.
struct PiiRedactionLayer;

impl<S> Layer<S> for PiiRedactionLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, _event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {}
}

/// Redacts values whose field name smells like a credential, and mangles
/// email-shaped values down to their first character.
///
/// ```ignore
/// info!(api_key = %redact_if_sensitive("api_key", key), "Stored credentials");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "access_token",
        "refresh_token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        "[REDACTED]".to_string()
    } else if value.contains('@') && value.contains('.') {
        match value.find('@') {
            Some(at_pos) => format!("{}***@[REDACTED]", &value[..1.min(at_pos)]),
            None => value.to_string(),
        }
    } else {
        value.to_string()
    }
}

/// Reduces a file path to its basename for logging.
///
/// Download and cover paths contain the user's home directory; log lines
/// only need the file name.
pub fn strip_path(path: &str) -> &str {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .rsplit('\\')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods_set_every_knob() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_pii_redaction(false)
            .with_filter("core_shelf=trace")
            .with_spans(false)
            .with_target(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.redact_pii);
        assert_eq!(config.filter.as_deref(), Some("core_shelf=trace"));
        assert!(!config.enable_spans);
        assert!(!config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_credential_fields_are_fully_redacted() {
        assert_eq!(redact_if_sensitive("api_key", "P9NiFoyLeZu2bZNvvQQXcuAx"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("zotero_api_key", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
    }

    #[test]
    fn test_email_values_keep_only_first_char() {
        let redacted = redact_if_sensitive("email", "reader@example.com");
        assert!(redacted.starts_with('r'));
        assert!(redacted.ends_with("[REDACTED]"));
        assert!(!redacted.contains("example.com"));
    }

    #[test]
    fn test_plain_fields_pass_through() {
        assert_eq!(redact_if_sensitive("item_key", "ABCD2345"), "ABCD2345");
        assert_eq!(redact_if_sensitive("title", "The Dispossessed"), "The Dispossessed");
    }

    #[test]
    fn test_strip_path_handles_both_separators() {
        assert_eq!(strip_path("/home/reader/books/novel.epub"), "novel.epub");
        assert_eq!(strip_path("C:\\Users\\Reader\\Books\\novel.pdf"), "novel.pdf");
        assert_eq!(strip_path("bare-name.epub"), "bare-name.epub");
        assert_eq!(strip_path("/var/cache/"), "");
    }

    #[test]
    fn test_default_format_tracks_build_profile() {
        #[cfg(debug_assertions)]
        assert_eq!(LogFormat::default(), LogFormat::Pretty);

        #[cfg(not(debug_assertions))]
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_default_filter_quiets_dependencies() {
        let directives = default_directives(LogLevel::Debug);
        assert!(directives.contains("core_shelf=debug"));
        assert!(directives.contains("provider_zotero=debug"));
        assert!(directives.contains("sqlx=warn"));
        assert!(directives.contains("hyper=warn"));

        let filter = build_filter(&LoggingConfig::default().with_level(LogLevel::Debug)).unwrap();
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_shelf=trace,core_cache=debug");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_shelf=trace"));
    }
}
