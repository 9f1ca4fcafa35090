//! Walks a simulated shelf refresh through the logging stack so the span
//! nesting and field conventions can be eyeballed in each output format.
//!
//! ```bash
//! cargo run --example logging_demo              # pretty (debug default)
//! cargo run --example logging_demo -- json
//! cargo run --example logging_demo -- compact
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};
use std::env;
use tracing::{debug, info, info_span, instrument, trace, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config).expect("Failed to initialize logging");
    info!(format = ?format, "Logging initialized");

    credentials_loaded();
    simulated_refresh("run-demo-1", Some("SCIFI123")).await;

    info!("Demo finished");
}

/// Credentials must never appear in plain text, even at trace level.
fn credentials_loaded() {
    let api_key = "P9NiFoyLeZu2bZNvvQQXcuAx";
    let email = "reader@example.com";

    info!(
        api_key = %redact_if_sensitive("api_key", api_key),
        email = %redact_if_sensitive("email", email),
        "Zotero credentials loaded"
    );
}

/// Mirrors the phase structure of a real refresh run: list, filter, resolve,
/// then a bounded materialization loop with one span per attachment.
async fn simulated_refresh(run_id: &str, collection_key: Option<&str>) {
    let span = info_span!("shelf_refresh", run_id, collection_key);
    let _enter = span.enter();

    info!("Refresh started");

    debug!(fetched = 150, "Listed attachments");
    debug!(kept = 42, dropped = 108, "Filtered by MIME type");

    {
        let _resolve = info_span!("resolve_parents", pending = 42).entered();
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        debug!(resolved = 40, "Parent lookups finished");
        warn!(item_key = "GONE0001", "Parent lookup failed, item skipped");
    }

    let items = ["ITEM0001", "ITEM0002", "ITEM0003"];
    materialize_all(&items).await;

    info!(
        total_items = items.len(),
        covers_extracted = 2,
        duration_ms = 35,
        "Refresh completed"
    );
}

#[instrument(fields(count = items.len()))]
async fn materialize_all(items: &[&str]) {
    for item_key in items {
        materialize_one(item_key).await;
    }
    info!("All attachments materialized");
}

#[instrument]
async fn materialize_one(item_key: &str) {
    let path = "/home/reader/.local/share/shelf/downloads/novel.epub";

    trace!("Downloading attachment");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    debug!(file = %strip_path(path), cover_extracted = true, "Attachment cached");
}
