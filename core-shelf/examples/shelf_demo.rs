//! Shelf pipeline demonstration
//!
//! Wires the desktop bridges into a full shelf refresh against the live
//! Zotero API, then prints the sorted shelf.
//!
//! Run with:
//! ```bash
//! ZOTERO_USER_ID=12345 ZOTERO_API_KEY=secret cargo run --example shelf_demo
//!
//! # Scope to one collection, books only
//! ZOTERO_USER_ID=12345 ZOTERO_API_KEY=secret \
//!     cargo run --example shelf_demo -- --collection ABCD2345 --books-only
//!
//! # Keep data somewhere else (default: ./shelf-data)
//! SHELF_DATA_DIR=/tmp/shelf ZOTERO_USER_ID=12345 ZOTERO_API_KEY=secret \
//!     cargo run --example shelf_demo
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
use core_cache::{create_pool, DatabaseConfig, SqliteCacheGateway};
use core_covers::CoverExtractor;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, ShelfEvent, DEFAULT_EVENT_BUFFER_SIZE};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::prefs::{PreferencesStore, ViewOptions};
use core_shelf::{sort_items, AggregatorConfig, ShelfAggregator};
use provider_zotero::ZoteroConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default())?;

    let user_id = env::var("ZOTERO_USER_ID").context("ZOTERO_USER_ID must be set")?;
    let api_key = env::var("ZOTERO_API_KEY").context("ZOTERO_API_KEY must be set")?;
    let username = env::var("ZOTERO_USERNAME").unwrap_or_else(|_| user_id.clone());
    let data_dir =
        PathBuf::from(env::var("SHELF_DATA_DIR").unwrap_or_else(|_| "./shelf-data".to_string()));

    // Desktop bridges, injected explicitly
    let http = Arc::new(ReqwestHttpClient::new());
    let settings = Arc::new(SqliteSettingsStore::new(data_dir.join("settings.db")).await?);

    let config = CoreConfig::builder()
        .data_dir(&data_dir)
        .http_client(http.clone())
        .settings_store(settings.clone())
        .build()?;

    // Stored preferences are the baseline; CLI flags overlay them
    let prefs = PreferencesStore::new(settings);
    let stored = prefs.view_options().await?;
    let options = apply_flags(stored, env::args().skip(1));

    let pool = create_pool(DatabaseConfig::new(&config.cache_db_path)).await?;
    let gateway = Arc::new(SqliteCacheGateway::new(pool));
    let extractor = Arc::new(CoverExtractor::new(&config.covers_dir));
    let connector = Arc::new(ZoteroConnector::new(http, user_id, api_key)?);

    let events = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);
    let mut receiver = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                CoreEvent::Shelf(ShelfEvent::RefreshStarted { collection_key, .. }) => {
                    println!(
                        "refresh started (collection: {})",
                        collection_key.as_deref().unwrap_or("all")
                    );
                }
                CoreEvent::Shelf(ShelfEvent::ItemProcessed {
                    item_key,
                    cover_extracted,
                    ..
                }) => {
                    let cover = if cover_extracted { "cover" } else { "no cover" };
                    println!("  processed {} ({})", item_key, cover);
                }
                CoreEvent::Shelf(ShelfEvent::RefreshCompleted {
                    total_items,
                    covers_extracted,
                    duration_ms,
                    from_cache,
                    ..
                }) => {
                    println!(
                        "refresh completed: {} items, {} covers, {} ms{}",
                        total_items,
                        covers_extracted,
                        duration_ms,
                        if from_cache { " (from cache)" } else { "" }
                    );
                }
                _ => {}
            }
        }
    });

    let aggregator = ShelfAggregator::new(
        connector,
        gateway,
        extractor,
        events.clone(),
        AggregatorConfig::from_core(&config, username),
    );

    let outcome = aggregator.fetch_display_items(&options).await?;

    let mut items = outcome.items;
    sort_items(&mut items, options.sort_mode);

    println!("\n{} items ({:?}):", items.len(), outcome.origin);
    for item in &items {
        println!("  {}", item.display_label(options.display_mode));
    }

    Ok(())
}

fn apply_flags(base: ViewOptions, args: impl Iterator<Item = String>) -> ViewOptions {
    let mut options = base;
    let mut args = args;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--collection" => options.collection_key = args.next(),
            "--tag" => options.tag_filter = args.next(),
            "--books-only" => options.books_only = true,
            "--no-epubs" => options.show_epubs = false,
            "--no-pdfs" => options.show_pdfs = false,
            other => eprintln!("ignoring unknown flag: {}", other),
        }
    }

    options
}
