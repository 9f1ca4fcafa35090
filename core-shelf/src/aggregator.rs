//! Shelf Aggregation Pipeline
//!
//! Turns the user's Zotero library into a display-ready shelf: one fetch
//! call runs listing, filtering, parent resolution, per-item
//! materialization and cache persistence, and returns the finished item
//! list exactly once.
//!
//! ## Workflow
//!
//! 1. Short-circuit when neither file type is enabled (no network)
//! 2. Claim the single refresh slot; a concurrent run is rejected
//! 3. List attachment items scoped by collection and tag filter
//! 4. Keep only enabled MIME types (EPUB/PDF)
//! 5. Resolve parent metadata concurrently; a failed parent lookup keeps
//!    the attachment with its own thin metadata
//! 6. Apply the books-only filter on the resolved view
//! 7. Materialize each item under bounded concurrency: download (skipped
//!    when the file is already on disk), extract a cover, upsert the
//!    offline cache row
//!
//! ## Error Handling
//!
//! Failures inside step 7 degrade one item (no download path or no cover)
//! and never abort the run. Run-level failures surface as a single
//! [`ShelfError`]; connectivity failures fall back to the offline cache
//! instead, with [`ShelfError::NoCachedData`] reserved for the case where
//! the cache has nothing to show either.
//!
//! Progress crosses threads via the broadcast bus: one `RefreshStarted`,
//! one `ItemProcessed` per materialized item, then exactly one
//! `RefreshCompleted` or `RefreshFailed`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use core_cache::{CacheGateway, EntryFilter, EPUB_MIME, PDF_MIME};
use core_covers::CoverExtractor;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, MaintenanceEvent, ShelfEvent};
use core_runtime::prefs::ViewOptions;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use provider_zotero::{ZoteroConnector, ZoteroItem};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::collections::{build_tree, CollectionNode, CollectionRecord};
use crate::error::{Result, ShelfError};
use crate::item::{ResolvedMetadata, ShelfItem};

// ============================================================================
// Outcome Types
// ============================================================================

/// Where a delivered shelf came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// Fresh data from the Zotero API
    Remote,
    /// The offline cache, served after a connectivity failure or on request
    OfflineCache,
}

/// Result of one shelf fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ShelfOutcome {
    /// Display-ready items, unsorted; callers apply the sorter
    pub items: Vec<ShelfItem>,
    /// Whether the items are fresh or cached
    pub origin: DataOrigin,
}

/// Counts reported by a cache purge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    /// Cache rows deleted
    pub entries_removed: u64,
    /// Downloaded and cover files deleted
    pub files_removed: u64,
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings the aggregator needs beyond its injected collaborators
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Directory downloaded attachment binaries land in
    pub downloads_dir: PathBuf,

    /// Directory cover artifacts land in (used for purge/clear)
    pub covers_dir: PathBuf,

    /// Zotero username recorded on cache rows for permalink rebuilding
    pub username: String,

    /// Concurrency bound for per-item materialization
    pub max_concurrent_downloads: usize,

    /// Page size for attachment listing requests
    pub item_page_limit: u32,
}

impl AggregatorConfig {
    /// Derive aggregator settings from the core configuration
    pub fn from_core(config: &CoreConfig, username: impl Into<String>) -> Self {
        Self {
            downloads_dir: config.downloads_dir.clone(),
            covers_dir: config.covers_dir.clone(),
            username: username.into(),
            max_concurrent_downloads: config.max_concurrent_downloads,
            item_page_limit: config.item_page_limit,
        }
    }
}

// ============================================================================
// Refresh Guard
// ============================================================================

/// Releases the refresh slot when the run ends, on every exit path
struct RefreshGuard {
    slot: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// An attachment that passed every filter and is ready to materialize
struct PendingItem {
    attachment: ZoteroItem,
    metadata: ResolvedMetadata,
    collection_keys: Vec<String>,
}

/// Shelf aggregation pipeline over the Zotero connector, cover extractor
/// and offline cache gateway
pub struct ShelfAggregator {
    connector: Arc<ZoteroConnector>,
    gateway: Arc<dyn CacheGateway>,
    extractor: Arc<CoverExtractor>,
    events: EventBus,
    config: AggregatorConfig,
    refresh_active: Arc<AtomicBool>,
}

impl ShelfAggregator {
    /// Create a new aggregator
    pub fn new(
        connector: Arc<ZoteroConnector>,
        gateway: Arc<dyn CacheGateway>,
        extractor: Arc<CoverExtractor>,
        events: EventBus,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            connector,
            gateway,
            extractor,
            events,
            config,
            refresh_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fetch the display-ready shelf for the given view options
    ///
    /// Runs the full refresh pipeline and resolves exactly once, after
    /// every item has reported. Connectivity failures fall back to the
    /// offline cache; every other run-level failure is terminal.
    ///
    /// # Errors
    ///
    /// - [`ShelfError::RefreshInProgress`] while another run is active
    /// - [`ShelfError::EmptyCredentials`] re-raised from the connector
    /// - [`ShelfError::Api`] for terminal API failures
    /// - [`ShelfError::NoCachedData`] when both the network and the
    ///   offline cache come up empty
    #[instrument(skip(self, options), fields(
        collection = ?options.collection_key,
        books_only = options.books_only,
    ))]
    pub async fn fetch_display_items(&self, options: &ViewOptions) -> Result<ShelfOutcome> {
        if options.no_file_types_enabled() {
            debug!("No file types enabled, returning an empty shelf without fetching");
            return Ok(ShelfOutcome {
                items: Vec::new(),
                origin: DataOrigin::Remote,
            });
        }

        let _guard = self.begin_refresh()?;

        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        self.events
            .emit(CoreEvent::Shelf(ShelfEvent::RefreshStarted {
                run_id: run_id.clone(),
                collection_key: options.collection_key.clone(),
            }))
            .ok();

        match self.refresh_from_remote(&run_id, options).await {
            Ok(items) => {
                self.emit_completed(&run_id, &items, started, false);
                Ok(ShelfOutcome {
                    items,
                    origin: DataOrigin::Remote,
                })
            }
            Err(error) if is_connectivity(&error) => {
                warn!("Remote fetch failed with a connectivity error: {}", error);

                let cached = match self.load_cached(options).await {
                    Ok(cached) => cached,
                    Err(cache_error) => {
                        self.emit_failed(&run_id, &cache_error);
                        return Err(cache_error);
                    }
                };

                if cached.is_empty() {
                    let error = ShelfError::NoCachedData;
                    self.emit_failed(&run_id, &error);
                    return Err(error);
                }

                info!("Serving {} items from the offline cache", cached.len());
                self.emit_completed(&run_id, &cached, started, true);

                Ok(ShelfOutcome {
                    items: cached,
                    origin: DataOrigin::OfflineCache,
                })
            }
            Err(error) => {
                self.emit_failed(&run_id, &error);
                Err(error)
            }
        }
    }

    /// Read the shelf from the offline cache, bypassing the network
    ///
    /// Applies the same collection/MIME/books-only filters the online
    /// pipeline applies, expressed by the cache gateway in SQL.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Cache`] when the cache read fails.
    pub async fn load_cached(&self, options: &ViewOptions) -> Result<Vec<ShelfItem>> {
        let entries = self.gateway.query_filtered(&entry_filter(options)).await?;

        debug!("Loaded {} entries from the offline cache", entries.len());

        Ok(entries.into_iter().map(ShelfItem::from_cached).collect())
    }

    /// Fetch the collection tree for the sidebar
    ///
    /// Returns the pre-order node list with the synthetic "All
    /// Collections" root in front and the given key marked selected.
    #[instrument(skip(self))]
    pub async fn load_collections(&self, selected_key: &str) -> Result<Vec<CollectionNode>> {
        let collections = self.connector.list_collections().await?;

        let records: Vec<CollectionRecord> = collections
            .iter()
            .map(CollectionRecord::from_collection)
            .collect();
        let nodes = build_tree(&records, selected_key);

        self.events
            .emit(CoreEvent::Shelf(ShelfEvent::CollectionsLoaded {
                count: records.len() as u64,
            }))
            .ok();

        Ok(nodes)
    }

    /// Remove cache rows and local files not refreshed since `cutoff`
    ///
    /// Files are judged by mtime; downloads touch their file on reuse, so
    /// anything older than the cutoff was last needed before it.
    #[instrument(skip(self), fields(cutoff = %cutoff))]
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<PurgeStats> {
        info!("Purging cache entries older than cutoff");

        let entries_removed = self.gateway.delete_older_than(cutoff).await?;

        let mut files_removed = remove_stale_files(&self.config.downloads_dir, cutoff).await?;
        files_removed += remove_stale_files(&self.config.covers_dir, cutoff).await?;

        self.events
            .emit(CoreEvent::Maintenance(MaintenanceEvent::CachePurged {
                entries_removed,
                files_removed,
            }))
            .ok();

        info!(
            "Purged {} cache entries and {} files",
            entries_removed, files_removed
        );

        Ok(PurgeStats {
            entries_removed,
            files_removed,
        })
    }

    /// Drop the entire offline cache: every row, download and cover
    ///
    /// Returns the number of cache rows removed.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> Result<u64> {
        let removed = self.gateway.delete_all().await?;

        clear_dir(&self.config.downloads_dir).await?;
        clear_dir(&self.config.covers_dir).await?;

        self.events
            .emit(CoreEvent::Maintenance(MaintenanceEvent::CacheCleared))
            .ok();

        info!("Cleared the offline cache ({} entries)", removed);

        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Pipeline stages
    // ------------------------------------------------------------------

    /// Claim the single refresh slot; the guard's drop releases it
    fn begin_refresh(&self) -> Result<RefreshGuard> {
        let claimed = self
            .refresh_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if !claimed {
            return Err(ShelfError::RefreshInProgress);
        }

        Ok(RefreshGuard {
            slot: Arc::clone(&self.refresh_active),
        })
    }

    async fn refresh_from_remote(
        &self,
        run_id: &str,
        options: &ViewOptions,
    ) -> Result<Vec<ShelfItem>> {
        info!("Phase 1: Listing attachments");
        let attachments = self
            .connector
            .list_attachments(
                options.collection_key.as_deref(),
                options.tag_filter.as_deref(),
                self.config.item_page_limit,
            )
            .await?;

        info!("Phase 2: Filtering {} attachments by file type", attachments.len());
        let attachments = filter_by_mime(attachments, options);

        info!(
            "Phase 3: Resolving parent metadata for {} attachments",
            attachments.len()
        );
        let resolved = self.resolve_parents(attachments).await;

        let mut pending: Vec<PendingItem> = Vec::with_capacity(resolved.len());
        for (attachment, parent) in resolved {
            // The resolved view is built exactly once, here
            let metadata = ResolvedMetadata::resolve(&attachment, parent.as_ref());

            if options.books_only && !metadata.is_book_like() {
                debug!(item_key = %attachment.key, "Dropped by books-only filter");
                continue;
            }

            let collection_keys = collection_membership(
                &attachment,
                parent.as_ref(),
                options.collection_key.as_deref(),
            );

            pending.push(PendingItem {
                attachment,
                metadata,
                collection_keys,
            });
        }

        info!("Phase 4: Materializing {} items", pending.len());
        self.materialize_all(run_id, pending).await
    }

    /// Look up parent metadata for every attachment concurrently
    ///
    /// One lookup per attachment with a non-empty parent key; the join
    /// waits for every branch. A failed lookup resolves to `None` so the
    /// attachment stays on the shelf with its own metadata.
    async fn resolve_parents(
        &self,
        attachments: Vec<ZoteroItem>,
    ) -> Vec<(ZoteroItem, Option<ZoteroItem>)> {
        let lookups = attachments.into_iter().map(|attachment| async move {
            let parent = match attachment.data.parent_item.as_deref() {
                Some(parent_key) if !parent_key.is_empty() => {
                    match self.connector.get_item(parent_key).await {
                        Ok(parent) => Some(parent),
                        Err(error) => {
                            warn!(
                                item_key = %attachment.key,
                                parent_key,
                                "Parent lookup failed, keeping attachment metadata: {}",
                                error
                            );
                            None
                        }
                    }
                }
                _ => None,
            };

            (attachment, parent)
        });

        join_all(lookups).await
    }

    /// Materialize every pending item under the concurrency bound
    ///
    /// Completion order is arbitrary; the aggregate list is returned once
    /// after the last branch reports.
    async fn materialize_all(
        &self,
        run_id: &str,
        pending: Vec<PendingItem>,
    ) -> Result<Vec<ShelfItem>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.config.downloads_dir).await?;

        let updated_at = Utc::now();
        let mut materializations = stream::iter(
            pending
                .into_iter()
                .map(|item| self.materialize_item(run_id, item, updated_at)),
        )
        .buffer_unordered(self.config.max_concurrent_downloads);

        let mut items = Vec::new();
        while let Some(item) = materializations.next().await {
            items.push(item);
        }

        Ok(items)
    }

    /// Download, extract a cover and cache one item
    ///
    /// Infallible by contract: any failure degrades this item (missing
    /// download path or cover) and is logged, never propagated.
    async fn materialize_item(
        &self,
        run_id: &str,
        pending: PendingItem,
        updated_at: DateTime<Utc>,
    ) -> ShelfItem {
        let PendingItem {
            attachment,
            metadata,
            collection_keys,
        } = pending;

        let download_href = self.connector.download_url(&attachment);

        let download_path = match self.download_attachment(&attachment, &download_href).await {
            Ok(path) => Some(path),
            Err(error) => {
                warn!(item_key = %attachment.key, "Download failed: {}", error);
                None
            }
        };

        let cover_path = match &download_path {
            Some(path) => {
                match self
                    .extractor
                    .extract(path, attachment.data.content_type.as_deref())
                    .await
                {
                    Ok(artifact) => Some(artifact),
                    Err(error) => {
                        debug!(item_key = %attachment.key, "No cover extracted: {}", error);
                        None
                    }
                }
            }
            None => None,
        };

        let item = ShelfItem {
            key: attachment.key.clone(),
            metadata,
            mime_type: attachment.data.content_type.clone().unwrap_or_default(),
            download_href,
            download_path,
            cover_path,
            collection_keys,
        };

        if let Err(error) = self
            .gateway
            .upsert(&item.to_cached(&self.config.username, updated_at))
            .await
        {
            warn!(item_key = %item.key, "Cache upsert failed: {}", error);
        }

        self.events
            .emit(CoreEvent::Shelf(ShelfEvent::ItemProcessed {
                run_id: run_id.to_string(),
                item_key: item.key.clone(),
                cover_extracted: item.cover_path.is_some(),
            }))
            .ok();

        item
    }

    /// Download an attachment binary unless it is already on disk
    ///
    /// An existing file is reused and its mtime refreshed, which keeps
    /// age-based purging honest about what is still in use.
    async fn download_attachment(&self, attachment: &ZoteroItem, href: &str) -> Result<PathBuf> {
        let target = self.config.downloads_dir.join(download_file_name(attachment));

        if target.exists() {
            debug!(item_key = %attachment.key, "Attachment already on disk");
            touch(&target);
            return Ok(target);
        }

        let body = self.connector.download(href).await?;
        tokio::fs::write(&target, &body).await?;

        debug!(item_key = %attachment.key, bytes = body.len(), "Attachment downloaded");

        Ok(target)
    }

    fn emit_completed(&self, run_id: &str, items: &[ShelfItem], started: Instant, from_cache: bool) {
        let covers_extracted = items
            .iter()
            .filter(|item| item.cover_path.is_some())
            .count() as u64;

        self.events
            .emit(CoreEvent::Shelf(ShelfEvent::RefreshCompleted {
                run_id: run_id.to_string(),
                total_items: items.len() as u64,
                covers_extracted,
                duration_ms: started.elapsed().as_millis() as u64,
                from_cache,
            }))
            .ok();
    }

    fn emit_failed(&self, run_id: &str, error: &ShelfError) {
        self.events
            .emit(CoreEvent::Shelf(ShelfEvent::RefreshFailed {
                run_id: run_id.to_string(),
                message: error.to_string(),
            }))
            .ok();
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_connectivity(error: &ShelfError) -> bool {
    matches!(error, ShelfError::Api(api) if api.is_connectivity())
}

/// Keep only attachments whose MIME type is enabled in the view options
fn filter_by_mime(items: Vec<ZoteroItem>, options: &ViewOptions) -> Vec<ZoteroItem> {
    items
        .into_iter()
        .filter(|item| match item.data.content_type.as_deref() {
            Some(EPUB_MIME) => options.show_epubs,
            Some(PDF_MIME) => options.show_pdfs,
            _ => false,
        })
        .collect()
}

/// Collections an item belongs to: the attachment's own, the parent's,
/// and the scope key of a collection-scoped fetch
///
/// Zotero keeps membership on the parent record for child attachments,
/// so the attachment's own list is usually empty.
fn collection_membership(
    attachment: &ZoteroItem,
    parent: Option<&ZoteroItem>,
    scoped_key: Option<&str>,
) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();

    let inherited = attachment
        .data
        .collections
        .iter()
        .chain(parent.into_iter().flat_map(|p| p.data.collections.iter()));
    for key in inherited {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.clone());
        }
    }

    if let Some(scoped) = scoped_key {
        if !keys.iter().any(|existing| existing == scoped) {
            keys.push(scoped.to_string());
        }
    }

    keys
}

/// File name an attachment downloads to: `{key}_{filename}`
///
/// The item key prefix keeps same-named files from different items apart;
/// the original name keeps the extension the cover extractor falls back
/// on. Path separators in API-supplied names are neutralized.
fn download_file_name(attachment: &ZoteroItem) -> String {
    match attachment.data.filename.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => {
            let safe: String = name
                .chars()
                .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
                .collect();
            format!("{}_{}", attachment.key, safe)
        }
        None => {
            let extension = match attachment.data.content_type.as_deref() {
                Some(EPUB_MIME) => "epub",
                Some(PDF_MIME) => "pdf",
                _ => "bin",
            };
            format!("{}.{}", attachment.key, extension)
        }
    }
}

fn entry_filter(options: &ViewOptions) -> EntryFilter {
    EntryFilter {
        collection_key: options.collection_key.clone(),
        show_epubs: options.show_epubs,
        show_pdfs: options.show_pdfs,
        books_only: options.books_only,
    }
}

/// Refresh a file's mtime to mark it as recently used; best-effort
fn touch(path: &Path) {
    let refreshed = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|file| file.set_modified(std::time::SystemTime::now()));

    if let Err(error) = refreshed {
        debug!("Could not refresh mtime for {}: {}", path.display(), error);
    }
}

/// Delete regular files in `dir` whose mtime predates `cutoff`
async fn remove_stale_files(dir: &Path, cutoff: DateTime<Utc>) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0u64;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(time) => time.into(),
            Err(_) => continue,
        };

        if modified < cutoff {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Delete every regular file in `dir`
async fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.metadata().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
