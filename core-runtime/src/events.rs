//! # Event Bus
//!
//! Progress and maintenance notifications for shelf refresh runs, built on
//! `tokio::sync::broadcast`.
//!
//! The aggregator is the producer: it announces when a refresh run starts,
//! as each attachment finishes its download/extract/cache pipeline, and when
//! the run completes or fails. UI shells subscribe to drive progress bars and
//! toast notifications without polling; a logging subscriber can mirror the
//! same stream into tracing output.
//!
//! ```text
//!                 ┌──────────┐   subscribe   ┌───────────────┐
//!  aggregator ───>│ EventBus ├──────────────>│ UI shell      │
//!  (emit)         │          ├──────────────>│ log mirror    │
//!                 └──────────┘               └───────────────┘
//! ```
//!
//! ## Consuming events
//!
//! Every call to [`EventBus::subscribe`] yields an independent receiver that
//! sees all events emitted after that point. [`EventStream`] wraps a receiver
//! with an optional predicate for callers that only care about a slice of the
//! stream:
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut maintenance = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Maintenance(_)));
//! # }
//! ```
//!
//! ## Lag and shutdown
//!
//! Broadcast receivers that fall more than the channel capacity behind get
//! `RecvError::Lagged(n)` with the number of dropped events; the stream stays
//! usable afterwards, so subscribers should log the gap and keep reading.
//! `RecvError::Closed` means every `EventBus` clone is gone and the consumer
//! loop should exit.
//!
//! Events derive `Serialize`/`Deserialize` so shells outside the Rust process
//! (a webview, a test harness) can take them as JSON lines. The envelope is
//! `{"type": "Shelf", "payload": {"event": "RefreshCompleted", ...}}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default channel capacity.
///
/// A refresh run emits one `ItemProcessed` per attachment plus a handful of
/// lifecycle events, so 100 absorbs a full run against a large library even
/// when the subscriber only drains between awaits.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Types
// ============================================================================

/// Envelope for every event the core publishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Shelf refresh and collection events
    Shelf(ShelfEvent),
    /// Cache maintenance events
    Maintenance(MaintenanceEvent),
}

impl CoreEvent {
    /// Short human-readable label, suitable for log lines and toasts.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Shelf(e) => e.description(),
            CoreEvent::Maintenance(e) => e.description(),
        }
    }

    /// Coarse severity, so subscribers can mute progress chatter.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Shelf(ShelfEvent::RefreshFailed { .. }) => EventSeverity::Error,
            CoreEvent::Shelf(ShelfEvent::RefreshCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Maintenance(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Severity attached to each event.
///
/// Ordered so `severity() >= EventSeverity::Warning` works as a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Per-item progress; high volume during a refresh.
    Debug,
    /// Run lifecycle and maintenance outcomes.
    Info,
    /// Degraded but continuing.
    Warning,
    /// The run stopped.
    Error,
}

/// Events emitted during shelf refresh runs and collection loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ShelfEvent {
    /// A shelf refresh run began.
    RefreshStarted {
        /// Unique identifier for this refresh run.
        run_id: String,
        /// Collection the run is scoped to, if any.
        collection_key: Option<String>,
    },
    /// An attachment finished its download/extract/cache pipeline.
    ItemProcessed {
        /// The refresh run ID.
        run_id: String,
        /// The attachment item key.
        item_key: String,
        /// Whether a cover thumbnail was produced for this item.
        cover_extracted: bool,
    },
    /// Refresh finished and items are ready for display.
    RefreshCompleted {
        /// The refresh run ID.
        run_id: String,
        /// Total items delivered.
        total_items: u64,
        /// Number of items with a cover thumbnail.
        covers_extracted: u64,
        /// Duration of the run in milliseconds.
        duration_ms: u64,
        /// Whether the items came from the offline cache instead of the API.
        from_cache: bool,
    },
    /// Refresh stopped with an error.
    RefreshFailed {
        /// The refresh run ID.
        run_id: String,
        /// Human-readable error message.
        message: String,
    },
    /// The collection tree was fetched from the API.
    CollectionsLoaded {
        /// Number of collections in the library.
        count: u64,
    },
}

impl ShelfEvent {
    fn description(&self) -> &str {
        match self {
            ShelfEvent::RefreshStarted { .. } => "Shelf refresh started",
            ShelfEvent::ItemProcessed { .. } => "Attachment processed",
            ShelfEvent::RefreshCompleted { .. } => "Shelf refresh completed",
            ShelfEvent::RefreshFailed { .. } => "Shelf refresh failed",
            ShelfEvent::CollectionsLoaded { .. } => "Collections loaded",
        }
    }
}

/// Events related to offline cache maintenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MaintenanceEvent {
    /// Stale cache entries and their files were removed.
    CachePurged {
        /// Number of database entries deleted.
        entries_removed: u64,
        /// Number of downloaded/cover files deleted.
        files_removed: u64,
    },
    /// The entire offline cache was dropped.
    CacheCleared,
}

impl MaintenanceEvent {
    fn description(&self) -> &str {
        match self {
            MaintenanceEvent::CachePurged { .. } => "Stale cache entries purged",
            MaintenanceEvent::CacheCleared => "Offline cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable handle to the broadcast channel.
///
/// Cloning the bus gives another producer; every [`subscribe`](EventBus::subscribe)
/// gives an independent consumer. Emitting never blocks the producer; a slow
/// consumer only hurts itself (see the module docs on lag).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus whose receivers can buffer `capacity` events each.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let bus = EventBus::new(64);
    /// assert_eq!(bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Returns how many subscribers received it, or an error holding the
    /// event back when nobody is listening. Callers that treat events as
    /// fire-and-forget discard the result with `.ok()`:
    ///
    /// ```rust
    /// use core_runtime::events::{CoreEvent, EventBus, MaintenanceEvent};
    ///
    /// let bus = EventBus::new(64);
    /// bus.emit(CoreEvent::Maintenance(MaintenanceEvent::CacheCleared)).ok();
    /// ```
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Registers a new subscriber.
    ///
    /// The receiver only sees events emitted after this call; nothing is
    /// replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A receiver with an optional predicate applied on the consuming side.
///
/// Filtering happens in the subscriber, not the bus: non-matching events are
/// still delivered to the underlying receiver and count toward its buffer,
/// they are just skipped silently by [`recv`](EventStream::recv).
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Wraps a raw receiver; without a filter it passes everything through.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Restricts the stream to events matching `predicate`.
    ///
    /// ```rust
    /// use core_runtime::events::{CoreEvent, EventBus, EventStream, EventSeverity};
    ///
    /// let bus = EventBus::new(64);
    /// let important = EventStream::new(bus.subscribe())
    ///     .filter(|event| event.severity() >= EventSeverity::Warning);
    /// ```
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn passes(&self, event: &CoreEvent) -> bool {
        match &self.filter {
            Some(predicate) => predicate(event),
            None => true,
        }
    }

    /// Waits for the next event that passes the filter.
    ///
    /// Lag is surfaced to the caller rather than swallowed, since a gap may
    /// have dropped matching events.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.passes(&event) {
                return Ok(event);
            }
        }
    }

    /// Drains the next matching event without waiting.
    ///
    /// Returns `None` once the buffer holds no further matching events.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.passes(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(run: &str, key: &str, cover: bool) -> CoreEvent {
        CoreEvent::Shelf(ShelfEvent::ItemProcessed {
            run_id: run.to_string(),
            item_key: key.to_string(),
            cover_extracted: cover,
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_rejected() {
        let bus = EventBus::new(8);
        let result = bus.emit(CoreEvent::Maintenance(MaintenanceEvent::CacheCleared));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_count_follows_subscribe_and_drop() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);

        let first = bus.subscribe();
        let second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(first);
        drop(second);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_the_whole_run() {
        let bus = EventBus::new(16);
        let mut ui = bus.subscribe();
        let mut mirror = bus.subscribe();

        let start = CoreEvent::Shelf(ShelfEvent::RefreshStarted {
            run_id: "run-7".to_string(),
            collection_key: Some("SCIFI123".to_string()),
        });
        let done = CoreEvent::Shelf(ShelfEvent::RefreshCompleted {
            run_id: "run-7".to_string(),
            total_items: 2,
            covers_extracted: 1,
            duration_ms: 830,
            from_cache: false,
        });

        let delivered = bus.emit(start.clone()).unwrap();
        assert_eq!(delivered, 2);
        bus.emit(processed("run-7", "AAAA1111", true)).unwrap();
        bus.emit(done.clone()).unwrap();

        for sub in [&mut ui, &mut mirror] {
            assert_eq!(sub.recv().await.unwrap(), start);
            assert_eq!(sub.recv().await.unwrap(), processed("run-7", "AAAA1111", true));
            assert_eq!(sub.recv().await.unwrap(), done);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(8);
        let mut early = bus.subscribe();

        bus.emit(processed("run-1", "BBBB2222", false)).unwrap();

        let mut late = EventStream::new(bus.subscribe());
        assert!(late.try_recv().is_none());
        assert!(early.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();

        for i in 0..10 {
            bus.emit(processed("run-1", &format!("ITEM{i:04}"), false))
                .unwrap();
        }

        // The oldest events were overwritten; recv reports the gap once and
        // then resumes from what is still buffered.
        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
        assert!(sub.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_filtered_stream_skips_other_categories() {
        let bus = EventBus::new(8);
        let mut maintenance = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Maintenance(_)));

        bus.emit(processed("run-2", "CCCC3333", true)).unwrap();
        let purged = CoreEvent::Maintenance(MaintenanceEvent::CachePurged {
            entries_removed: 3,
            files_removed: 6,
        });
        bus.emit(purged.clone()).unwrap();

        assert_eq!(maintenance.recv().await.unwrap(), purged);
    }

    #[tokio::test]
    async fn test_severity_filter_mutes_progress_chatter() {
        let bus = EventBus::new(8);
        let mut important = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() >= EventSeverity::Warning);

        bus.emit(processed("run-3", "DDDD4444", true)).unwrap();
        let failed = CoreEvent::Shelf(ShelfEvent::RefreshFailed {
            run_id: "run-3".to_string(),
            message: "Zotero API error 500".to_string(),
        });
        bus.emit(failed.clone()).unwrap();

        assert_eq!(important.recv().await.unwrap(), failed);
        assert!(important.try_recv().is_none());
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            processed("run-4", "EEEE5555", false).severity(),
            EventSeverity::Debug
        );
        assert_eq!(
            CoreEvent::Maintenance(MaintenanceEvent::CacheCleared).severity(),
            EventSeverity::Info
        );
        assert_eq!(
            CoreEvent::Shelf(ShelfEvent::RefreshFailed {
                run_id: "run-4".to_string(),
                message: "credentials rejected".to_string(),
            })
            .severity(),
            EventSeverity::Error
        );
    }

    #[test]
    fn test_descriptions_are_stable_labels() {
        let completed = CoreEvent::Shelf(ShelfEvent::RefreshCompleted {
            run_id: "run-5".to_string(),
            total_items: 10,
            covers_extracted: 8,
            duration_ms: 900,
            from_cache: true,
        });
        assert_eq!(completed.description(), "Shelf refresh completed");
        assert_eq!(
            CoreEvent::Maintenance(MaintenanceEvent::CacheCleared).description(),
            "Offline cache cleared"
        );
    }

    #[tokio::test]
    async fn test_concurrent_producers_interleave_without_loss() {
        let bus = EventBus::new(64);
        let mut sub = bus.subscribe();

        let pipeline = bus.clone();
        let collections = bus.clone();

        let fan_out = tokio::spawn(async move {
            for i in 0..8 {
                pipeline
                    .emit(processed("run-6", &format!("FFFF{i:04}"), i % 2 == 0))
                    .ok();
            }
        });
        let tree = tokio::spawn(async move {
            for count in 0..5 {
                collections
                    .emit(CoreEvent::Shelf(ShelfEvent::CollectionsLoaded { count }))
                    .ok();
            }
        });

        fan_out.await.unwrap();
        tree.await.unwrap();

        let mut received = 0;
        while sub.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 13);
    }

    #[test]
    fn test_json_envelope_shape() {
        let event = CoreEvent::Shelf(ShelfEvent::RefreshCompleted {
            run_id: "run-123".to_string(),
            total_items: 50,
            covers_extracted: 48,
            duration_ms: 2100,
            from_cache: false,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"Shelf""#));
        assert!(json.contains(r#""event":"RefreshCompleted""#));
        assert!(json.contains(r#""run_id":"run-123""#));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_try_recv_on_empty_stream() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(CoreEvent::Shelf(ShelfEvent::CollectionsLoaded { count: 4 }))
            .unwrap();
        assert!(matches!(stream.try_recv(), Some(Ok(_))));
        assert!(stream.try_recv().is_none());
    }
}
