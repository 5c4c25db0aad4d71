//! Event types for the campus event system
//!
//! Provides shared event definitions and EventBus for campus modules.
//! The EventBus replaces the browser-global custom-event channel the web
//! client used for cross-component invalidation: subscribers get an explicit
//! broadcast receiver instead of listening on ambient global state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Kind discriminator for feed items.
///
/// Dedup and read-state are keyed by `(kind, id)` rather than bare id so a
/// notice and an exam sharing a numeric id can never shadow each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Notice,
    Exam,
    Result,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Notice => write!(f, "notice"),
            ItemKind::Exam => write!(f, "exam"),
            ItemKind::Result => write!(f, "result"),
        }
    }
}

/// Composite identity of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: i64,
}

impl ItemKey {
    pub fn new(kind: ItemKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Campus notification events
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission to connected UI clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyEvent {
    /// Something mutated notices; feed holders should re-fetch.
    ///
    /// Triggers:
    /// - Poller: immediate refresh cycle
    /// - SSE: forward to connected clients
    NoticesChanged {
        /// When the change was signalled
        timestamp: DateTime<Utc>,
    },

    /// A fetch cycle completed and the feed snapshot was replaced.
    ///
    /// Triggers:
    /// - SSE: update list and badge without a client refetch
    FeedRefreshed {
        /// Items in the new snapshot
        total: usize,
        /// Unread items in the new snapshot
        unread: usize,
        /// When the snapshot was published
        timestamp: DateTime<Utc>,
    },

    /// Items transitioned unread -> read (optimistic, local).
    ///
    /// Triggers:
    /// - SSE: nav badge update on other mounted surfaces
    ItemsRead {
        /// Keys of the affected items
        keys: Vec<ItemKey>,
        /// Unread items remaining after the transition
        unread: usize,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Backend read-persistence failed for one item.
    ///
    /// The local read flag is NOT rolled back; the key stays queued for a
    /// background retry on the next poll cycle.
    ReadSyncFailed {
        /// Key of the item whose persistence failed
        key: ItemKey,
        /// Error message detail
        error: String,
        /// When the failure occurred
        timestamp: DateTime<Utc>,
    },
}

impl NotifyEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            NotifyEvent::NoticesChanged { .. } => "NoticesChanged",
            NotifyEvent::FeedRefreshed { .. } => "FeedRefreshed",
            NotifyEvent::ItemsRead { .. } => "ItemsRead",
            NotifyEvent::ReadSyncFailed { .. } => "ReadSyncFailed",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NotifyEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<NotifyEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: NotifyEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<NotifyEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for fire-and-forget broadcasts where it is acceptable that no
    /// component is currently listening (the web client's custom events had
    /// the same no-delivery-guarantee semantics).
    pub fn emit_lossy(&self, event: NotifyEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
