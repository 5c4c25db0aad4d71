//! Read-state synchronization
//!
//! Read transitions are optimistic: the local flag flips immediately and is
//! never rolled back. Backend persistence runs afterwards, sequentially
//! (await in a loop) to avoid bursting the backend, and best-effort: a 404
//! means the notice is already gone and counts as resolved; any other
//! failure marks the transition `Failed` and leaves it queued for a retry
//! on the next poll cycle.

use crate::client::BackendClient;
use crate::state::FeedStore;
use async_trait::async_trait;
use campus_common::events::{EventBus, ItemKey, NotifyEvent};
use campus_common::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::feed::SyncState;

/// Destination for read-state persistence. The seam exists so the drain
/// logic can be exercised against a counting fake in tests.
#[async_trait]
pub trait ReadSink: Send + Sync {
    /// Persist one read transition; class-scoped notices use a distinct
    /// endpoint from general notices.
    async fn persist_read(&self, key: ItemKey, class_id: Option<i64>) -> Result<()>;
}

#[async_trait]
impl ReadSink for BackendClient {
    async fn persist_read(&self, key: ItemKey, class_id: Option<i64>) -> Result<()> {
        match class_id {
            Some(_) => self.mark_class_notice_read(key.id).await,
            None => self.mark_notice_read(key.id).await,
        }
    }
}

/// Mark the given items read, broadcast the transition, then drain the
/// persistence queue. Returns the unread count after the transition.
///
/// `ItemsRead` carries only the keys that actually flipped; unknown and
/// already-read keys produce no event.
pub async fn mark_items_read<S: ReadSink + ?Sized>(
    store: &RwLock<FeedStore>,
    bus: &EventBus,
    sink: &S,
    keys: &[ItemKey],
) -> usize {
    let (flipped, unread) = {
        let mut store = store.write().await;
        let flipped = store.mark_read_local(keys);
        (flipped, store.unread_count())
    };

    if !flipped.is_empty() {
        bus.emit_lossy(NotifyEvent::ItemsRead {
            keys: flipped,
            unread,
            timestamp: Utc::now(),
        });
    }

    drain_pending(store, bus, sink).await;
    unread
}

/// Mark every unread item read
pub async fn mark_all_read<S: ReadSink + ?Sized>(
    store: &RwLock<FeedStore>,
    bus: &EventBus,
    sink: &S,
) -> usize {
    let keys = store.read().await.unread_keys();
    mark_items_read(store, bus, sink, &keys).await
}

/// Drain the persistence queue sequentially.
///
/// The store lock is held only around state updates, never across the
/// network await, so feed reads stay responsive while persistence runs.
pub async fn drain_pending<S: ReadSink + ?Sized>(
    store: &RwLock<FeedStore>,
    bus: &EventBus,
    sink: &S,
) {
    loop {
        let entry = {
            let mut store = store.write().await;
            store.ledger.pending.pop_front()
        };
        let Some(entry) = entry else {
            break;
        };

        match sink.persist_read(entry.key, entry.class_id).await {
            Ok(()) => {
                store.write().await.set_sync(entry.key, SyncState::Confirmed);
            }
            Err(e) if e.is_not_found() => {
                // Already resolved on the backend; skip silently
                store.write().await.set_sync(entry.key, SyncState::Confirmed);
            }
            Err(e) => {
                debug!(key = %entry.key, error = %e, "read persistence failed");
                let mut locked = store.write().await;
                locked.set_sync(entry.key, SyncState::Failed);
                locked.ledger.failed.push(entry);
                drop(locked);
                bus.emit_lossy(NotifyEvent::ReadSyncFailed {
                    key: entry.key,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

/// Re-attempt previously failed persistence (called once per poll cycle)
pub async fn retry_failed<S: ReadSink + ?Sized>(
    store: &RwLock<FeedStore>,
    bus: &EventBus,
    sink: &S,
) {
    let requeued = store.write().await.requeue_failed();
    if requeued > 0 {
        debug!(count = requeued, "retrying failed read persistence");
        drain_pending(store, bus, sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Expiry, NotificationItem};
    use campus_common::events::ItemKind;
    use campus_common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSink {
        calls: AtomicUsize,
        class_calls: AtomicUsize,
        fail_ids: Mutex<Vec<i64>>,
        not_found_ids: Mutex<Vec<i64>>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                class_calls: AtomicUsize::new(0),
                fail_ids: Mutex::new(Vec::new()),
                not_found_ids: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReadSink for CountingSink {
        async fn persist_read(&self, key: ItemKey, class_id: Option<i64>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if class_id.is_some() {
                self.class_calls.fetch_add(1, Ordering::SeqCst);
            }
            if self.not_found_ids.lock().unwrap().contains(&key.id) {
                return Err(Error::NotFound(format!("notice {} not found", key.id)));
            }
            if self.fail_ids.lock().unwrap().contains(&key.id) {
                return Err(Error::Internal("backend unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn notice(id: i64, class_id: Option<i64>) -> NotificationItem {
        NotificationItem {
            key: ItemKey::new(ItemKind::Notice, id),
            title: format!("n{}", id),
            date: Some(Utc::now()),
            subject: None,
            class_name: None,
            class_id,
            created_by: None,
            expiry: Expiry::None,
            body: None,
            read: false,
            sync: SyncState::Unsynced,
        }
    }

    fn store_with(items: Vec<NotificationItem>) -> RwLock<FeedStore> {
        let mut store = FeedStore::default();
        store.publish(items, Utc::now());
        RwLock::new(store)
    }

    #[tokio::test]
    async fn test_mark_all_read_one_call_per_item() {
        let store = store_with(vec![notice(1, None), notice(2, None), notice(3, Some(7))]);
        let bus = EventBus::new(16);
        let sink = CountingSink::new();

        let unread = mark_all_read(&store, &bus, &sink).await;

        assert_eq!(unread, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
        // Class-scoped notice went to the class endpoint
        assert_eq!(sink.class_calls.load(Ordering::SeqCst), 1);

        let store = store.read().await;
        assert!(store.items.iter().all(|i| i.read));
        assert!(store
            .items
            .iter()
            .all(|i| i.sync == SyncState::Confirmed));
    }

    #[tokio::test]
    async fn test_items_read_event_carries_unread_count() {
        let store = store_with(vec![notice(1, None), notice(2, None)]);
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let sink = CountingSink::new();

        mark_items_read(&store, &bus, &sink, &[ItemKey::new(ItemKind::Notice, 1)]).await;

        let event = rx.try_recv().expect("ItemsRead event");
        match event {
            NotifyEvent::ItemsRead { keys, unread, .. } => {
                assert_eq!(keys, vec![ItemKey::new(ItemKind::Notice, 1)]);
                assert_eq!(unread, 1);
            }
            other => panic!("unexpected event {:?}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_no_event_when_nothing_flips() {
        let store = store_with(vec![notice(1, None)]);
        let bus = EventBus::new(16);
        let sink = CountingSink::new();

        mark_items_read(&store, &bus, &sink, &[ItemKey::new(ItemKind::Notice, 1)]).await;

        // Subscribe after the first transition; re-marking the same item and
        // marking an unknown key must both stay silent.
        let mut rx = bus.subscribe();
        mark_items_read(&store, &bus, &sink, &[ItemKey::new(ItemKind::Notice, 1)]).await;
        mark_items_read(&store, &bus, &sink, &[ItemKey::new(ItemKind::Notice, 99)]).await;

        assert!(rx.try_recv().is_err(), "no spurious ItemsRead events");
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_counts_as_confirmed() {
        let store = store_with(vec![notice(9, None)]);
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let sink = CountingSink::new();
        sink.not_found_ids.lock().unwrap().push(9);

        mark_all_read(&store, &bus, &sink).await;

        assert_eq!(
            store.read().await.items[0].sync,
            SyncState::Confirmed,
            "404 means already resolved"
        );
        // ItemsRead only; no ReadSyncFailed
        assert_eq!(rx.try_recv().expect("event").event_type(), "ItemsRead");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_keeps_read_flag_and_queues_retry() {
        let store = store_with(vec![notice(5, None)]);
        let bus = EventBus::new(16);
        let sink = CountingSink::new();
        sink.fail_ids.lock().unwrap().push(5);

        mark_all_read(&store, &bus, &sink).await;

        {
            let locked = store.read().await;
            // Optimistic flag not rolled back
            assert!(locked.items[0].read);
            assert_eq!(locked.items[0].sync, SyncState::Failed);
            assert_eq!(locked.ledger.failed.len(), 1);
        }

        // Backend recovers; retry pass confirms
        sink.fail_ids.lock().unwrap().clear();
        retry_failed(&store, &bus, &sink).await;

        let locked = store.read().await;
        assert_eq!(locked.items[0].sync, SyncState::Confirmed);
        assert!(locked.ledger.failed.is_empty());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }
}
