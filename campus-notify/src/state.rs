//! In-memory feed state
//!
//! `FeedStore` holds the current snapshot of pipeline output plus the read
//! ledger. Items are rebuilt from scratch on every fetch cycle; the ledger
//! carries read/sync state across rebuilds so a refresh never un-reads an
//! item (the local read flag is monotonic).

use crate::feed::{NotificationItem, SyncState};
use campus_common::events::ItemKey;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};

/// A read transition awaiting backend persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSync {
    pub key: ItemKey,
    /// Class scope routes persistence to the class-notice endpoint
    pub class_id: Option<i64>,
}

/// Read/sync bookkeeping that survives snapshot rebuilds
#[derive(Debug, Default)]
pub struct ReadLedger {
    read: HashSet<ItemKey>,
    sync: HashMap<ItemKey, SyncState>,
    /// Transitions queued for sequential backend persistence
    pub pending: VecDeque<PendingSync>,
    /// Transitions whose persistence failed, held for background retry
    pub failed: Vec<PendingSync>,
}

impl ReadLedger {
    pub fn is_read(&self, key: ItemKey) -> bool {
        self.read.contains(&key)
    }

    pub fn sync_state(&self, key: ItemKey) -> SyncState {
        self.sync.get(&key).copied().unwrap_or(SyncState::Unsynced)
    }

    pub fn set_sync(&mut self, key: ItemKey, state: SyncState) {
        self.sync.insert(key, state);
    }
}

/// Current feed snapshot plus read ledger
#[derive(Debug, Default)]
pub struct FeedStore {
    /// Deduped, filtered, sorted items from the latest fetch cycle
    pub items: Vec<NotificationItem>,
    /// When the latest snapshot was published
    pub refreshed_at: Option<DateTime<Utc>>,
    pub ledger: ReadLedger,
}

impl FeedStore {
    /// Replace the snapshot with freshly rebuilt items, re-applying the
    /// ledger so previously read items stay read.
    pub fn publish(&mut self, mut items: Vec<NotificationItem>, now: DateTime<Utc>) {
        for item in &mut items {
            if self.ledger.is_read(item.key) {
                item.read = true;
            }
            item.sync = self.ledger.sync_state(item.key);
        }
        self.items = items;
        self.refreshed_at = Some(now);
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Mark the given items read locally (optimistic, monotonic).
    ///
    /// Returns the keys that actually transitioned unread -> read; unknown
    /// and already-read keys are ignored. Transitions needing backend
    /// persistence are queued on the ledger; items without a read endpoint
    /// (exams, results) are confirmed immediately.
    pub fn mark_read_local(&mut self, keys: &[ItemKey]) -> Vec<ItemKey> {
        let mut flipped = Vec::new();
        for key in keys {
            let Some(item) = self.items.iter_mut().find(|item| item.key == *key) else {
                continue;
            };
            if item.read {
                continue;
            }
            item.read = true;
            self.ledger.read.insert(item.key);
            flipped.push(item.key);

            if item.has_read_endpoint() {
                item.sync = SyncState::Pending;
                self.ledger.set_sync(item.key, SyncState::Pending);
                self.ledger.pending.push_back(PendingSync {
                    key: item.key,
                    class_id: item.class_id,
                });
            } else {
                item.sync = SyncState::Confirmed;
                self.ledger.set_sync(item.key, SyncState::Confirmed);
            }
        }
        flipped
    }

    /// Keys of all currently unread items
    pub fn unread_keys(&self) -> Vec<ItemKey> {
        self.items
            .iter()
            .filter(|item| !item.read)
            .map(|item| item.key)
            .collect()
    }

    /// Record a persistence outcome on both ledger and live snapshot
    pub fn set_sync(&mut self, key: ItemKey, state: SyncState) {
        self.ledger.set_sync(key, state);
        if let Some(item) = self.items.iter_mut().find(|item| item.key == key) {
            item.sync = state;
        }
    }

    /// Move failed transitions back onto the pending queue for retry
    pub fn requeue_failed(&mut self) -> usize {
        let failed = std::mem::take(&mut self.ledger.failed);
        let count = failed.len();
        for entry in failed {
            self.set_sync(entry.key, SyncState::Pending);
            self.ledger.pending.push_back(entry);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Expiry;
    use campus_common::events::ItemKind;

    fn item(kind: ItemKind, id: i64, class_id: Option<i64>) -> NotificationItem {
        NotificationItem {
            key: ItemKey::new(kind, id),
            title: format!("{}", id),
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

    #[test]
    fn test_publish_preserves_read_flags_across_rebuild() {
        let mut store = FeedStore::default();
        store.publish(vec![item(ItemKind::Notice, 1, None)], Utc::now());
        store.mark_read_local(&[ItemKey::new(ItemKind::Notice, 1)]);
        assert_eq!(store.unread_count(), 0);

        // Next fetch cycle rebuilds the same item from scratch
        store.publish(vec![item(ItemKind::Notice, 1, None)], Utc::now());
        assert!(store.items[0].read, "read flag must survive a refetch");
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_mark_read_is_monotonic_and_idempotent() {
        let mut store = FeedStore::default();
        store.publish(vec![item(ItemKind::Notice, 1, None)], Utc::now());

        let key = ItemKey::new(ItemKind::Notice, 1);
        let first = store.mark_read_local(&[key]);
        assert_eq!(first, vec![key]);
        assert_eq!(store.ledger.pending.len(), 1);

        // Second mark of the same item flips nothing and queues nothing
        let second = store.mark_read_local(&[key]);
        assert!(second.is_empty());
        assert_eq!(store.ledger.pending.len(), 1);
        assert!(store.items[0].read);
    }

    #[test]
    fn test_unknown_key_flips_nothing() {
        let mut store = FeedStore::default();
        store.publish(vec![item(ItemKind::Notice, 1, None)], Utc::now());

        let flipped = store.mark_read_local(&[ItemKey::new(ItemKind::Notice, 99)]);
        assert!(flipped.is_empty());
        assert!(store.ledger.pending.is_empty());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_items_without_read_endpoint_confirm_locally() {
        let mut store = FeedStore::default();
        store.publish(
            vec![
                item(ItemKind::Exam, 1, None),
                item(ItemKind::Result, 2, None),
            ],
            Utc::now(),
        );

        let flipped = store.mark_read_local(&store.unread_keys());
        assert_eq!(flipped.len(), 2);
        assert!(
            store.ledger.pending.is_empty(),
            "exams/results have no read endpoint"
        );
        assert_eq!(store.items[0].sync, SyncState::Confirmed);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_class_notice_routes_with_class_id() {
        let mut store = FeedStore::default();
        store.publish(vec![item(ItemKind::Notice, 3, Some(12))], Utc::now());

        store.mark_read_local(&[ItemKey::new(ItemKind::Notice, 3)]);
        let queued = store.ledger.pending.front().expect("queued");
        assert_eq!(queued.class_id, Some(12));
    }

    #[test]
    fn test_requeue_failed_moves_back_to_pending() {
        let mut store = FeedStore::default();
        store.publish(vec![item(ItemKind::Notice, 1, None)], Utc::now());
        store.mark_read_local(&[ItemKey::new(ItemKind::Notice, 1)]);

        let entry = store.ledger.pending.pop_front().expect("queued");
        store.set_sync(entry.key, SyncState::Failed);
        store.ledger.failed.push(entry);

        assert_eq!(store.requeue_failed(), 1);
        assert_eq!(store.ledger.pending.len(), 1);
        assert_eq!(store.items[0].sync, SyncState::Pending);
        // The local read flag never rolled back through any of this
        assert!(store.items[0].read);
    }
}
