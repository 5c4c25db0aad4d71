//! Deduplication and validity filtering
//!
//! Input order matters: the merged list arrives in feed-priority order
//! (active > urgent > general notices, then exams, schedule, results) and
//! deduplication keeps the first occurrence of each `(kind, id)` key.
//!
//! Validity is tiered because source kinds use date semantics differently:
//! an exam's date is a future event, a notice's expiry is a deadline, and a
//! generic item's date is a creation timestamp subject to the rolling stale
//! window.

use super::{Expiry, NotificationItem};
use campus_common::events::{ItemKey, ItemKind};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Keep the first occurrence of each `(kind, id)`; later duplicates from
/// overlapping feeds (a notice present in both active and general) are
/// dropped.
pub fn dedupe(items: Vec<NotificationItem>) -> Vec<NotificationItem> {
    let mut seen: HashSet<ItemKey> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.key))
        .collect()
}

/// Tiered validity filter.
///
/// - Exams are never dropped here: past-dated and undated exams stay
///   visible (a graded-but-past exam still matters to the viewer).
/// - Notices carrying an expiry are kept until the expiry passes; an
///   unparseable expiry has no deadline to pass, so the notice stays.
/// - Everything else is kept only while its date falls inside the rolling
///   stale window ending at `now`; items without a parseable date are
///   dropped.
pub fn retain_valid(
    items: Vec<NotificationItem>,
    now: DateTime<Utc>,
    stale_window_days: i64,
) -> Vec<NotificationItem> {
    let stale_cutoff = now - Duration::days(stale_window_days);
    items
        .into_iter()
        .filter(|item| {
            if item.kind() == ItemKind::Exam {
                return true;
            }
            match item.expiry {
                Expiry::At(deadline) => return deadline >= now,
                Expiry::Indefinite => return true,
                Expiry::None => {}
            }
            match item.date {
                Some(date) => date >= stale_cutoff,
                None => false,
            }
        })
        .collect()
}

/// Full dedupe + validity pass in feed-priority order
pub fn dedupe_and_filter(
    items: Vec<NotificationItem>,
    now: DateTime<Utc>,
    stale_window_days: i64,
) -> Vec<NotificationItem> {
    retain_valid(dedupe(items), now, stale_window_days)
}
