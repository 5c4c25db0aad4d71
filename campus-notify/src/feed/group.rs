//! Sorting, day-bucket grouping, and feed pagination
//!
//! Buckets are computed against midnight-aligned calendar days, not 24-hour
//! windows: "Today" means calendar-day match with `now`. Grouping is a pure
//! function of `(items, now)` and therefore idempotent at a fixed instant.

use super::NotificationItem;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Page size for the feed endpoint
pub const PAGE_SIZE: usize = 20;

/// Calendar-day display bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Today,
    Yesterday,
    ThisWeek,
    Older,
}

/// Sort newest first; dateless (lenient exam) items sort last. Ties break on
/// the item key so ordering is deterministic across runs.
pub fn sort_newest_first(items: &mut [NotificationItem]) {
    items.sort_by(|a, b| match (b.date, a.date) {
        (Some(db), Some(da)) => db.cmp(&da).then_with(|| a.key.id.cmp(&b.key.id)),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => a.key.id.cmp(&b.key.id),
    });
}

/// Bucket for an item date relative to `now`.
///
/// Future dates bucket as Today (an exam tomorrow is current, not stale);
/// dateless items bucket as Older.
pub fn bucket_for(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Bucket {
    let Some(date) = date else {
        return Bucket::Older;
    };
    let day = date.date_naive();
    let today = now.date_naive();

    if day >= today {
        Bucket::Today
    } else if day == today - Duration::days(1) {
        Bucket::Yesterday
    } else if day > today - Duration::days(7) {
        Bucket::ThisWeek
    } else {
        Bucket::Older
    }
}

/// Feed items grouped into display buckets, each preserving input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedFeed {
    pub today: Vec<NotificationItem>,
    pub yesterday: Vec<NotificationItem>,
    pub this_week: Vec<NotificationItem>,
    pub older: Vec<NotificationItem>,
}

/// Group already-sorted items into day buckets against `now`
pub fn group(items: &[NotificationItem], now: DateTime<Utc>) -> GroupedFeed {
    let mut grouped = GroupedFeed::default();
    for item in items {
        let target = match bucket_for(item.date, now) {
            Bucket::Today => &mut grouped.today,
            Bucket::Yesterday => &mut grouped.yesterday,
            Bucket::ThisWeek => &mut grouped.this_week,
            Bucket::Older => &mut grouped.older,
        };
        target.push(item.clone());
    }
    grouped
}

/// Slice bounds for one feed page
#[derive(Debug, Clone, Copy)]
pub struct PageWindow {
    /// Sanitized page number (1-indexed)
    pub page: usize,
    /// Total number of pages (at least 1)
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

/// Calculate the slice window for a requested page, clamping out-of-bounds
/// requests into [1, total_pages].
pub fn page_window(total_items: usize, requested_page: usize) -> PageWindow {
    let total_pages = total_items.div_ceil(PAGE_SIZE).max(1);
    let page = requested_page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total_items);

    PageWindow {
        page,
        total_pages,
        start,
        end,
    }
}
