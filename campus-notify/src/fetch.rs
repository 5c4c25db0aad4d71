//! Role-aware source fetching
//!
//! One fetch cycle issues every source request for the viewer's role
//! concurrently, with per-call failure isolation: a failing endpoint
//! degrades to an empty list for this cycle (warn log, no retry) so it
//! never blocks the other sources.

use crate::client::BackendClient;
use crate::feed::normalize::{
    normalize_exam, normalize_notice, normalize_result, RawExam, RawNotice, RawResult,
};
use crate::feed::{NotificationItem, Role, Viewer};
use campus_common::Result;
use std::future::Future;
use tracing::warn;

/// Raw records from one fetch cycle, grouped by source in feed-priority
/// order (active > urgent > general > class notices, then exams, schedule,
/// results).
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub active_notices: Vec<RawNotice>,
    pub urgent_notices: Vec<RawNotice>,
    pub general_notices: Vec<RawNotice>,
    pub class_notices: Vec<RawNotice>,
    pub exams: Vec<RawExam>,
    pub schedule: Vec<RawExam>,
    pub results: Vec<RawResult>,
}

impl FetchBatch {
    pub fn record_count(&self) -> usize {
        self.active_notices.len()
            + self.urgent_notices.len()
            + self.general_notices.len()
            + self.class_notices.len()
            + self.exams.len()
            + self.schedule.len()
            + self.results.len()
    }
}

/// Swallow a single source failure, substituting an empty list
async fn or_empty<T, F>(source: &'static str, fut: F) -> Vec<T>
where
    F: Future<Output = Result<Vec<T>>>,
{
    match fut.await {
        Ok(records) => records,
        Err(e) => {
            warn!(source = source, error = %e, "source fetch failed, substituting empty list");
            Vec::new()
        }
    }
}

/// Fetch all sources for the viewer's role concurrently.
///
/// Instructors get the notice feeds plus exams and the exam schedule;
/// students get the notice feeds (including class notices) plus exams and
/// results. Admin and other roles short-circuit to an empty batch.
pub async fn fetch_batch(client: &BackendClient, viewer: &Viewer) -> FetchBatch {
    match viewer.role {
        Role::Instructor => {
            let (active, urgent, general, exams, schedule) = tokio::join!(
                or_empty("active_notices", client.get_list::<RawNotice>("/api/notices/active/")),
                or_empty("urgent_notices", client.get_list::<RawNotice>("/api/notices/urgent/")),
                or_empty("general_notices", client.get_list::<RawNotice>("/api/notices/")),
                or_empty("exams", client.get_list::<RawExam>("/api/exams/")),
                or_empty("schedule", client.get_list::<RawExam>("/api/exams/schedule/")),
            );
            FetchBatch {
                active_notices: active,
                urgent_notices: urgent,
                general_notices: general,
                exams,
                schedule,
                ..Default::default()
            }
        }
        Role::Student => {
            let (active, urgent, general, class_notices, exams, results) = tokio::join!(
                or_empty("active_notices", client.get_list::<RawNotice>("/api/notices/active/")),
                or_empty("urgent_notices", client.get_list::<RawNotice>("/api/notices/urgent/")),
                or_empty("general_notices", client.get_list::<RawNotice>("/api/notices/")),
                or_empty("class_notices", client.get_list::<RawNotice>("/api/class-notices/")),
                or_empty("exams", client.get_list::<RawExam>("/api/exams/")),
                or_empty("results", client.get_list::<RawResult>("/api/results/")),
            );
            FetchBatch {
                active_notices: active,
                urgent_notices: urgent,
                general_notices: general,
                class_notices,
                exams,
                results,
                ..Default::default()
            }
        }
        // Admin-type roles have no notification sources
        Role::Admin | Role::Commandant | Role::Superadmin => FetchBatch::default(),
    }
}

/// Normalize a batch into the merged item list, preserving feed-priority
/// order so downstream deduplication keeps the highest-priority duplicate.
pub fn normalize_batch(batch: &FetchBatch, viewer: &Viewer) -> Vec<NotificationItem> {
    let mut items = Vec::with_capacity(batch.record_count());

    for raw in batch
        .active_notices
        .iter()
        .chain(&batch.urgent_notices)
        .chain(&batch.general_notices)
        .chain(&batch.class_notices)
    {
        if let Some(item) = normalize_notice(raw, viewer) {
            items.push(item);
        }
    }
    for raw in batch.exams.iter().chain(&batch.schedule) {
        if let Some(item) = normalize_exam(raw) {
            items.push(item);
        }
    }
    for raw in &batch.results {
        if let Some(item) = normalize_result(raw) {
            items.push(item);
        }
    }

    items
}
