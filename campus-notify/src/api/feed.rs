//! Feed endpoints: grouped listing, read marking, manual refresh

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use campus_common::events::{ItemKey, NotifyEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::group::{self, GroupedFeed};
use crate::readsync;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Requested page (1-indexed, clamped into range)
    #[serde(default)]
    pub page: Option<usize>,
}

/// Grouped feed page
#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub page: usize,
    pub total_pages: usize,
    /// Items across all pages
    pub total: usize,
    /// Unread items across all pages
    pub unread: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub groups: GroupedFeed,
}

/// GET /api/feed?page=N
///
/// Returns one page of the current snapshot, bucketed into
/// Today/Yesterday/This Week/Older against the current wall clock.
pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Json<FeedResponse> {
    let now = Utc::now();
    let store = state.store.read().await;

    let window = group::page_window(store.items.len(), query.page.unwrap_or(1));
    let page_items = &store.items[window.start..window.end];

    Json(FeedResponse {
        page: window.page,
        total_pages: window.total_pages,
        total: store.items.len(),
        unread: store.unread_count(),
        refreshed_at: store.refreshed_at,
        groups: group::group(page_items, now),
    })
}

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    pub keys: Vec<ItemKey>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub unread: usize,
}

/// POST /api/feed/read
///
/// Optimistically marks the given items read, broadcasts the transition,
/// and persists to the backend best-effort.
pub async fn mark_read(
    State(state): State<AppState>,
    Json(request): Json<ReadRequest>,
) -> Json<ReadResponse> {
    let unread = readsync::mark_items_read(
        &state.store,
        &state.bus,
        state.client.as_ref(),
        &request.keys,
    )
    .await;
    Json(ReadResponse { unread })
}

/// POST /api/feed/read_all
pub async fn mark_all_read(State(state): State<AppState>) -> Json<ReadResponse> {
    let unread =
        readsync::mark_all_read(&state.store, &state.bus, state.client.as_ref()).await;
    Json(ReadResponse { unread })
}

/// POST /api/feed/refresh
///
/// Fire-and-forget invalidation hook for components that mutate notices:
/// emits `NoticesChanged`, which the poller turns into an immediate refetch.
pub async fn request_refresh(State(state): State<AppState>) -> StatusCode {
    state.bus.emit_lossy(NotifyEvent::NoticesChanged {
        timestamp: Utc::now(),
    });
    StatusCode::ACCEPTED
}
