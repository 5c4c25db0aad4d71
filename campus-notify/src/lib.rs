//! campus-notify library - Notification Feed module
//!
//! Aggregates the school backend's notice/exam/result feeds into one
//! normalized, deduplicated, day-bucketed notification feed for a single
//! viewer, with optimistic read-state tracking and best-effort backend
//! persistence. The backend is polled; consumers get push via the
//! in-process EventBus mirrored over SSE.

use axum::Router;
use campus_common::config::NotifyConfig;
use campus_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod api;
pub mod client;
pub mod feed;
pub mod fetch;
pub mod poller;
pub mod readsync;
pub mod state;

use client::BackendClient;
use feed::{Role, Viewer};
use state::FeedStore;

/// Application state shared across HTTP handlers and the poller
#[derive(Clone)]
pub struct AppState {
    /// Latest feed snapshot + read ledger
    pub store: Arc<RwLock<FeedStore>>,
    /// In-process broadcast bus (cross-component invalidation and badges)
    pub bus: EventBus,
    /// Backend REST client
    pub client: Arc<BackendClient>,
    /// The user this instance aggregates for
    pub viewer: Viewer,
    /// Resolved service configuration
    pub config: Arc<NotifyConfig>,
}

impl AppState {
    /// Create application state from resolved configuration
    pub fn new(config: NotifyConfig) -> Self {
        let viewer = Viewer {
            id: config.viewer_id,
            role: Role::from_name(&config.viewer_role),
        };
        Self {
            store: Arc::new(RwLock::new(FeedStore::default())),
            bus: EventBus::new(1000),
            client: Arc::new(BackendClient::new(&config)),
            viewer,
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/feed", get(api::feed::get_feed))
        .route("/api/feed/read", post(api::feed::mark_read))
        .route("/api/feed/read_all", post(api::feed::mark_all_read))
        .route("/api/feed/refresh", post(api::feed::request_refresh))
        .route("/events", get(api::sse::event_stream))
        .merge(api::health::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
