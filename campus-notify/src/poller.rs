//! Periodic and event-driven feed refresh
//!
//! The poll loop refreshes on a fixed interval and immediately on
//! `NoticesChanged` bus events, giving best-effort near-real-time freshness
//! without a backend push channel. A watch channel carries the shutdown
//! signal so an in-flight cycle's results are never applied after teardown
//! begins.

use crate::fetch;
use crate::feed::{filter, group};
use crate::readsync;
use crate::AppState;
use campus_common::events::NotifyEvent;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run the refresh loop until shutdown is signalled
pub async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut events = state.bus.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.poll_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        interval_secs = state.config.poll_interval_secs,
        "feed poller started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh_cycle(&state).await;
            }
            event = events.recv() => match event {
                Ok(NotifyEvent::NoticesChanged { .. }) => {
                    debug!("notices changed, refreshing feed");
                    refresh_cycle(&state).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "poller lagged behind event bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => {
                info!("feed poller stopping");
                break;
            }
        }
    }
}

/// One full refresh cycle: fetch, pipeline, publish, sync retry.
///
/// Never fails: per-source fetch errors already degraded to empty lists and
/// the pipeline itself is total.
pub async fn refresh_cycle(state: &AppState) {
    let now = Utc::now();

    let batch = fetch::fetch_batch(&state.client, &state.viewer).await;
    let items = fetch::normalize_batch(&batch, &state.viewer);
    let mut items = filter::dedupe_and_filter(items, now, state.config.stale_window_days);
    group::sort_newest_first(&mut items);

    let (total, unread) = {
        let mut store = state.store.write().await;
        store.publish(items, now);
        (store.items.len(), store.unread_count())
    };

    debug!(total = total, unread = unread, "feed snapshot published");
    state.bus.emit_lossy(NotifyEvent::FeedRefreshed {
        total,
        unread,
        timestamp: now,
    });

    // Background retry for read transitions that failed to persist
    readsync::retry_failed(&state.store, &state.bus, state.client.as_ref()).await;
}
