//! Server-Sent Events stream
//!
//! Mirrors the in-process EventBus to connected clients so badge and list
//! surfaces update without polling this service. Delivery is fire-and-forget
//! with no replay; a client that connects late only sees future events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::AppState;

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to campus-notify events");
    let mut rx = state.bus.subscribe();

    let stream = async_stream::stream! {
        // Initial connected status
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            // select! result is bound first: async-stream does not support
            // yield inside macro arms
            let received = tokio::select! {
                event = rx.recv() => Some(event),
                _ = tokio::time::sleep(Duration::from_secs(15)) => None,
            };

            match received {
                None => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }
                Some(Ok(ev)) => {
                    let name = ev.event_type().to_string();
                    match serde_json::to_string(&ev) {
                        Ok(json) => yield Ok(Event::default().event(name).data(json)),
                        Err(e) => debug!(error = %e, "failed to serialize bus event for SSE"),
                    }
                }
                Some(Err(RecvError::Lagged(skipped))) => {
                    debug!(skipped = skipped, "SSE client lagged behind event bus");
                }
                Some(Err(RecvError::Closed)) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
