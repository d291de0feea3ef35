//! Server-Sent Events endpoint for live reload.
//!
//! # Data Flow
//! ```text
//! GET /events
//!     → ChangeHub::subscribe()
//!     → "data: Connected to file watcher"
//!     → loop: next of {hub message, heartbeat tick, client gone}
//!     → client gone: stream dropped → Subscriber dropped → deregistered
//! ```

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::header::{self, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::stream::{self, Stream, StreamExt};

use crate::live::hub::{ChangeHub, Subscriber};

/// First message on every stream.
pub const CONNECTED_MESSAGE: &str = "Connected to file watcher";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// State for the event-stream endpoint.
#[derive(Debug, Clone)]
pub struct LiveReloadState {
    pub hub: ChangeHub,
    pub heartbeat: Duration,
    /// Path the endpoint is mounted at; the client script connects here.
    pub endpoint: String,
}

/// Turn a subscription into an SSE event stream.
///
/// The stream owns the subscriber; dropping the stream deregisters it.
pub fn event_stream(subscriber: Subscriber) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    let connected = stream::once(async { Ok(Event::default().data(CONNECTED_MESSAGE)) });
    let updates = stream::unfold(subscriber, |mut subscriber| async move {
        let message = subscriber.recv().await?;
        Some((Ok(Event::default().data(message)), subscriber))
    });
    connected.chain(updates)
}

/// `GET` handler streaming change notifications until the client disconnects.
pub async fn events_handler(State(live): State<LiveReloadState>) -> impl IntoResponse {
    let subscriber = live.hub.subscribe();
    tracing::info!(
        subscriber_id = subscriber.id(),
        subscribers = live.hub.subscriber_count(),
        "SSE client connected"
    );

    let sse = Sse::new(event_stream(subscriber)).keep_alive(
        KeepAlive::new()
            .interval(live.heartbeat)
            .text("keep-alive"),
    );

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        sse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_starts_with_connect_message_then_relays() {
        let hub = ChangeHub::default();
        let mut stream = Box::pin(event_stream(hub.subscribe()));

        assert!(stream.next().await.is_some());
        hub.broadcast("style.css modified");
        assert!(stream.next().await.is_some());

        hub.close();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_stream_releases_subscriber() {
        let hub = ChangeHub::default();
        let baseline = hub.subscriber_count();

        for _ in 0..10 {
            let mut stream = Box::pin(event_stream(hub.subscribe()));
            stream.next().await;
            assert_eq!(hub.subscriber_count(), baseline + 1);
            drop(stream);
            assert_eq!(hub.subscriber_count(), baseline);
        }
    }
}
