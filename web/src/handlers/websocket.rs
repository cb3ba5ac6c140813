//! WebSocket push channel.
//!
//! Every connected observer receives each [`QueueEvent`] published after it
//! connected, serialized as one text frame:
//!
//! ```json
//! {"event": "queue-update", "data": {"ticket_number": 3, "status": "in_service", "agent_name": "agent1"}}
//! ```
//!
//! The channel is push-only; text sent by the client is ignored. Frames are
//! hints to re-pull through the REST API, so a lagging observer simply skips
//! what it missed.
//!
//! ```text
//! Client            push_events                Broadcaster
//!   │                    │                          │
//!   ├─ GET /ws ─────────>│                          │
//!   │                    ├─ subscribe() ───────────>│   (before upgrade)
//!   │<── 101 ────────────┤                          │
//!   │                    │<── QueueEvent ───────────┤
//!   │<── text frame ─────┤                          │
//! ```

use crate::error::AppError;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use service_queue_core::{Broadcaster, EventStream, QueueEvent};
use service_queue_runtime::metrics::ConnectionMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared state for the push endpoint.
#[derive(Clone)]
pub struct PushHub {
    broadcaster: Arc<dyn Broadcaster>,
    active: Arc<AtomicUsize>,
    max_connections: usize,
    ping_interval: Duration,
}

impl PushHub {
    /// Create a hub over `broadcaster`.
    #[must_use]
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        max_connections: usize,
        ping_interval: Duration,
    ) -> Self {
        Self {
            broadcaster,
            active: Arc::new(AtomicUsize::new(0)),
            max_connections,
            ping_interval,
        }
    }

    /// Open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<ConnectionSlot> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_connections).then_some(n + 1)
            })
            .ok()?;
        ConnectionMetrics::record_connected();
        Some(ConnectionSlot {
            active: Arc::clone(&self.active),
        })
    }
}

/// Releases a connection slot when dropped.
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        ConnectionMetrics::record_disconnected();
    }
}

/// `GET /ws`: upgrade to a push stream.
///
/// The subscription is taken before the upgrade completes, so no event
/// published after the 101 response can be missed. Returns 503 when the
/// connection limit is reached.
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn push_events(ws: WebSocketUpgrade, State(hub): State<PushHub>) -> Response {
    let Some(slot) = hub.try_acquire() else {
        warn!(limit = hub.max_connections, "WebSocket connection limit reached");
        return AppError::unavailable("Too many push connections").into_response();
    };
    let events = hub.broadcaster.subscribe();
    let ping_interval = hub.ping_interval;
    debug!("WebSocket connection requested");
    ws.on_upgrade(move |socket| serve_socket(socket, events, ping_interval, slot))
}

fn encode(event: &QueueEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize push event");
            None
        }
    }
}

/// Drive one connection until either side goes away.
async fn serve_socket(
    socket: WebSocket,
    mut events: EventStream,
    ping_interval: Duration,
    _slot: ConnectionSlot,
) {
    info!("WebSocket connection established");
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await;
        loop {
            let message = tokio::select! {
                event = events.next() => match event {
                    Some(event) => match encode(&event) {
                        Some(message) => message,
                        None => continue,
                    },
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Vec::new()),
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
        debug!("WebSocket send task terminated");
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(_) | Message::Binary(_) => {
                    debug!("Ignoring client message on push channel");
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        debug!("WebSocket receive task terminated");
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("WebSocket connection closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use service_queue_testing::RecordingBroadcaster;

    fn hub(limit: usize) -> PushHub {
        PushHub::new(
            Arc::new(RecordingBroadcaster::new()),
            limit,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn slots_are_bounded_and_released() {
        let hub = hub(2);

        let first = hub.try_acquire().unwrap();
        let second = hub.try_acquire().unwrap();
        assert!(hub.try_acquire().is_none());
        assert_eq!(hub.active_connections(), 2);

        drop(first);
        assert_eq!(hub.active_connections(), 1);
        let _third = hub.try_acquire().unwrap();
        drop(second);
        assert_eq!(hub.active_connections(), 1);
    }

    #[test]
    fn events_encode_as_tagged_text_frames() {
        let event = QueueEvent::agent_status("agent1", service_queue_core::AgentStatus::Busy);

        let Some(Message::Text(text)) = encode(&event) else {
            unreachable!("agent status events always encode")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["event"], "agent-status-update");
        assert_eq!(value["data"]["name"], "agent1");
        assert_eq!(value["data"]["status"], "busy");
    }
}
