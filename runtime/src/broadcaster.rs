//! tokio `broadcast`-backed implementation of [`Broadcaster`].

use crate::metrics::BroadcastMetrics;
use service_queue_core::{Broadcaster, EventStream, QueueEvent};
use tokio::sync::broadcast;

/// Default number of events buffered per observer before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-process push fan-out.
///
/// Each subscriber gets its own bounded view of the channel. A subscriber
/// that falls more than `capacity` events behind skips the oldest ones and
/// keeps going; the publisher never waits.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<QueueEvent>,
}

impl ChannelBroadcaster {
    /// Create a broadcaster buffering up to `capacity` events per observer.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: QueueEvent) {
        let kind = event.kind();
        BroadcastMetrics::record_publish(kind);
        match self.sender.send(event) {
            Ok(observers) => tracing::trace!(kind, observers, "Event published"),
            Err(_) => tracing::debug!(kind, "Event published with no observers connected"),
        }
    }

    fn subscribe(&self) -> EventStream {
        // Subscribe now, not on first poll, so events published between this
        // call and the first poll are delivered.
        let mut receiver = self.sender.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        BroadcastMetrics::record_lagged(skipped);
                        tracing::warn!(skipped, "Observer lagged, skipping missed events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use service_queue_core::AgentStatus;

    fn event(n: usize) -> QueueEvent {
        QueueEvent::agent_status(format!("agent{n}"), AgentStatus::Available)
    }

    #[tokio::test]
    async fn publish_without_observers_is_silent() {
        let broadcaster = ChannelBroadcaster::new(4);
        broadcaster.publish(event(0));
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test]
    async fn every_observer_receives_each_event() {
        let broadcaster = ChannelBroadcaster::new(4);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 2);

        broadcaster.publish(event(1));

        assert_eq!(first.next().await.unwrap(), event(1));
        assert_eq!(second.next().await.unwrap(), event(1));
    }

    #[tokio::test]
    async fn subscription_is_live_before_first_poll() {
        let broadcaster = ChannelBroadcaster::new(4);
        let mut stream = broadcaster.subscribe();
        broadcaster.publish(event(7));
        assert_eq!(stream.next().await.unwrap(), event(7));
    }

    #[tokio::test]
    async fn lagging_observer_skips_to_recent_events() {
        let broadcaster = ChannelBroadcaster::new(2);
        let mut stream = broadcaster.subscribe();

        for n in 0..5 {
            broadcaster.publish(event(n));
        }

        // Capacity 2: only the two newest events survive.
        assert_eq!(stream.next().await.unwrap(), event(3));
        assert_eq!(stream.next().await.unwrap(), event(4));
    }

    #[tokio::test]
    async fn dropping_a_stream_unsubscribes() {
        let broadcaster = ChannelBroadcaster::new(2);
        let stream = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 1);
        drop(stream);
        assert_eq!(broadcaster.observer_count(), 0);
    }
}
