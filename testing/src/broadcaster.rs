//! Broadcaster that records every event it publishes.

use service_queue_core::{Broadcaster, EventStream, QueueEvent};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// In-process broadcaster for assertions on emitted events.
///
/// Every published event is appended to an internal log (see
/// [`RecordingBroadcaster::events`]) and also fanned out to live subscribers,
/// so it can stand in for the production broadcaster in end-to-end tests.
#[derive(Debug)]
pub struct RecordingBroadcaster {
    log: Mutex<Vec<QueueEvent>>,
    sender: broadcast::Sender<QueueEvent>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            log: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Snapshot of all events published so far, in publish order.
    #[must_use]
    pub fn events(&self) -> Vec<QueueEvent> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the log, returning what it held.
    pub fn take(&self) -> Vec<QueueEvent> {
        std::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for RecordingBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, event: QueueEvent) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> EventStream {
        let mut receiver = self.sender.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
