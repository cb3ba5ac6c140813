//! Push-event fan-out.
//!
//! A [`Broadcaster`] delivers every published [`QueueEvent`] to every observer
//! subscribed at the time of publishing. Delivery is best-effort and
//! at-most-once: there is no replay, and an observer that falls behind skips
//! events instead of slowing the publisher down.

use crate::event::QueueEvent;
use futures::Stream;
use std::pin::Pin;

/// Stream of events for one observer. Ends when the broadcaster is dropped.
pub type EventStream = Pin<Box<dyn Stream<Item = QueueEvent> + Send>>;

/// Fan-out of push events to connected observers.
///
/// `publish` is synchronous and infallible: a mutation that has already been
/// stored must never fail or wait because of its notification.
pub trait Broadcaster: Send + Sync {
    /// Deliver `event` to every current subscriber. Never blocks.
    fn publish(&self, event: QueueEvent);

    /// Register a new observer.
    ///
    /// The subscription is active as soon as this returns, before the stream
    /// is first polled, so no event published afterwards is missed.
    fn subscribe(&self) -> EventStream;

    /// Number of live subscriptions.
    fn observer_count(&self) -> usize;
}
