//! # Service Queue Core
//!
//! Domain types and seams for a ticketed service queue.
//!
//! Customers take sequential tickets, agents call tickets into service and
//! complete them, and every observer (customer, agent, public display) is kept
//! in sync through best-effort push events plus read-only queries.
//!
//! This crate holds everything that does not depend on a runtime:
//!
//! - **Types**: [`Ticket`], [`Agent`], [`TicketStatus`], [`AgentStatus`], [`TicketNumber`]
//! - **Errors**: [`QueueError`] (engine taxonomy) and [`StoreError`] (record store failures)
//! - **Events**: [`QueueEvent`], the two push notifications observers receive
//! - **Seams**: [`RecordStore`], [`Broadcaster`] and [`environment::Clock`], injected into
//!   the engine at construction
//!
//! ## Architecture
//!
//! ```text
//! request ──> QueueEngine ──> RecordStore (conditional write, source of truth)
//!                  │
//!                  └──> Broadcaster ──> observers (hint: re-pull via QuerySurface)
//! ```
//!
//! The engine lives in `service-queue-runtime`; this crate only defines the
//! contracts it is written against.

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod store;
pub mod types;
pub mod validation;

pub use broadcaster::{Broadcaster, EventStream};
pub use error::{QueueError, Result, StoreError};
pub use event::{AgentStatusUpdate, QueueEvent, QueueUpdate};
pub use store::{ClaimOutcome, CompleteOutcome, RecordStore, StoreFuture};
pub use types::{Agent, AgentStatus, AgentSummary, Ticket, TicketNumber, TicketStatus};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Environment module - Dependency injection traits
///
/// All time-dependent behaviour goes through [`Clock`](environment::Clock)
/// so tests can pin `created_at` values.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use service_queue_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
