//! # Service Queue Testing
//!
//! Test doubles and fixtures for the service queue.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`StepClock`])
//! - A [`RecordingBroadcaster`] that keeps every published event
//! - A [`FlakyRecordStore`] that injects storage failures
//! - Seeding helpers and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use service_queue_testing::{RecordingBroadcaster, StepClock, fixtures};
//!
//! #[tokio::test]
//! async fn call_emits_two_events() {
//!     let store = Arc::new(InMemoryRecordStore::new());
//!     fixtures::seed_available_agent(store.as_ref(), "agent1", "pw").await?;
//!     let broadcaster = Arc::new(RecordingBroadcaster::new());
//!     let engine = QueueEngine::new(QueueEnvironment::new(store, broadcaster.clone(), Arc::new(StepClock::default())));
//!     // ...
//!     assert_eq!(broadcaster.events().len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use service_queue_core::environment::Clock;

pub mod broadcaster;
pub mod fixtures;
pub mod flaky_store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use service_queue_testing::mocks::FixedClock;
    /// use service_queue_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every reading.
    ///
    /// Gives each registered ticket a distinct `created_at`, so ordering
    /// assertions do not depend on wall-clock resolution.
    #[derive(Debug)]
    pub struct StepClock {
        start: DateTime<Utc>,
        step_millis: i64,
        ticks: AtomicI64,
    }

    impl StepClock {
        /// Start at `start`, advancing `step_millis` per call to `now`.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step_millis: i64) -> Self {
            Self {
                start,
                step_millis,
                ticks: AtomicI64::new(0),
            }
        }

        /// Number of readings taken so far.
        #[must_use]
        pub fn readings(&self) -> i64 {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    impl Default for StepClock {
        /// Starts at the [`test_clock`] instant with one-second steps.
        fn default() -> Self {
            Self::new(test_clock().now(), 1_000)
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.start + chrono::Duration::milliseconds(tick * self.step_millis)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use service_queue_core::AgentStatus;

    /// One step of a random workload against the engine.
    ///
    /// Ticket and agent references are small indices so random sequences hit
    /// existing records often.
    #[derive(Debug, Clone)]
    pub enum QueueOp {
        /// Register a customer
        Register(String),
        /// Log an agent in (correct password)
        Login(usize),
        /// Agent calls ticket
        Call {
            /// 1-based ticket number
            ticket: i64,
            /// Agent index
            agent: usize,
        },
        /// Agent completes ticket
        Complete {
            /// 1-based ticket number
            ticket: i64,
            /// Agent index
            agent: usize,
        },
        /// Operator override of an agent's status
        SetStatus {
            /// Agent index
            agent: usize,
            /// New status
            status: AgentStatus,
        },
    }

    /// Non-empty customer names.
    pub fn customer_name() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,12}( [A-Za-z]{1,12})?"
    }

    /// Any agent status.
    pub fn agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Available),
            Just(AgentStatus::Busy),
            Just(AgentStatus::Unavailable),
        ]
    }

    /// A single operation over `agents` agents and up to `max_ticket` tickets.
    pub fn queue_op(agents: usize, max_ticket: i64) -> impl Strategy<Value = QueueOp> {
        prop_oneof![
            3 => customer_name().prop_map(QueueOp::Register),
            1 => (0..agents).prop_map(QueueOp::Login),
            3 => (1..=max_ticket, 0..agents).prop_map(|(ticket, agent)| QueueOp::Call { ticket, agent }),
            3 => (1..=max_ticket, 0..agents).prop_map(|(ticket, agent)| QueueOp::Complete { ticket, agent }),
            1 => (0..agents, agent_status()).prop_map(|(agent, status)| QueueOp::SetStatus { agent, status }),
        ]
    }

    /// A sequence of up to `len` operations.
    pub fn queue_ops(
        agents: usize,
        max_ticket: i64,
        len: usize,
    ) -> impl Strategy<Value = Vec<QueueOp>> {
        proptest::collection::vec(queue_op(agents, max_ticket), 1..=len)
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output is captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use broadcaster::RecordingBroadcaster;
pub use flaky_store::FlakyRecordStore;
pub use mocks::{FixedClock, StepClock, test_clock};
