//! # Service Queue Runtime
//!
//! Runtime pieces that put the core contracts to work.
//!
//! ## Core Components
//!
//! - **[`QueueEngine`]**: the only writer of ticket and agent state; validates,
//!   performs one atomic store call, then publishes events
//! - **[`QuerySurface`]**: read-only projections with retry on transient storage
//!   failures
//! - **[`ChannelBroadcaster`]**: tokio `broadcast`-backed push fan-out
//! - **[`InMemoryRecordStore`]**: mutex-guarded record store for development and tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use service_queue_core::environment::SystemClock;
//! use service_queue_runtime::{ChannelBroadcaster, InMemoryRecordStore, QueueEngine, QueueEnvironment};
//!
//! # tokio_test::block_on(async {
//! let engine = QueueEngine::new(QueueEnvironment::new(
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(ChannelBroadcaster::new(16)),
//!     Arc::new(SystemClock),
//! ));
//!
//! let ticket = engine.register("Ada Lovelace").await?;
//! assert_eq!(ticket.ticket_number.get(), 1);
//! # Ok::<(), service_queue_core::QueueError>(())
//! # }).unwrap();
//! ```

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

pub mod broadcaster;
pub mod engine;
pub mod memory;
pub mod query;

pub use broadcaster::ChannelBroadcaster;
pub use engine::{QueueEngine, QueueEnvironment};
pub use memory::InMemoryRecordStore;
pub use query::{DisplayBoard, QuerySurface};
