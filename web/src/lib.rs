//! Axum glue for the service queue.
//!
//! The server crate owns the routes; this crate supplies the pieces every
//! route needs:
//!
//! - [`AppError`]: domain errors mapped to HTTP statuses with a JSON body
//! - [`correlation_id_layer`]: `X-Correlation-ID` tracking
//! - [`handlers::health`]: liveness and readiness
//! - [`handlers::websocket`]: the push channel fed by a [`Broadcaster`]
//!
//! [`Broadcaster`]: service_queue_core::Broadcaster
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use service_queue_web::{correlation_id_layer, handlers};
//!
//! let app = Router::new()
//!     .route("/health", get(handlers::health_check))
//!     .route("/ws", get(handlers::push_events))
//!     .with_state(hub)
//!     .layer(correlation_id_layer());
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
