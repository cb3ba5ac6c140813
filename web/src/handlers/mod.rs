//! Shared HTTP handlers.

pub mod health;
pub mod websocket;

pub use health::{health_check, readiness};
pub use websocket::{PushHub, push_events};
