//! Service queue server.
//!
//! Customers take numbered tickets, agents call and complete them, and a
//! public display follows along. Every change is pushed to WebSocket
//! observers as a hint to re-pull.
//!
//! ```text
//!  client / agent / display (HTTP)        observers (WebSocket)
//!              │                                  ▲
//!              ▼                                  │
//!     ┌─────────────────┐   publish   ┌──────────────────────┐
//!     │   QueueEngine   ├────────────>│  ChannelBroadcaster  │
//!     │  QuerySurface   │             └──────────────────────┘
//!     └────────┬────────┘
//!              ▼
//!     RecordStore (memory | postgres)
//! ```
//!
//! See [`config`] for the environment variables and [`bootstrap`] for the
//! startup sequence.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod server;

pub use bootstrap::Application;
pub use config::Config;
pub use server::{AppState, build_router};
