//! Application state for the queue HTTP server.

use axum::extract::FromRef;
use service_queue_runtime::metrics::PrometheusMetrics;
use service_queue_runtime::{QuerySurface, QueueEngine};
use service_queue_web::handlers::PushHub;

/// State shared by every handler. Cloning is cheap: every field is a set of
/// `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Mutating operations
    pub engine: QueueEngine,
    /// Retrying reads
    pub query: QuerySurface,
    /// WebSocket push channel
    pub push: PushHub,
    /// Prometheus renderer; disabled when metrics are off
    pub metrics: PrometheusMetrics,
}

impl AppState {
    /// Bundle the shared handles.
    #[must_use]
    pub const fn new(
        engine: QueueEngine,
        query: QuerySurface,
        push: PushHub,
        metrics: PrometheusMetrics,
    ) -> Self {
        Self {
            engine,
            query,
            push,
            metrics,
        }
    }
}

impl FromRef<AppState> for QuerySurface {
    fn from_ref(state: &AppState) -> Self {
        state.query.clone()
    }
}

impl FromRef<AppState> for PushHub {
    fn from_ref(state: &AppState) -> Self {
        state.push.clone()
    }
}
