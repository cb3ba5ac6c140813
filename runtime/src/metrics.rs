//! Prometheus metrics for observability and monitoring.
//!
//! Metrics cover:
//! - Engine operations (count by outcome, latency)
//! - Push events published
//! - Connected WebSocket observers
//! - Query retries
//!
//! # Example
//!
//! ```rust,no_run
//! use service_queue_runtime::metrics::PrometheusMetrics;
//!
//! let metrics = PrometheusMetrics::install()?;
//! // Serve `metrics.render()` from GET /metrics
//! # Ok::<(), service_queue_runtime::metrics::MetricsError>(())
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
///
/// The recorder is process-global; rendering happens on whatever HTTP route
/// the caller mounts.
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Option<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g. by an earlier test), this
    /// logs a warning and returns an instance without a handle; metrics are
    /// still recorded by the existing recorder.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// A disabled instance that renders nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { handle: None }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` when this instance does not own the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "queue_engine_operations_total",
        "Engine operations by operation and outcome"
    );
    describe_histogram!(
        "queue_engine_operation_duration_seconds",
        "Time taken by engine operations, including the store call"
    );
    describe_counter!(
        "queue_events_published_total",
        "Push events handed to the broadcaster, by kind"
    );
    describe_counter!(
        "queue_events_lagged_total",
        "Push events skipped by observers that fell behind"
    );
    describe_gauge!(
        "queue_ws_connections_active",
        "Currently connected WebSocket observers"
    );
    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Total number of successful retries");
    describe_counter!(
        "retry_exhausted_total",
        "Total number of retries that exhausted max retries"
    );
}

/// Engine operation metrics recorder.
pub struct EngineMetrics;

impl EngineMetrics {
    /// Record one engine operation and its outcome label.
    pub fn record_operation(operation: &'static str, outcome: &'static str, duration: Duration) {
        counter!(
            "queue_engine_operations_total",
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "queue_engine_operation_duration_seconds",
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }
}

/// Push event metrics recorder.
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record an event handed to the broadcaster.
    pub fn record_publish(kind: &'static str) {
        counter!("queue_events_published_total", "kind" => kind).increment(1);
    }

    /// Record events skipped by a lagging observer.
    pub fn record_lagged(skipped: u64) {
        counter!("queue_events_lagged_total").increment(skipped);
    }
}

/// WebSocket connection metrics recorder.
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    /// An observer connected.
    pub fn record_connected() {
        gauge!("queue_ws_connections_active").increment(1.0);
    }

    /// An observer disconnected.
    pub fn record_disconnected() {
        gauge!("queue_ws_connections_active").decrement(1.0);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn disabled_renders_nothing() {
        assert!(PrometheusMetrics::disabled().render().is_none());
    }

    #[test]
    fn install_and_render() {
        let metrics = PrometheusMetrics::install().unwrap();

        EngineMetrics::record_operation("register", "ok", Duration::from_millis(3));
        BroadcastMetrics::record_publish("queue-update");

        // Another test in this process may own the recorder already.
        if let Some(rendered) = metrics.render() {
            assert!(rendered.contains("queue_engine_operations_total"));
            assert!(rendered.contains("queue_events_published_total"));
        }
    }
}
