//! Liveness and readiness endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use service_queue_runtime::QuerySurface;

/// Liveness body.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// Always `"ok"` when the process answers
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// `GET /health`: the process is up. Does not touch the record store.
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn health_check() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness body.
#[derive(Debug, Serialize)]
pub struct ReadyBody {
    /// `"ready"` or `"unavailable"`
    pub status: &'static str,
    /// Failure detail when not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /ready`: 200 when the record store answers a cheap read, 503 otherwise.
pub async fn readiness(State(query): State<QuerySurface>) -> (StatusCode, Json<ReadyBody>) {
    match query.ready().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyBody {
                status: "ready",
                error: None,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyBody {
                    status: "unavailable",
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}
