//! Router configuration for the queue server.

use super::state::AppState;
use crate::api::{agent, client, display};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use service_queue_web::{correlation_id_layer, handlers};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// - `/health`, `/ready`, `/metrics`
/// - `/api/client/*`, `/api/agent/*`, `/api/display`
/// - `/ws` push channel
///
/// CORS admits `cors_origin` only; an unparsable origin admits none.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let client_routes = Router::new()
        .route("/register", post(client::register))
        .route("/status", get(client::ticket_status))
        .route("/tickets", get(client::list_tickets));

    let agent_routes = Router::new()
        .route("/login", post(agent::login))
        .route("/queue", get(agent::queue))
        .route("/call", post(agent::call))
        .route("/complete", post(agent::complete))
        .route("/status", get(agent::get_status).post(agent::set_status));

    let api_routes = Router::new()
        .nest("/client", client_routes)
        .nest("/agent", agent_routes)
        .route("/display", get(display::board));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))
        .route("/metrics", get(metrics))
        .route("/ws", get(handlers::push_events))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

#[allow(clippy::unused_async)] // Axum handler signature requires async
async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
