//! `GET /api/display`: the public board.

use crate::server::AppState;
use axum::Json;
use axum::extract::State;
use service_queue_runtime::DisplayBoard;
use service_queue_web::WebResult;

/// Waiting line, tickets in service and the most recent call.
pub async fn board(State(state): State<AppState>) -> WebResult<Json<DisplayBoard>> {
    Ok(Json(state.query.display_board().await?))
}
