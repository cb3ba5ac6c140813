//! REST endpoints.
//!
//! - `client`: ticket registration and lookup
//! - `agent`: login, queue, call/complete, status
//! - `display`: the public board

pub mod agent;
pub mod client;
pub mod display;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use service_queue_web::AppError;

/// Unwrap a JSON body, reporting malformed input as a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

/// Unwrap query parameters the same way.
pub(crate) fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}
