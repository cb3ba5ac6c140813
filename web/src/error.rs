//! HTTP error type for queue handlers.
//!
//! [`AppError`] carries a status, a client-facing message and a stable
//! error code. Domain errors convert via `From<QueueError>`; the body is
//! always `{"code": …, "message": …}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use service_queue_core::QueueError;
use std::fmt;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Application error type for web handlers.
///
/// ```ignore
/// async fn handler(State(engine): State<QueueEngine>) -> Result<Json<Ticket>, AppError> {
///     Ok(Json(engine.register("Ada").await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    /// Internal cause, logged but never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error with an explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach an internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 with `VALIDATION_ERROR`.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
    }

    /// 401 with `UNAUTHORIZED`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// 403 with `FORBIDDEN`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// 404 with `NOT_FOUND`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// 409 with `CONFLICT`.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// 503 with `SERVICE_UNAVAILABLE`.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }

    /// Map a login failure.
    ///
    /// Unknown names and wrong passwords collapse into one 401 so the
    /// response does not reveal which agents exist.
    #[must_use]
    pub fn from_login(err: QueueError) -> Self {
        match err {
            QueueError::UnknownAgent(_) | QueueError::InvalidCredential => {
                Self::unauthorized(INVALID_CREDENTIALS)
            }
            other => other.into(),
        }
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        let message = err.to_string();
        match err {
            QueueError::Validation(_) => Self::validation(message),
            QueueError::InvalidCredential => Self::unauthorized(INVALID_CREDENTIALS),
            QueueError::UnknownAgent(_)
            | QueueError::TicketNotFound(_)
            | QueueError::TicketNotAssigned { .. } => Self::not_found(message),
            QueueError::AgentUnavailable(_) => Self::forbidden(message),
            QueueError::TicketNotClaimable(_)
            | QueueError::AgentBusy { .. }
            | QueueError::AlreadyCompleted(_) => Self::conflict(message),
            QueueError::Storage(store) => {
                Self::unavailable("Record store temporarily unavailable")
                    .with_source(anyhow::Error::new(store))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "{}", self.message
                ),
                None => tracing::error!(status = %self.status, code = self.code, "{}", self.message),
            }
        }

        let body = Json(ErrorBody {
            code: self.code,
            message: &self.message,
        })
        .into_response();
        (self.status, body).into_response()
    }
}
