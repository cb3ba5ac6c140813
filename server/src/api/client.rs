//! Client endpoints: take a ticket and follow it.
//!
//! - `POST /api/client/register`
//! - `GET /api/client/status?ticket_number=N`
//! - `GET /api/client/tickets`

use super::{json_body, query_params};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use service_queue_core::validation::customer_name_from_parts;
use service_queue_core::{Ticket, TicketNumber};
use service_queue_web::{AppError, WebResult};

/// Registration body: either a full name or its two parts.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Full customer name
    pub customer_name: Option<String>,
    /// Given name, joined with `last_name`
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
}

impl RegisterRequest {
    fn into_customer_name(self) -> WebResult<String> {
        match (self.customer_name, self.first_name, self.last_name) {
            (Some(name), _, _) => Ok(name),
            (None, None, None) => Err(AppError::validation(
                "customer_name or first_name and last_name are required",
            )),
            (None, first, last) => Ok(customer_name_from_parts(
                first.as_deref().unwrap_or_default(),
                last.as_deref().unwrap_or_default(),
            )?),
        }
    }
}

/// Registration result.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Always `true`
    pub success: bool,
    /// Assigned ticket number
    pub ticket_number: TicketNumber,
    /// Name as stored
    pub customer_name: String,
}

/// Take a ticket.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> WebResult<Json<RegisterResponse>> {
    let name = json_body(payload)?.into_customer_name()?;
    let ticket = state.engine.register(&name).await?;
    Ok(Json(RegisterResponse {
        success: true,
        ticket_number: ticket.ticket_number,
        customer_name: ticket.customer_name,
    }))
}

/// Query for [`ticket_status`]; the number stays a string so a non-numeric
/// value is reported as a validation error.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Ticket to look up
    pub ticket_number: Option<String>,
}

/// One ticket.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    /// Always `true`
    pub success: bool,
    /// Full record
    pub ticket: Ticket,
}

/// Look up one ticket.
pub async fn ticket_status(
    State(state): State<AppState>,
    params: Result<Query<StatusQuery>, QueryRejection>,
) -> WebResult<Json<TicketResponse>> {
    let raw = query_params(params)?
        .ticket_number
        .ok_or_else(|| AppError::validation("ticket_number is required"))?;
    let ticket_number: TicketNumber = raw.parse()?;
    let ticket = state.query.ticket_status(ticket_number).await?;
    Ok(Json(TicketResponse {
        success: true,
        ticket,
    }))
}

/// Every ticket.
#[derive(Debug, Serialize)]
pub struct TicketsResponse {
    /// Always `true`
    pub success: bool,
    /// Oldest first
    pub tickets: Vec<Ticket>,
}

/// Every ticket, oldest first.
pub async fn list_tickets(State(state): State<AppState>) -> WebResult<Json<TicketsResponse>> {
    let tickets = state.query.all_tickets().await?;
    Ok(Json(TicketsResponse {
        success: true,
        tickets,
    }))
}
