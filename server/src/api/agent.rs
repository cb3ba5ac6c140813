//! Agent endpoints.
//!
//! - `POST /api/agent/login`
//! - `GET /api/agent/queue?agent_name=`
//! - `POST /api/agent/call`, `POST /api/agent/complete`
//! - `GET /api/agent/status?name=`, `POST /api/agent/status`

use super::{json_body, query_params};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use service_queue_core::{AgentStatus, AgentSummary, Ticket, TicketNumber};
use service_queue_web::{AppError, WebResult};

/// Login body.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Agent name
    pub name: String,
    /// Shared secret
    pub password: String,
}

/// Login result.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Always `true`
    pub success: bool,
    /// Agent after login
    pub agent: AgentSummary,
}

/// Authenticate and become available.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> WebResult<Json<LoginResponse>> {
    let request = json_body(payload)?;
    let agent = state
        .engine
        .login(&request.name, &request.password)
        .await
        .map_err(AppError::from_login)?;
    Ok(Json(LoginResponse {
        success: true,
        agent,
    }))
}

/// Query for [`queue`].
#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Agent whose in-service ticket is included
    pub agent_name: Option<String>,
}

/// Waiting tickets plus the agent's own in-service ticket. The body is a
/// bare array.
pub async fn queue(
    State(state): State<AppState>,
    params: Result<Query<QueueQuery>, QueryRejection>,
) -> WebResult<Json<Vec<Ticket>>> {
    let agent_name = query_params(params)?.agent_name.unwrap_or_default();
    Ok(Json(state.query.queue_for_agent(&agent_name).await?))
}

/// Call or complete body.
#[derive(Debug, Deserialize)]
pub struct TicketAction {
    /// Target ticket
    pub ticket_number: i64,
    /// Acting agent
    pub agent_name: String,
}

/// Call or complete result.
#[derive(Debug, Serialize)]
pub struct TicketActionResponse {
    /// Always `true`
    pub success: bool,
    /// Target ticket
    pub ticket_number: TicketNumber,
    /// Acting agent
    pub agent_name: String,
}

/// Claim a waiting ticket.
pub async fn call(
    State(state): State<AppState>,
    payload: Result<Json<TicketAction>, JsonRejection>,
) -> WebResult<Json<TicketActionResponse>> {
    let action = json_body(payload)?;
    let ticket_number = TicketNumber::new(action.ticket_number)?;
    state.engine.call(ticket_number, &action.agent_name).await?;
    Ok(Json(TicketActionResponse {
        success: true,
        ticket_number,
        agent_name: action.agent_name,
    }))
}

/// Finish the agent's in-service ticket.
pub async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<TicketAction>, JsonRejection>,
) -> WebResult<Json<TicketActionResponse>> {
    let action = json_body(payload)?;
    let ticket_number = TicketNumber::new(action.ticket_number)?;
    state
        .engine
        .complete(ticket_number, &action.agent_name)
        .await?;
    Ok(Json(TicketActionResponse {
        success: true,
        ticket_number,
        agent_name: action.agent_name,
    }))
}

/// Query for [`get_status`].
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Agent name
    pub name: Option<String>,
}

/// Status body for both status routes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `true`
    pub success: bool,
    /// Current status
    pub status: AgentStatus,
}

/// Current status of an agent.
pub async fn get_status(
    State(state): State<AppState>,
    params: Result<Query<StatusQuery>, QueryRejection>,
) -> WebResult<Json<StatusResponse>> {
    let name = query_params(params)?.name.unwrap_or_default();
    let status = state.query.agent_status(&name).await?;
    Ok(Json(StatusResponse {
        success: true,
        status,
    }))
}

/// Manual status override body. `status` is a free string so an unknown
/// value is a validation error rather than a JSON rejection.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Agent name
    pub name: String,
    /// `available`, `busy` or `unavailable`
    pub status: String,
}

/// Override an agent's status.
pub async fn set_status(
    State(state): State<AppState>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> WebResult<Json<StatusResponse>> {
    let request = json_body(payload)?;
    let agent = state
        .engine
        .set_agent_status(&request.name, &request.status)
        .await?;
    Ok(Json(StatusResponse {
        success: true,
        status: agent.status,
    }))
}
