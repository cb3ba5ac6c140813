//! Row decoding and sqlx error classification.

use service_queue_core::{
    Agent, AgentStatus, DateTime, StoreError, Ticket, TicketNumber, TicketStatus, Utc,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

pub(crate) fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    let number: i64 = row.try_get("ticket_number").map_err(db_error)?;
    let status: String = row.try_get("status").map_err(db_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_error)?;
    Ok(Ticket {
        ticket_number: TicketNumber::new(number).map_err(corrupt)?,
        customer_name: row.try_get("customer_name").map_err(db_error)?,
        status: status.parse::<TicketStatus>().map_err(corrupt)?,
        assigned_agent: row.try_get("assigned_agent").map_err(db_error)?,
        created_at,
    })
}

pub(crate) fn agent_from_row(row: &PgRow) -> Result<Agent, StoreError> {
    let status: String = row.try_get("status").map_err(db_error)?;
    Ok(Agent {
        name: row.try_get("name").map_err(db_error)?,
        password: row.try_get("password").map_err(db_error)?,
        status: status.parse::<AgentStatus>().map_err(corrupt)?,
    })
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Classify a sqlx failure.
///
/// Connectivity problems are transient; decode failures mean a row the
/// domain types reject.
pub(crate) fn db_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(err.to_string())
        }
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}
