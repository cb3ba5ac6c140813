//! Seeding helpers that write directly to a record store.
//!
//! These bypass the engine, so they emit no events.

use service_queue_core::{
    Agent, AgentStatus, DateTime, RecordStore, StoreError, Ticket, Utc,
};

/// Password used by [`seed_agents`] callers that do not care about it.
pub const DEFAULT_PASSWORD: &str = "password";

/// Provision each `(name, password)` pair. New agents start `unavailable`.
///
/// # Errors
///
/// Propagates the first store failure.
pub async fn seed_agents(
    store: &dyn RecordStore,
    agents: &[(&str, &str)],
) -> Result<Vec<Agent>, StoreError> {
    let mut seeded = Vec::with_capacity(agents.len());
    for (name, password) in agents {
        seeded.push(
            store
                .provision_agent((*name).to_string(), (*password).to_string())
                .await?,
        );
    }
    Ok(seeded)
}

/// Provision an agent and mark it `available`, as if it had logged in.
///
/// # Errors
///
/// Propagates store failures; `Corrupt` if the agent vanished in between.
pub async fn seed_available_agent(
    store: &dyn RecordStore,
    name: &str,
    password: &str,
) -> Result<Agent, StoreError> {
    store
        .provision_agent(name.to_string(), password.to_string())
        .await?;
    store
        .update_agent_status(name.to_string(), AgentStatus::Available)
        .await?
        .ok_or_else(|| StoreError::Corrupt(format!("agent {name} missing after provisioning")))
}

/// Insert one `waiting` ticket per name, one second apart starting at `start`.
///
/// # Errors
///
/// Propagates the first store failure.
pub async fn seed_waiting_tickets(
    store: &dyn RecordStore,
    start: DateTime<Utc>,
    names: &[&str],
) -> Result<Vec<Ticket>, StoreError> {
    let mut tickets = Vec::with_capacity(names.len());
    for (offset, name) in (0_i64..).zip(names) {
        let created_at = start + chrono::Duration::seconds(offset);
        tickets.push(store.insert_ticket((*name).to_string(), created_at).await?);
    }
    Ok(tickets)
}
