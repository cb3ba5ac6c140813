//! The queue engine: every state-changing operation goes through here.
//!
//! Each operation validates its input, makes exactly one atomic call to the
//! [`RecordStore`], and only after the store acknowledges success hands the
//! resulting events to the [`Broadcaster`]. The engine keeps no state of its
//! own between calls.

use crate::metrics::EngineMetrics;
use constant_time_eq::constant_time_eq;
use service_queue_core::environment::Clock;
use service_queue_core::validation::{validate_agent_name, validate_customer_name};
use service_queue_core::{
    AgentStatus, AgentSummary, Broadcaster, ClaimOutcome, CompleteOutcome, QueueError,
    QueueEvent, RecordStore, Result, Ticket, TicketNumber,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Collaborators injected into the engine at construction.
#[derive(Clone)]
pub struct QueueEnvironment {
    /// Source of truth for tickets and agents
    pub store: Arc<dyn RecordStore>,
    /// Push fan-out to observers
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Time source for `created_at`
    pub clock: Arc<dyn Clock>,
}

impl QueueEnvironment {
    /// Bundle the three collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            clock,
        }
    }
}

/// Owner of ticket lifecycle and agent availability transitions.
///
/// Cheap to clone; clones share the same store and broadcaster.
#[derive(Clone)]
pub struct QueueEngine {
    env: QueueEnvironment,
}

impl QueueEngine {
    /// Create an engine over `env`.
    #[must_use]
    pub const fn new(env: QueueEnvironment) -> Self {
        Self { env }
    }

    /// Register a customer and hand out the next ticket number.
    ///
    /// Emits `queue-update {ticket_number, customer_name, status: waiting}`.
    ///
    /// # Errors
    ///
    /// - `Validation`: name empty after trimming
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, customer_name: &str) -> Result<Ticket> {
        observe("register", async {
            let customer_name = validate_customer_name(customer_name)?;
            let ticket = self
                .env
                .store
                .insert_ticket(customer_name, self.env.clock.now())
                .await?;

            tracing::info!(ticket_number = %ticket.ticket_number, "Ticket registered");
            self.env
                .broadcaster
                .publish(QueueEvent::ticket_registered(&ticket));
            Ok(ticket)
        })
        .await
    }

    /// Authenticate an agent and mark it `available`.
    ///
    /// Callers outside the process should report `UnknownAgent` and
    /// `InvalidCredential` with the same message.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty name
    /// - `UnknownAgent`, `InvalidCredential`
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, name: &str, password: &str) -> Result<AgentSummary> {
        observe("login", async {
            let name = validate_agent_name(name)?;
            let agent = self
                .env
                .store
                .find_agent(name.clone())
                .await?
                .ok_or_else(|| QueueError::UnknownAgent(name.clone()))?;

            if !constant_time_eq(agent.password.as_bytes(), password.as_bytes()) {
                return Err(QueueError::InvalidCredential);
            }

            let agent = self
                .env
                .store
                .update_agent_status(name.clone(), AgentStatus::Available)
                .await?
                .ok_or(QueueError::UnknownAgent(name))?;

            tracing::info!(agent = %agent.name, "Agent logged in");
            Ok(agent.summary())
        })
        .await
    }

    /// All `waiting` tickets plus the agent's own `in_service` ticket,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty agent name
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self))]
    pub async fn list_queue_for_agent(&self, agent_name: &str) -> Result<Vec<Ticket>> {
        observe("list_queue_for_agent", async {
            let agent_name = validate_agent_name(agent_name)?;
            Ok(self.env.store.list_queue_for_agent(agent_name).await?)
        })
        .await
    }

    /// An agent calls a waiting ticket into service.
    ///
    /// Emits `queue-update {ticket_number, agent_name, status: in_service}`
    /// then `agent-status-update {name, status: busy}`.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty agent name
    /// - `AgentUnavailable`: agent missing or `unavailable`
    /// - `AgentBusy`: agent already serves a ticket
    /// - `TicketNotClaimable`: ticket missing or not `waiting`
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self), fields(ticket_number = %ticket_number))]
    pub async fn call(&self, ticket_number: TicketNumber, agent_name: &str) -> Result<Ticket> {
        observe("call", async {
            let agent_name = validate_agent_name(agent_name)?;
            let outcome = self
                .env
                .store
                .claim_ticket(ticket_number, agent_name.clone())
                .await?;

            let ticket = match outcome {
                ClaimOutcome::Claimed(ticket) => ticket,
                ClaimOutcome::AgentUnavailable => {
                    return Err(QueueError::AgentUnavailable(agent_name));
                }
                ClaimOutcome::AgentBusy(active) => {
                    return Err(QueueError::AgentBusy {
                        agent: agent_name,
                        ticket_number: active,
                    });
                }
                ClaimOutcome::NotClaimable => {
                    return Err(QueueError::TicketNotClaimable(ticket_number));
                }
            };

            tracing::info!(agent = %agent_name, "Ticket called");
            self.env
                .broadcaster
                .publish(QueueEvent::ticket_called(&ticket));
            self.env
                .broadcaster
                .publish(QueueEvent::agent_status(agent_name, AgentStatus::Busy));
            Ok(ticket)
        })
        .await
    }

    /// The assigned agent finishes a ticket and becomes `available`.
    ///
    /// Emits `queue-update {ticket_number, status: done}` then
    /// `agent-status-update {name, status: available}`.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty agent name
    /// - `TicketNotFound`: no such ticket
    /// - `TicketNotAssigned`: ticket belongs to another agent or to nobody
    /// - `AlreadyCompleted`: ticket already `done`; nothing changes
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self), fields(ticket_number = %ticket_number))]
    pub async fn complete(&self, ticket_number: TicketNumber, agent_name: &str) -> Result<Ticket> {
        observe("complete", async {
            let agent_name = validate_agent_name(agent_name)?;
            let outcome = self
                .env
                .store
                .complete_ticket(ticket_number, agent_name.clone())
                .await?;

            let ticket = match outcome {
                CompleteOutcome::Completed(ticket) => ticket,
                CompleteOutcome::NotFound => return Err(QueueError::TicketNotFound(ticket_number)),
                CompleteOutcome::NotAssigned => {
                    return Err(QueueError::TicketNotAssigned {
                        ticket_number,
                        agent: agent_name,
                    });
                }
                CompleteOutcome::AlreadyCompleted => {
                    return Err(QueueError::AlreadyCompleted(ticket_number));
                }
            };

            tracing::info!(agent = %agent_name, "Ticket completed");
            self.env
                .broadcaster
                .publish(QueueEvent::ticket_completed(&ticket));
            self.env
                .broadcaster
                .publish(QueueEvent::agent_status(agent_name, AgentStatus::Available));
            Ok(ticket)
        })
        .await
    }

    /// Operator override of an agent's status. Does not look at tickets.
    ///
    /// Emits `agent-status-update {name, status}`.
    ///
    /// # Errors
    ///
    /// - `Validation`: unknown status string or empty name
    /// - `UnknownAgent`
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self))]
    pub async fn set_agent_status(&self, name: &str, status: &str) -> Result<AgentSummary> {
        observe("set_agent_status", async {
            let status: AgentStatus = status.parse()?;
            let name = validate_agent_name(name)?;
            let agent = self
                .env
                .store
                .update_agent_status(name.clone(), status)
                .await?
                .ok_or(QueueError::UnknownAgent(name))?;

            tracing::info!(agent = %agent.name, %status, "Agent status overridden");
            self.env
                .broadcaster
                .publish(QueueEvent::agent_status(agent.name.clone(), status));
            Ok(agent.summary())
        })
        .await
    }

    /// Current status of an agent.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty name
    /// - `UnknownAgent`
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self))]
    pub async fn get_agent_status(&self, name: &str) -> Result<AgentStatus> {
        observe("get_agent_status", async {
            let name = validate_agent_name(name)?;
            self.env
                .store
                .find_agent(name.clone())
                .await?
                .map(|agent| agent.status)
                .ok_or(QueueError::UnknownAgent(name))
        })
        .await
    }

    /// Full record of one ticket.
    ///
    /// # Errors
    ///
    /// - `TicketNotFound`
    /// - `Storage`: store failure
    #[tracing::instrument(skip(self), fields(ticket_number = %ticket_number))]
    pub async fn get_ticket_status(&self, ticket_number: TicketNumber) -> Result<Ticket> {
        observe("get_ticket_status", async {
            self.env
                .store
                .find_ticket(ticket_number)
                .await?
                .ok_or(QueueError::TicketNotFound(ticket_number))
        })
        .await
    }

    /// Every ticket, ordered by `created_at`.
    ///
    /// # Errors
    ///
    /// `Storage`: store failure.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        observe("list_all_tickets", async {
            Ok(self.env.store.list_tickets().await?)
        })
        .await
    }

    /// Check that the record store answers.
    ///
    /// # Errors
    ///
    /// `Storage` when the store cannot be reached.
    pub async fn ping(&self) -> Result<()> {
        Ok(self.env.store.ping().await?)
    }
}

/// Run one operation, then log and count its outcome.
async fn observe<T, F>(operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fut.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err @ QueueError::Storage(_)) => {
            tracing::error!(operation, error = %err, "Record store failure");
            err.kind()
        }
        Err(err) => {
            tracing::debug!(operation, error = %err, "Operation rejected");
            err.kind()
        }
    };
    EngineMetrics::record_operation(operation, outcome, started.elapsed());
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{ChannelBroadcaster, InMemoryRecordStore};
    use service_queue_core::environment::SystemClock;

    fn engine() -> QueueEngine {
        QueueEngine::new(QueueEnvironment::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(ChannelBroadcaster::new(8)),
            Arc::new(SystemClock),
        ))
    }

    #[tokio::test]
    async fn blank_customer_name_never_reaches_store() {
        let engine = engine();
        let err = engine.register("   ").await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        assert!(engine.list_all_tickets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_status_string_is_validation_error() {
        let engine = engine();
        let err = engine.set_agent_status("agent1", "asleep").await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_agent_login_is_rejected() {
        let engine = engine();
        let err = engine.login("nobody", "pw").await.unwrap_err();
        assert_eq!(err, QueueError::UnknownAgent("nobody".into()));
    }

    #[tokio::test]
    async fn missing_ticket_status_is_not_found() {
        let engine = engine();
        let number = TicketNumber::new(3).unwrap();
        assert_eq!(
            engine.get_ticket_status(number).await.unwrap_err(),
            QueueError::TicketNotFound(number)
        );
    }
}
