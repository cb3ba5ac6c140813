//! Read-only projections for observers.
//!
//! Observers load initial state and reconcile after a missed push event
//! through here. Every call is idempotent and side-effect free, so transient
//! storage failures are retried with backoff.

use crate::engine::QueueEngine;
use crate::retry::{RetryPolicy, retry_with_predicate};
use serde::Serialize;
use service_queue_core::{AgentStatus, QueueError, Result, Ticket, TicketNumber, TicketStatus};

/// What the public display shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayBoard {
    /// Tickets still in the queue, oldest first
    pub waiting: Vec<Ticket>,
    /// Tickets being served, oldest first
    pub now_serving: Vec<Ticket>,
    /// The in-service ticket created most recently
    pub last_called: Option<Ticket>,
}

impl DisplayBoard {
    /// Build the board from a full ticket listing in `created_at` order.
    #[must_use]
    pub fn from_tickets(tickets: Vec<Ticket>) -> Self {
        let (waiting, rest): (Vec<_>, Vec<_>) = tickets
            .into_iter()
            .partition(|ticket| ticket.status == TicketStatus::Waiting);
        let now_serving: Vec<Ticket> = rest
            .into_iter()
            .filter(|ticket| ticket.status == TicketStatus::InService)
            .collect();
        let last_called = now_serving
            .iter()
            .max_by_key(|ticket| (ticket.created_at, ticket.ticket_number))
            .cloned();

        Self {
            waiting,
            now_serving,
            last_called,
        }
    }
}

/// Retrying read façade over the engine.
#[derive(Clone)]
pub struct QuerySurface {
    engine: QueueEngine,
    policy: RetryPolicy,
}

impl QuerySurface {
    /// Wrap `engine`, retrying storage failures according to `policy`.
    #[must_use]
    pub const fn new(engine: QueueEngine, policy: RetryPolicy) -> Self {
        Self { engine, policy }
    }

    /// See [`QueueEngine::list_queue_for_agent`].
    ///
    /// # Errors
    ///
    /// `Validation`, or `Storage` once retries are exhausted.
    pub async fn queue_for_agent(&self, agent_name: &str) -> Result<Vec<Ticket>> {
        retry_with_predicate(
            &self.policy,
            || self.engine.list_queue_for_agent(agent_name),
            QueueError::is_retryable,
        )
        .await
    }

    /// See [`QueueEngine::get_ticket_status`].
    ///
    /// # Errors
    ///
    /// `TicketNotFound`, or `Storage` once retries are exhausted.
    pub async fn ticket_status(&self, ticket_number: TicketNumber) -> Result<Ticket> {
        retry_with_predicate(
            &self.policy,
            || self.engine.get_ticket_status(ticket_number),
            QueueError::is_retryable,
        )
        .await
    }

    /// See [`QueueEngine::list_all_tickets`].
    ///
    /// # Errors
    ///
    /// `Storage` once retries are exhausted.
    pub async fn all_tickets(&self) -> Result<Vec<Ticket>> {
        retry_with_predicate(
            &self.policy,
            || self.engine.list_all_tickets(),
            QueueError::is_retryable,
        )
        .await
    }

    /// See [`QueueEngine::get_agent_status`].
    ///
    /// # Errors
    ///
    /// `Validation`, `UnknownAgent`, or `Storage` once retries are exhausted.
    pub async fn agent_status(&self, name: &str) -> Result<AgentStatus> {
        retry_with_predicate(
            &self.policy,
            || self.engine.get_agent_status(name),
            QueueError::is_retryable,
        )
        .await
    }

    /// Waiting queue, tickets in service, and the most recent call.
    ///
    /// # Errors
    ///
    /// `Storage` once retries are exhausted.
    pub async fn display_board(&self) -> Result<DisplayBoard> {
        Ok(DisplayBoard::from_tickets(self.all_tickets().await?))
    }

    /// Readiness probe; not retried so a failing store is reported promptly.
    ///
    /// # Errors
    ///
    /// `Storage` when the store cannot be reached.
    pub async fn ready(&self) -> Result<()> {
        self.engine.ping().await
    }
}
