//! Record store abstraction.
//!
//! The record store is the single source of truth for tickets and agents. The
//! engine keeps no cache between calls; every decision is made by the store
//! inside one atomic unit, and the outcome is reported back as a value.
//!
//! # Atomicity
//!
//! [`RecordStore::claim_ticket`] and [`RecordStore::complete_ticket`] check
//! their preconditions and apply both the ticket and the agent change in a
//! single atomic step (a mutex in memory, a transaction in Postgres). Losing a
//! race is reported as an outcome variant, not as a [`StoreError`].
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] instead of using `async fn` so the store can
//! be shared as `Arc<dyn RecordStore>`. Arguments are owned so the returned
//! future only borrows `self`.

use crate::error::StoreError;
use crate::types::{Agent, AgentStatus, Ticket, TicketNumber};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`RecordStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of an atomic claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The ticket is now `in_service` for the agent and the agent is `busy`.
    Claimed(Ticket),
    /// The agent does not exist or is `unavailable`.
    AgentUnavailable,
    /// The agent already serves the given ticket.
    AgentBusy(TicketNumber),
    /// The ticket does not exist or is not `waiting`.
    NotClaimable,
}

/// Result of an atomic completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The ticket is now `done` and the agent is `available`.
    Completed(Ticket),
    /// No such ticket.
    NotFound,
    /// The ticket's `assigned_agent` is absent or names someone else.
    NotAssigned,
    /// The ticket was already `done` (by this agent).
    AlreadyCompleted,
}

/// Durable storage of tickets and agents.
///
/// Listing methods return tickets ordered by `created_at`, then
/// `ticket_number`.
pub trait RecordStore: Send + Sync {
    /// Insert a `waiting` ticket numbered `max(existing) + 1`.
    ///
    /// Numbering must be race-free: two concurrent inserts never receive the
    /// same number.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    /// - `Conflict`: a concurrent writer broke a uniqueness constraint
    fn insert_ticket(
        &self,
        customer_name: String,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Ticket>;

    /// Point lookup by number.
    ///
    /// # Errors
    ///
    /// Backend or decode failure.
    fn find_ticket(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>>;

    /// Every ticket, oldest first.
    ///
    /// # Errors
    ///
    /// Backend or decode failure.
    fn list_tickets(&self) -> StoreFuture<'_, Vec<Ticket>>;

    /// `waiting` tickets plus `in_service` tickets assigned to `agent_name`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Backend or decode failure.
    fn list_queue_for_agent(&self, agent_name: String) -> StoreFuture<'_, Vec<Ticket>>;

    /// Point lookup by name.
    ///
    /// # Errors
    ///
    /// Backend or decode failure.
    fn find_agent(&self, name: String) -> StoreFuture<'_, Option<Agent>>;

    /// Set an agent's status unconditionally; `None` if the agent is unknown.
    ///
    /// # Errors
    ///
    /// Backend or decode failure.
    fn update_agent_status(
        &self,
        name: String,
        status: AgentStatus,
    ) -> StoreFuture<'_, Option<Agent>>;

    /// Atomically move a `waiting` ticket into service for `agent_name`.
    ///
    /// Checks, in order: the agent exists and is not `unavailable`; the agent
    /// has no `in_service` ticket; the ticket exists and is `waiting`.
    ///
    /// # Errors
    ///
    /// Backend or decode failure. Precondition failures are outcomes.
    fn claim_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, ClaimOutcome>;

    /// Atomically finish a ticket assigned to `agent_name` and free the agent.
    ///
    /// # Errors
    ///
    /// Backend or decode failure. Precondition failures are outcomes.
    fn complete_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, CompleteOutcome>;

    /// Create an agent (status `unavailable`) or replace an existing agent's
    /// password, keeping its status. Used for operator seeding only.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn provision_agent(&self, name: String, password: String) -> StoreFuture<'_, Agent>;

    /// Cheap liveness check.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the backend cannot be reached.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
