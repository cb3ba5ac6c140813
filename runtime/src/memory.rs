//! In-memory record store.
//!
//! Both tables sit behind one mutex and every trait method runs entirely
//! under it, so each call is a single atomic unit. Nothing survives a
//! restart; use the Postgres store for that.

use service_queue_core::{
    Agent, AgentStatus, ClaimOutcome, CompleteOutcome, DateTime, RecordStore, StoreError,
    StoreFuture, Ticket, TicketNumber, TicketStatus, Utc,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    tickets: BTreeMap<TicketNumber, Ticket>,
    agents: HashMap<String, Agent>,
}

impl Tables {
    fn next_ticket_number(&self) -> TicketNumber {
        self.tickets
            .keys()
            .next_back()
            .map_or(TicketNumber::FIRST, |last| last.next())
    }

    fn active_ticket_of(&self, agent_name: &str) -> Option<TicketNumber> {
        self.tickets
            .values()
            .find(|ticket| ticket.is_served_by(agent_name))
            .map(|ticket| ticket.ticket_number)
    }

    fn sorted<'a>(tickets: impl Iterator<Item = &'a Ticket>) -> Vec<Ticket> {
        let mut out: Vec<Ticket> = tickets.cloned().collect();
        out.sort_by_key(|ticket| (ticket.created_at, ticket.ticket_number));
        out
    }
}

/// Record store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_ticket(
        &self,
        customer_name: String,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            let number = tables.next_ticket_number();
            let ticket = Ticket::waiting(number, customer_name, created_at);
            tables.tickets.insert(number, ticket.clone());
            Ok(ticket)
        })
    }

    fn find_ticket(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move { Ok(self.tables()?.tickets.get(&ticket_number).cloned()) })
    }

    fn list_tickets(&self) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move { Ok(Tables::sorted(self.tables()?.tickets.values())) })
    }

    fn list_queue_for_agent(&self, agent_name: String) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let tables = self.tables()?;
            Ok(Tables::sorted(tables.tickets.values().filter(|ticket| {
                ticket.status == TicketStatus::Waiting || ticket.is_served_by(&agent_name)
            })))
        })
    }

    fn find_agent(&self, name: String) -> StoreFuture<'_, Option<Agent>> {
        Box::pin(async move { Ok(self.tables()?.agents.get(&name).cloned()) })
    }

    fn update_agent_status(
        &self,
        name: String,
        status: AgentStatus,
    ) -> StoreFuture<'_, Option<Agent>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            Ok(tables.agents.get_mut(&name).map(|agent| {
                agent.status = status;
                agent.clone()
            }))
        })
    }

    fn claim_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, ClaimOutcome> {
        Box::pin(async move {
            let mut tables = self.tables()?;

            match tables.agents.get(&agent_name) {
                Some(agent) if agent.status.accepts_calls() => {}
                _ => return Ok(ClaimOutcome::AgentUnavailable),
            }
            if let Some(active) = tables.active_ticket_of(&agent_name) {
                return Ok(ClaimOutcome::AgentBusy(active));
            }

            let Some(ticket) = tables
                .tickets
                .get_mut(&ticket_number)
                .filter(|ticket| ticket.status.can_transition_to(TicketStatus::InService))
            else {
                return Ok(ClaimOutcome::NotClaimable);
            };
            ticket.status = TicketStatus::InService;
            ticket.assigned_agent = Some(agent_name.clone());
            let claimed = ticket.clone();

            if let Some(agent) = tables.agents.get_mut(&agent_name) {
                agent.status = AgentStatus::Busy;
            }
            Ok(ClaimOutcome::Claimed(claimed))
        })
    }

    fn complete_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, CompleteOutcome> {
        Box::pin(async move {
            let mut tables = self.tables()?;

            let Some(ticket) = tables.tickets.get_mut(&ticket_number) else {
                return Ok(CompleteOutcome::NotFound);
            };
            if !ticket.is_assigned_to(&agent_name) {
                return Ok(CompleteOutcome::NotAssigned);
            }
            if ticket.status.is_terminal() {
                return Ok(CompleteOutcome::AlreadyCompleted);
            }
            if !ticket.status.can_transition_to(TicketStatus::Done) {
                return Ok(CompleteOutcome::NotAssigned);
            }
            ticket.status = TicketStatus::Done;
            let completed = ticket.clone();

            if let Some(agent) = tables.agents.get_mut(&agent_name) {
                agent.status = AgentStatus::Available;
            }
            Ok(CompleteOutcome::Completed(completed))
        })
    }

    fn provision_agent(&self, name: String, password: String) -> StoreFuture<'_, Agent> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            let agent = tables
                .agents
                .entry(name.clone())
                .and_modify(|agent| agent.password.clone_from(&password))
                .or_insert_with(|| Agent {
                    name,
                    password,
                    status: AgentStatus::Unavailable,
                });
            Ok(agent.clone())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.tables()?;
            Ok(())
        })
    }
}
