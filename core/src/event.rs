//! Push events sent to observers after a successful mutation.
//!
//! Events are hints: observers re-pull state through the query surface rather
//! than treating a payload as authoritative. On the wire every event is a JSON
//! object `{"event": "<kind>", "data": {...}}`.

use crate::types::{AgentStatus, Ticket, TicketNumber, TicketStatus};
use serde::{Deserialize, Serialize};

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum QueueEvent {
    /// A ticket was registered, called, or completed.
    QueueUpdate(QueueUpdate),
    /// An agent's availability changed.
    AgentStatusUpdate(AgentStatusUpdate),
}

/// Payload of a `queue-update` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueUpdate {
    /// Ticket that changed
    pub ticket_number: TicketNumber,
    /// Present on registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Present when a ticket is called
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Status after the change
    pub status: TicketStatus,
}

/// Payload of an `agent-status-update` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusUpdate {
    /// Agent that changed
    pub name: String,
    /// Status after the change
    pub status: AgentStatus,
}

impl QueueEvent {
    /// `queue-update` for a newly registered ticket.
    #[must_use]
    pub fn ticket_registered(ticket: &Ticket) -> Self {
        Self::QueueUpdate(QueueUpdate {
            ticket_number: ticket.ticket_number,
            customer_name: Some(ticket.customer_name.clone()),
            agent_name: None,
            status: ticket.status,
        })
    }

    /// `queue-update` for a ticket moved into service.
    #[must_use]
    pub fn ticket_called(ticket: &Ticket) -> Self {
        Self::QueueUpdate(QueueUpdate {
            ticket_number: ticket.ticket_number,
            customer_name: None,
            agent_name: ticket.assigned_agent.clone(),
            status: ticket.status,
        })
    }

    /// `queue-update` for a completed ticket.
    #[must_use]
    pub fn ticket_completed(ticket: &Ticket) -> Self {
        Self::QueueUpdate(QueueUpdate {
            ticket_number: ticket.ticket_number,
            customer_name: None,
            agent_name: None,
            status: ticket.status,
        })
    }

    /// `agent-status-update`.
    #[must_use]
    pub fn agent_status(name: impl Into<String>, status: AgentStatus) -> Self {
        Self::AgentStatusUpdate(AgentStatusUpdate {
            name: name.into(),
            status,
        })
    }

    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::QueueUpdate(_) => "queue-update",
            Self::AgentStatusUpdate(_) => "agent-status-update",
        }
    }
}
