//! Domain types for tickets and agents.
//!
//! Statuses are closed enums with explicit string forms because they cross
//! three boundaries: the record store (text columns), the HTTP API, and push
//! events. Parsing a status from any of those boundaries goes through
//! [`FromStr`] and fails with [`QueueError::Validation`].

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Ticket number
// ============================================================================

/// Sequential, positive ticket identifier.
///
/// Numbers are assigned by the record store as `max + 1` and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TicketNumber(i64);

impl TicketNumber {
    /// The number handed out when the store is empty.
    pub const FIRST: Self = Self(1);

    /// Create a ticket number.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] if `value` is not positive.
    pub fn new(value: i64) -> Result<Self, QueueError> {
        if value < 1 {
            return Err(QueueError::Validation(format!(
                "ticket number must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The number that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl TryFrom<i64> for TicketNumber {
    type Error = QueueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TicketNumber> for i64 {
    fn from(number: TicketNumber) -> Self {
        number.0
    }
}

impl FromStr for TicketNumber {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| QueueError::Validation(format!("invalid ticket number: {s:?}")))?;
        Self::new(value)
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Ticket lifecycle: `waiting -> in_service -> done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// In the queue, not yet called
    Waiting,
    /// Called by an agent and being served
    InService,
    /// Served; terminal
    Done,
}

impl TicketStatus {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InService => "in_service",
            Self::Done => "done",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Only the two forward edges exist; there are no cycles and no skips.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::InService) | (Self::InService, Self::Done)
        )
    }

    /// `done` accepts no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Position in the lifecycle, used to check that status never regresses.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::InService => 1,
            Self::Done => 2,
        }
    }
}

impl FromStr for TicketStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "in_service" => Ok(Self::InService),
            "done" => Ok(Self::Done),
            other => Err(QueueError::Validation(format!(
                "invalid ticket status: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Ready to call the next ticket
    Available,
    /// Serving a ticket (or forced busy by an operator)
    Busy,
    /// Off duty; cannot call tickets
    Unavailable,
}

impl AgentStatus {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
        }
    }

    /// Whether an agent in this status may call a ticket.
    ///
    /// Only `unavailable` blocks calling; a single-active-ticket check is done
    /// separately against the ticket table.
    #[must_use]
    pub const fn accepts_calls(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl FromStr for AgentStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "busy" => Ok(Self::Busy),
            "unavailable" => Ok(Self::Unavailable),
            other => Err(QueueError::Validation(format!(
                "invalid agent status: {other:?} (expected available, busy or unavailable)"
            ))),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A customer's place in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique sequential number
    pub ticket_number: TicketNumber,
    /// Display name given at registration; immutable
    pub customer_name: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Agent that called the ticket; kept after completion for audit
    pub assigned_agent: Option<String>,
    /// Creation time, used for queue ordering
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Build a freshly registered ticket.
    #[must_use]
    pub const fn waiting(
        ticket_number: TicketNumber,
        customer_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_number,
            customer_name,
            status: TicketStatus::Waiting,
            assigned_agent: None,
            created_at,
        }
    }

    /// Whether `agent_name` recorded this ticket.
    #[must_use]
    pub fn is_assigned_to(&self, agent_name: &str) -> bool {
        self.assigned_agent.as_deref() == Some(agent_name)
    }

    /// Whether this ticket is currently being served by `agent_name`.
    #[must_use]
    pub fn is_served_by(&self, agent_name: &str) -> bool {
        self.status == TicketStatus::InService && self.is_assigned_to(agent_name)
    }
}

/// A pre-provisioned service agent.
///
/// Holds the login secret, so it is deliberately not `Serialize`; use
/// [`Agent::summary`] for anything leaving the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Agent {
    /// Unique name, also the login subject
    pub name: String,
    /// Shared secret compared on login
    pub password: String,
    /// Current availability
    pub status: AgentStatus,
}

impl Agent {
    /// Public projection without the secret.
    #[must_use]
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            status: self.status,
        }
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("status", &self.status)
            .finish()
    }
}

/// Agent as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent name
    pub name: String,
    /// Current availability
    pub status: AgentStatus,
}
