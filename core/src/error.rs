//! Error types for the service queue.
//!
//! Two layers, mirroring where a failure originates:
//!
//! - [`StoreError`]: the record store could not complete a call.
//! - [`QueueError`]: the engine rejected or failed an operation. Every failed
//!   engine call yields exactly one of these and leaves no partial mutation.

use crate::types::TicketNumber;
use thiserror::Error;

/// Failures reported by a [`RecordStore`](crate::RecordStore) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or timed out.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A write collided with a uniqueness constraint held by a concurrent
    /// writer.
    #[error("Record store conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Engine error taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Input rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No agent with this name exists.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// No ticket with this number exists.
    #[error("Ticket {0} not found")]
    TicketNotFound(TicketNumber),

    /// Password did not match.
    #[error("Invalid credential")]
    InvalidCredential,

    /// The agent is missing or `unavailable` and cannot call tickets.
    #[error("Agent {0} is not available")]
    AgentUnavailable(String),

    /// The agent already serves a ticket.
    #[error("Agent {agent} is already serving ticket {ticket_number}")]
    AgentBusy {
        /// Agent that attempted the call
        agent: String,
        /// Ticket the agent is currently serving
        ticket_number: TicketNumber,
    },

    /// The ticket is missing or not `waiting`.
    #[error("Ticket {0} cannot be called")]
    TicketNotClaimable(TicketNumber),

    /// The ticket is not assigned to the agent that tried to complete it.
    #[error("Ticket {ticket_number} is not assigned to agent {agent}")]
    TicketNotAssigned {
        /// Ticket that was targeted
        ticket_number: TicketNumber,
        /// Agent that attempted the completion
        agent: String,
    },

    /// The ticket is already `done`.
    #[error("Ticket {0} is already completed")]
    AlreadyCompleted(TicketNumber),

    /// The record store failed. See [`QueueError::is_retryable`].
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl QueueError {
    /// Whether repeating the same call may succeed.
    ///
    /// Only an unreachable or contended store is transient. Corrupt rows
    /// and every domain variant reflect stored state and will repeat.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(StoreError::Unavailable(_) | StoreError::Conflict(_))
        )
    }

    /// Stable, low-cardinality label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownAgent(_) => "unknown_agent",
            Self::TicketNotFound(_) => "ticket_not_found",
            Self::InvalidCredential => "invalid_credential",
            Self::AgentUnavailable(_) => "agent_unavailable",
            Self::AgentBusy { .. } => "agent_busy",
            Self::TicketNotClaimable(_) => "ticket_not_claimable",
            Self::TicketNotAssigned { .. } => "ticket_not_assigned",
            Self::AlreadyCompleted(_) => "already_completed",
            Self::Storage(_) => "storage",
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_storage_is_retryable() {
        let storage: QueueError = StoreError::Unavailable("timeout".into()).into();
        assert!(storage.is_retryable());
        assert_eq!(storage.kind(), "storage");
        assert!(QueueError::from(StoreError::Conflict("numbering".into())).is_retryable());

        let corrupt: QueueError = StoreError::Corrupt("bad status".into()).into();
        assert!(!corrupt.is_retryable());
        assert_eq!(corrupt.kind(), "storage");

        let ticket = TicketNumber::new(1).unwrap();
        for err in [
            QueueError::Validation("x".into()),
            QueueError::InvalidCredential,
            QueueError::TicketNotClaimable(ticket),
            QueueError::AlreadyCompleted(ticket),
        ] {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn storage_error_message_is_transparent() {
        let err: QueueError = StoreError::Conflict("ticket number".into()).into();
        assert_eq!(err.to_string(), "Record store conflict: ticket number");
    }

    #[test]
    fn busy_message_names_active_ticket() {
        let err = QueueError::AgentBusy {
            agent: "agent1".into(),
            ticket_number: TicketNumber::new(4).unwrap(),
        };
        assert_eq!(err.to_string(), "Agent agent1 is already serving ticket 4");
    }
}
