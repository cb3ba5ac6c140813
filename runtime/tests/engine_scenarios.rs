//! End-to-end engine behaviour against the in-memory store.
//!
//! Covers the basic ticket lifecycle, the agent/ticket policy interleavings,
//! and the exact events each successful mutation emits.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use service_queue_core::{
    AgentStatus, QueueError, QueueEvent, RecordStore, TicketNumber, TicketStatus,
};
use service_queue_runtime::{InMemoryRecordStore, QueueEngine, QueueEnvironment};
use service_queue_testing::{RecordingBroadcaster, StepClock, fixtures, init_test_tracing};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    engine: QueueEngine,
    store: Arc<InMemoryRecordStore>,
    events: Arc<RecordingBroadcaster>,
}

impl Harness {
    async fn new(agents: &[(&str, &str)]) -> Self {
        init_test_tracing();
        let store = Arc::new(InMemoryRecordStore::new());
        fixtures::seed_agents(store.as_ref(), agents).await.unwrap();
        let events = Arc::new(RecordingBroadcaster::new());
        let engine = QueueEngine::new(QueueEnvironment::new(
            store.clone(),
            events.clone(),
            Arc::new(StepClock::default()),
        ));
        Self {
            engine,
            store,
            events,
        }
    }

    /// Two agents, both logged in, events cleared.
    async fn with_logged_in_agents() -> Self {
        let harness = Self::new(&[("agent1", "secret1"), ("agent2", "secret2")]).await;
        harness.engine.login("agent1", "secret1").await.unwrap();
        harness.engine.login("agent2", "secret2").await.unwrap();
        harness
    }

    async fn agent_status(&self, name: &str) -> AgentStatus {
        self.engine.get_agent_status(name).await.unwrap()
    }
}

fn n(value: i64) -> TicketNumber {
    TicketNumber::new(value).unwrap()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn first_registration_gets_ticket_one() {
    let h = Harness::new(&[]).await;

    let ticket = h.engine.register("Ada Lovelace").await.unwrap();

    assert_eq!(ticket.ticket_number, n(1));
    assert_eq!(ticket.customer_name, "Ada Lovelace");
    assert_eq!(ticket.status, TicketStatus::Waiting);
    assert_eq!(ticket.assigned_agent, None);
}

#[tokio::test]
async fn login_with_correct_password_sets_available() {
    let h = Harness::new(&[("agent1", "secret1")]).await;
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Unavailable);

    let agent = h.engine.login("agent1", "secret1").await.unwrap();

    assert_eq!(agent.name, "agent1");
    assert_eq!(agent.status, AgentStatus::Available);
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Available);
}

#[tokio::test]
async fn login_with_wrong_password_changes_nothing() {
    let h = Harness::new(&[("agent1", "secret1")]).await;

    let err = h.engine.login("agent1", "wrong").await.unwrap_err();

    assert_eq!(err, QueueError::InvalidCredential);
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Unavailable);
}

#[tokio::test]
async fn called_ticket_cannot_be_called_again() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();

    let ticket = h.engine.call(n(1), "agent1").await.unwrap();
    assert_eq!(ticket.status, TicketStatus::InService);
    assert_eq!(ticket.assigned_agent.as_deref(), Some("agent1"));
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Busy);

    let err = h.engine.call(n(1), "agent2").await.unwrap_err();
    assert_eq!(err, QueueError::TicketNotClaimable(n(1)));
    assert_eq!(h.agent_status("agent2").await, AgentStatus::Available);
}

#[tokio::test]
async fn complete_frees_the_agent() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    let ticket = h.engine.complete(n(1), "agent1").await.unwrap();

    assert_eq!(ticket.status, TicketStatus::Done);
    assert_eq!(ticket.assigned_agent.as_deref(), Some("agent1"));
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Available);
    assert_eq!(
        h.engine.get_ticket_status(n(1)).await.unwrap().status,
        TicketStatus::Done
    );
}

#[tokio::test]
async fn unavailable_agent_cannot_call() {
    let h = Harness::new(&[("agent1", "secret1")]).await;
    h.engine.register("Ada").await.unwrap();
    h.events.clear();

    let err = h.engine.call(n(1), "agent1").await.unwrap_err();

    assert_eq!(err, QueueError::AgentUnavailable("agent1".into()));
    let ticket = h.engine.get_ticket_status(n(1)).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Waiting);
    assert_eq!(ticket.assigned_agent, None);
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Unavailable);
    assert!(h.events.events().is_empty());
}

// ============================================================================
// Policies
// ============================================================================

#[tokio::test]
async fn unknown_agent_call_is_agent_unavailable() {
    let h = Harness::new(&[]).await;
    h.engine.register("Ada").await.unwrap();

    let err = h.engine.call(n(1), "ghost").await.unwrap_err();
    assert_eq!(err, QueueError::AgentUnavailable("ghost".into()));
}

#[tokio::test]
async fn call_on_missing_ticket_is_not_claimable() {
    let h = Harness::with_logged_in_agents().await;
    let err = h.engine.call(n(42), "agent1").await.unwrap_err();
    assert_eq!(err, QueueError::TicketNotClaimable(n(42)));
}

#[tokio::test]
async fn busy_agent_cannot_call_second_ticket() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.register("Grace").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    let err = h.engine.call(n(2), "agent1").await.unwrap_err();

    assert_eq!(
        err,
        QueueError::AgentBusy {
            agent: "agent1".into(),
            ticket_number: n(1),
        }
    );
    assert_eq!(
        h.engine.get_ticket_status(n(2)).await.unwrap().status,
        TicketStatus::Waiting
    );
}

#[tokio::test]
async fn manual_override_does_not_unlock_second_claim() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.register("Grace").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    h.engine.set_agent_status("agent1", "available").await.unwrap();
    let err = h.engine.call(n(2), "agent1").await.unwrap_err();
    assert!(matches!(err, QueueError::AgentBusy { .. }));
}

#[tokio::test]
async fn login_while_busy_sets_available_but_keeps_ticket() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.register("Grace").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    let agent = h.engine.login("agent1", "secret1").await.unwrap();

    assert_eq!(agent.status, AgentStatus::Available);
    assert_eq!(
        h.engine.get_ticket_status(n(1)).await.unwrap().status,
        TicketStatus::InService
    );
    assert!(matches!(
        h.engine.call(n(2), "agent1").await.unwrap_err(),
        QueueError::AgentBusy { .. }
    ));
}

#[tokio::test]
async fn forced_unavailable_during_service_does_not_block_complete() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    h.engine
        .set_agent_status("agent1", "unavailable")
        .await
        .unwrap();
    h.engine.complete(n(1), "agent1").await.unwrap();

    // Derived path writes last.
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Available);
}

#[tokio::test]
async fn complete_by_other_agent_is_not_assigned() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();

    let err = h.engine.complete(n(1), "agent2").await.unwrap_err();

    assert_eq!(
        err,
        QueueError::TicketNotAssigned {
            ticket_number: n(1),
            agent: "agent2".into(),
        }
    );
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Busy);
}

#[tokio::test]
async fn complete_on_waiting_ticket_is_not_assigned() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();

    let err = h.engine.complete(n(1), "agent1").await.unwrap_err();
    assert!(matches!(err, QueueError::TicketNotAssigned { .. }));
}

#[tokio::test]
async fn complete_on_missing_ticket_is_not_found() {
    let h = Harness::with_logged_in_agents().await;
    let err = h.engine.complete(n(9), "agent1").await.unwrap_err();
    assert_eq!(err, QueueError::TicketNotFound(n(9)));
}

#[tokio::test]
async fn second_complete_is_rejected_without_side_effects() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.register("Grace").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();
    h.engine.complete(n(1), "agent1").await.unwrap();
    h.engine.call(n(2), "agent1").await.unwrap();
    h.events.clear();

    let err = h.engine.complete(n(1), "agent1").await.unwrap_err();

    assert_eq!(err, QueueError::AlreadyCompleted(n(1)));
    assert_eq!(h.agent_status("agent1").await, AgentStatus::Busy);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn set_status_on_unknown_agent_fails() {
    let h = Harness::new(&[]).await;
    let err = h.engine.set_agent_status("ghost", "busy").await.unwrap_err();
    assert_eq!(err, QueueError::UnknownAgent("ghost".into()));
    assert!(h.events.events().is_empty());
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn agent_queue_shows_waiting_and_own_service_in_creation_order() {
    let h = Harness::with_logged_in_agents().await;
    for name in ["Ada", "Grace", "Alan", "Edsger"] {
        h.engine.register(name).await.unwrap();
    }
    h.engine.call(n(2), "agent1").await.unwrap();
    h.engine.call(n(3), "agent2").await.unwrap();

    let queue: Vec<i64> = h
        .engine
        .list_queue_for_agent("agent1")
        .await
        .unwrap()
        .iter()
        .map(|t| t.ticket_number.get())
        .collect();

    assert_eq!(queue, [1, 2, 4]);
}

#[tokio::test]
async fn full_listing_is_in_creation_order() {
    let h = Harness::new(&[]).await;
    for name in ["Ada", "Grace", "Alan"] {
        h.engine.register(name).await.unwrap();
    }

    let all = h.engine.list_all_tickets().await.unwrap();
    let numbers: Vec<i64> = all.iter().map(|t| t.ticket_number.get()).collect();
    assert_eq!(numbers, [1, 2, 3]);
    assert!(all.windows(2).all(|w| w[0].created_at < w[1].created_at));
}

#[tokio::test]
async fn registration_trims_customer_name() {
    let h = Harness::new(&[]).await;
    let ticket = h.engine.register("  Ada  ").await.unwrap();
    assert_eq!(ticket.customer_name, "Ada");
    let stored = h.store.find_ticket(n(1)).await.unwrap().unwrap();
    assert_eq!(stored.customer_name, "Ada");
}

// ============================================================================
// Event correlation
// ============================================================================

#[tokio::test]
async fn register_emits_one_queue_update() {
    let h = Harness::new(&[]).await;
    let ticket = h.engine.register("Ada").await.unwrap();

    assert_eq!(
        h.events.events(),
        vec![QueueEvent::ticket_registered(&ticket)]
    );
}

#[tokio::test]
async fn login_emits_nothing() {
    let h = Harness::new(&[("agent1", "secret1")]).await;
    h.engine.login("agent1", "secret1").await.unwrap();
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn call_emits_queue_update_then_agent_busy() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.events.clear();

    let ticket = h.engine.call(n(1), "agent1").await.unwrap();

    let events = h.events.take();
    assert_eq!(
        events,
        vec![
            QueueEvent::ticket_called(&ticket),
            QueueEvent::agent_status("agent1", AgentStatus::Busy),
        ]
    );
    let QueueEvent::QueueUpdate(update) = &events[0] else {
        unreachable!("first event is a queue update");
    };
    assert_eq!(update.agent_name.as_deref(), Some("agent1"));
    assert_eq!(update.status, TicketStatus::InService);
}

#[tokio::test]
async fn complete_emits_queue_update_then_agent_available() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();
    h.events.clear();

    let ticket = h.engine.complete(n(1), "agent1").await.unwrap();

    assert_eq!(
        h.events.take(),
        vec![
            QueueEvent::ticket_completed(&ticket),
            QueueEvent::agent_status("agent1", AgentStatus::Available),
        ]
    );
}

#[tokio::test]
async fn set_status_emits_agent_status_update() {
    let h = Harness::with_logged_in_agents().await;
    h.events.clear();

    let agent = h.engine.set_agent_status("agent2", "busy").await.unwrap();

    assert_eq!(agent.status, AgentStatus::Busy);
    assert_eq!(
        h.events.take(),
        vec![QueueEvent::agent_status("agent2", AgentStatus::Busy)]
    );
}

#[tokio::test]
async fn rejected_operations_emit_nothing() {
    let h = Harness::with_logged_in_agents().await;
    h.engine.register("Ada").await.unwrap();
    h.engine.call(n(1), "agent1").await.unwrap();
    h.events.clear();

    let _ = h.engine.call(n(1), "agent2").await;
    let _ = h.engine.complete(n(1), "agent2").await;
    let _ = h.engine.register("").await;
    let _ = h.engine.set_agent_status("agent1", "lunch").await;

    assert!(h.events.events().is_empty());
}
