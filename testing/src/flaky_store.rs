//! Record store wrapper that injects storage failures.

use service_queue_core::{
    Agent, AgentStatus, ClaimOutcome, CompleteOutcome, DateTime, RecordStore, StoreError,
    StoreFuture, Ticket, TicketNumber, Utc,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a real store and fails selected calls, with
/// [`StoreError::Unavailable`] unless another error is set via
/// [`FlakyRecordStore::inject`].
///
/// Failures are injected before the inner store is reached, so a failed call
/// never mutates anything.
pub struct FlakyRecordStore {
    inner: Arc<dyn RecordStore>,
    fail_next: AtomicUsize,
    fail_always: AtomicBool,
    calls: AtomicUsize,
    injected: AtomicUsize,
    error: Mutex<StoreError>,
}

impl FlakyRecordStore {
    /// Wrap `inner` with failure injection turned off.
    #[must_use]
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            fail_next: AtomicUsize::new(0),
            fail_always: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
            error: Mutex::new(StoreError::Unavailable("injected failure".to_string())),
        }
    }

    /// Fail the next `n` calls, then recover.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched off.
    pub fn fail_always(&self, enabled: bool) {
        self.fail_always.store(enabled, Ordering::SeqCst);
    }

    /// Error returned by injected failures from now on.
    pub fn inject(&self, error: StoreError) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Total calls received, failed or not.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that were failed on purpose.
    #[must_use]
    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_always.load(Ordering::SeqCst)
            || self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if fail {
            self.injected.fetch_add(1, Ordering::SeqCst);
        }
        fail
    }

    fn failure<T: Send + 'static>(&self) -> StoreFuture<'static, T> {
        let error = self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Box::pin(async move { Err(error) })
    }
}

impl RecordStore for FlakyRecordStore {
    fn insert_ticket(
        &self,
        customer_name: String,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Ticket> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.insert_ticket(customer_name, created_at)
    }

    fn find_ticket(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.find_ticket(ticket_number)
    }

    fn list_tickets(&self) -> StoreFuture<'_, Vec<Ticket>> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.list_tickets()
    }

    fn list_queue_for_agent(&self, agent_name: String) -> StoreFuture<'_, Vec<Ticket>> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.list_queue_for_agent(agent_name)
    }

    fn find_agent(&self, name: String) -> StoreFuture<'_, Option<Agent>> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.find_agent(name)
    }

    fn update_agent_status(
        &self,
        name: String,
        status: AgentStatus,
    ) -> StoreFuture<'_, Option<Agent>> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.update_agent_status(name, status)
    }

    fn claim_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, ClaimOutcome> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.claim_ticket(ticket_number, agent_name)
    }

    fn complete_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, CompleteOutcome> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.complete_ticket(ticket_number, agent_name)
    }

    fn provision_agent(&self, name: String, password: String) -> StoreFuture<'_, Agent> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.provision_agent(name, password)
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        if self.should_fail() {
            return self.failure();
        }
        self.inner.ping()
    }
}
