//! `PostgreSQL` record store for the service queue.
//!
//! Implements [`RecordStore`] on top of sqlx with:
//!
//! - Race-free ticket numbering (`INSERT … SELECT MAX + 1` under a table lock
//!   that serializes concurrent registrations)
//! - Transactional call/complete that lock the agent row first
//! - A partial unique index that makes two in-service tickets for one agent
//!   impossible at the database level
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use service_queue_postgres::{PostgresRecordStore, PoolSettings};
//!
//! # async fn example() -> Result<(), service_queue_core::StoreError> {
//! let store = PostgresRecordStore::connect("postgres://localhost/queue", &PoolSettings::default()).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;

use rows::{agent_from_row, db_error, ticket_from_row};
use service_queue_core::{
    Agent, AgentStatus, ClaimOutcome, CompleteOutcome, DateTime, RecordStore, StoreError,
    StoreFuture, Ticket, TicketNumber, TicketStatus, Utc,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::{Duration, Instant};

const TICKET_COLUMNS: &str = "ticket_number, customer_name, status, assigned_agent, created_at";

/// Connection pool sizing.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Record store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if no connection can be established.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.connect_timeout)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if a migration fails to apply.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }


    async fn fetch_tickets(&self, sql: &str, agent: Option<&str>) -> Result<Vec<Ticket>, StoreError> {
        let mut query = sqlx::query(sql);
        if let Some(agent) = agent {
            query = query.bind(agent);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(ticket_from_row).collect()
    }
}

impl RecordStore for PostgresRecordStore {
    fn insert_ticket(
        &self,
        customer_name: String,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            // SHARE ROW EXCLUSIVE conflicts with itself: registrations queue
            // here, and each one's MAX sees every earlier commit.
            let waited = Instant::now();
            sqlx::query("LOCK TABLE tickets IN SHARE ROW EXCLUSIVE MODE")
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            metrics::histogram!("queue_store_numbering_lock_seconds")
                .record(waited.elapsed().as_secs_f64());

            let row = sqlx::query(&format!(
                r"
                INSERT INTO tickets (ticket_number, customer_name, status, created_at)
                SELECT COALESCE(MAX(ticket_number), 0) + 1, $1, 'waiting', $2 FROM tickets
                RETURNING {TICKET_COLUMNS}
                "
            ))
            .bind(&customer_name)
            .bind(created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            let ticket = ticket_from_row(&row)?;

            tx.commit().await.map_err(db_error)?;
            tracing::debug!(ticket_number = %ticket.ticket_number, "Ticket numbered");
            Ok(ticket)
        })
    }

    fn find_ticket(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_number = $1"
            ))
            .bind(ticket_number.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
            row.as_ref().map(ticket_from_row).transpose()
        })
    }

    fn list_tickets(&self) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            self.fetch_tickets(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at, ticket_number"),
                None,
            )
            .await
        })
    }

    fn list_queue_for_agent(&self, agent_name: String) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            self.fetch_tickets(
                &format!(
                    r"
                    SELECT {TICKET_COLUMNS} FROM tickets
                    WHERE status = 'waiting'
                       OR (status = 'in_service' AND assigned_agent = $1)
                    ORDER BY created_at, ticket_number
                    "
                ),
                Some(&agent_name),
            )
            .await
        })
    }

    fn find_agent(&self, name: String) -> StoreFuture<'_, Option<Agent>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT name, password, status FROM agents WHERE name = $1")
                .bind(&name)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
            row.as_ref().map(agent_from_row).transpose()
        })
    }

    fn update_agent_status(
        &self,
        name: String,
        status: AgentStatus,
    ) -> StoreFuture<'_, Option<Agent>> {
        Box::pin(async move {
            let row = sqlx::query(
                "UPDATE agents SET status = $2 WHERE name = $1 RETURNING name, password, status",
            )
            .bind(&name)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
            row.as_ref().map(agent_from_row).transpose()
        })
    }

    fn claim_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, ClaimOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            // Lock the agent first: serializes every call/complete by this agent.
            let agent_status: Option<(String,)> =
                sqlx::query_as("SELECT status FROM agents WHERE name = $1 FOR UPDATE")
                    .bind(&agent_name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
            let accepts_calls = match agent_status {
                Some((status,)) => status
                    .parse::<AgentStatus>()
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?
                    .accepts_calls(),
                None => false,
            };
            if !accepts_calls {
                return Ok(ClaimOutcome::AgentUnavailable);
            }

            let active: Option<(i64,)> = sqlx::query_as(
                "SELECT ticket_number FROM tickets WHERE assigned_agent = $1 AND status = 'in_service' LIMIT 1",
            )
            .bind(&agent_name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
            if let Some((active,)) = active {
                let active =
                    TicketNumber::new(active).map_err(|e| StoreError::Corrupt(e.to_string()))?;
                return Ok(ClaimOutcome::AgentBusy(active));
            }

            let row = sqlx::query(&format!(
                r"
                UPDATE tickets SET status = 'in_service', assigned_agent = $2
                WHERE ticket_number = $1 AND status = 'waiting'
                RETURNING {TICKET_COLUMNS}
                "
            ))
            .bind(ticket_number.get())
            .bind(&agent_name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
            let Some(row) = row else {
                return Ok(ClaimOutcome::NotClaimable);
            };
            let ticket = ticket_from_row(&row)?;

            sqlx::query("UPDATE agents SET status = 'busy' WHERE name = $1")
                .bind(&agent_name)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;

            tx.commit().await.map_err(db_error)?;
            Ok(ClaimOutcome::Claimed(ticket))
        })
    }

    fn complete_ticket(
        &self,
        ticket_number: TicketNumber,
        agent_name: String,
    ) -> StoreFuture<'_, CompleteOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            sqlx::query("SELECT 1 FROM agents WHERE name = $1 FOR UPDATE")
                .bind(&agent_name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

            let current: Option<(String, Option<String>)> = sqlx::query_as(
                "SELECT status, assigned_agent FROM tickets WHERE ticket_number = $1 FOR UPDATE",
            )
            .bind(ticket_number.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
            let Some((status, assigned)) = current else {
                return Ok(CompleteOutcome::NotFound);
            };
            if assigned.as_deref() != Some(agent_name.as_str()) {
                return Ok(CompleteOutcome::NotAssigned);
            }
            let status = status
                .parse::<TicketStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            if status.is_terminal() {
                return Ok(CompleteOutcome::AlreadyCompleted);
            }
            if !status.can_transition_to(TicketStatus::Done) {
                return Ok(CompleteOutcome::NotAssigned);
            }

            let row = sqlx::query(&format!(
                r"
                UPDATE tickets SET status = 'done'
                WHERE ticket_number = $1 AND status = 'in_service' AND assigned_agent = $2
                RETURNING {TICKET_COLUMNS}
                "
            ))
            .bind(ticket_number.get())
            .bind(&agent_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            let ticket = ticket_from_row(&row)?;

            sqlx::query("UPDATE agents SET status = 'available' WHERE name = $1")
                .bind(&agent_name)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;

            tx.commit().await.map_err(db_error)?;
            Ok(CompleteOutcome::Completed(ticket))
        })
    }

    fn provision_agent(&self, name: String, password: String) -> StoreFuture<'_, Agent> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                INSERT INTO agents (name, password, status) VALUES ($1, $2, 'unavailable')
                ON CONFLICT (name) DO UPDATE SET password = EXCLUDED.password
                RETURNING name, password, status
                ",
            )
            .bind(&name)
            .bind(&password)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
            agent_from_row(&row)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
            Ok(())
        })
    }
}
