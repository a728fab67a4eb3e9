//! PostgreSQL implementation of the session journal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::SessionJournal;
use super::models::{SeatRow, SessionSnapshot, StoredEvent};
use crate::domain::{PaymentSession, SeatRecord, SessionEvent};
use crate::error::GatewayError;

/// PostgreSQL-backed journal using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
    event_log_enabled: bool,
}

/// Removes event rows of sessions completed before `$1`. Snapshot rows are
/// never deleted.
const PURGE_COMPLETED_EVENTS: &str = "DELETE FROM session_events WHERE session_id IN \
     (SELECT session_id FROM session_snapshots WHERE status = 'completed' AND updated_at < $1)";

impl PostgresPersistence {
    /// Creates a new journal with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool, event_log_enabled: bool) -> Self {
        Self {
            pool,
            event_log_enabled,
        }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))
    }
}

#[async_trait]
impl SessionJournal for PostgresPersistence {
    async fn commit_session(
        &self,
        session: &PaymentSession,
        events: &[SessionEvent],
    ) -> Result<(), GatewayError> {
        let snapshot = SessionSnapshot::from_session(session)?;
        let mut tx = self.pool.begin().await?;

        if self.event_log_enabled {
            for event in events {
                let row = StoredEvent::from_event(event)?;
                sqlx::query(
                    "INSERT INTO session_events (session_id, event_type, payload, created_at) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(row.session_id)
                .bind(&row.event_type)
                .bind(&row.payload)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            "INSERT INTO session_snapshots (session_id, order_id, status, state_json, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (session_id) DO UPDATE SET \
             status = EXCLUDED.status, state_json = EXCLUDED.state_json, updated_at = EXCLUDED.updated_at",
        )
        .bind(snapshot.session_id)
        .bind(&snapshot.order_id)
        .bind(&snapshot.status)
        .bind(&snapshot.state_json)
        .bind(snapshot.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_seat(&self, record: &SeatRecord) -> Result<(), GatewayError> {
        let row = SeatRow::from_record(record)?;
        sqlx::query(
            "INSERT INTO seats (seat_id, table_id, state_json) VALUES ($1, $2, $3) \
             ON CONFLICT (seat_id) DO UPDATE SET state_json = EXCLUDED.state_json",
        )
        .bind(row.seat_id)
        .bind(&row.table_id)
        .bind(&row.state_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_sessions(&self) -> Result<Vec<PaymentSession>, GatewayError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, serde_json::Value, DateTime<Utc>)>(
            "SELECT session_id, order_id, status, state_json, updated_at \
             FROM session_snapshots ORDER BY updated_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(session_id, order_id, status, state_json, updated_at)| {
                SessionSnapshot {
                    session_id,
                    order_id,
                    status,
                    state_json,
                    updated_at,
                }
                .into_session()
            })
            .collect()
    }

    async fn load_seats(&self) -> Result<Vec<SeatRecord>, GatewayError> {
        let rows = sqlx::query_as::<_, (Uuid, String, serde_json::Value)>(
            "SELECT seat_id, table_id, state_json FROM seats",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(seat_id, table_id, state_json)| {
                SeatRow {
                    seat_id,
                    table_id,
                    state_json,
                }
                .into_record()
            })
            .collect()
    }

    async fn purge_completed_events_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let result = sqlx::query(PURGE_COMPLETED_EVENTS)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_keeps_snapshots() {
        assert!(PURGE_COMPLETED_EVENTS.starts_with("DELETE FROM session_events "));
        assert!(!PURGE_COMPLETED_EVENTS.contains("DELETE FROM session_snapshots"));
    }
}
