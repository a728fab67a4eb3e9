//! Persistence layer: session journal with event log and snapshots.
//!
//! [`SessionJournal`] is the durability seam the service commits through.
//! Every accepted mutation hands the journal the new session snapshot and
//! the events that produced it; the in-memory state only changes after
//! the journal accepts both. The concrete implementation in [`postgres`]
//! uses `sqlx::PgPool` and one transaction per commit.

pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PaymentSession, SeatRecord, SessionEvent};
use crate::error::GatewayError;

pub use postgres::PostgresPersistence;

/// Durable store for sessions, their events, and seats.
#[async_trait]
pub trait SessionJournal: Send + Sync + std::fmt::Debug {
    /// Atomically appends `events` and stores `session` as the latest
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if nothing was stored.
    async fn commit_session(
        &self,
        session: &PaymentSession,
        events: &[SessionEvent],
    ) -> Result<(), GatewayError>;

    /// Stores a seat with its associations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn save_seat(&self, record: &SeatRecord) -> Result<(), GatewayError>;

    /// Loads the latest snapshot of every session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn load_sessions(&self) -> Result<Vec<PaymentSession>, GatewayError>;

    /// Loads every seat with its associations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn load_seats(&self) -> Result<Vec<SeatRecord>, GatewayError>;

    /// Deletes the event log of sessions completed before `cutoff`.
    /// Snapshots are kept, so a settled order is still known after a
    /// restart. Returns the number of events removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn purge_completed_events_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GatewayError>;
}
