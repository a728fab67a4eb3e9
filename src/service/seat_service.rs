//! Seat service: seat and item-association operations with journaling.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{SeatId, SeatRecord, SeatStore};
use crate::error::GatewayError;
use crate::persistence::SessionJournal;

/// Orchestration layer for seat operations.
///
/// Seat writes are serialized and journaled; when the journal rejects a
/// write the in-memory store is put back to its previous state.
#[derive(Debug, Clone)]
pub struct SeatService {
    store: Arc<SeatStore>,
    journal: Option<Arc<dyn SessionJournal>>,
    writes: Arc<Mutex<()>>,
}

impl SeatService {
    /// Creates a new `SeatService`.
    #[must_use]
    pub fn new(store: Arc<SeatStore>, journal: Option<Arc<dyn SessionJournal>>) -> Self {
        Self {
            store,
            journal,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a seat at a table.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`], [`GatewayError::SeatConflict`]
    /// or [`GatewayError::PersistenceError`].
    pub async fn create_seat(
        &self,
        table_id: &str,
        number: u32,
        name: Option<String>,
    ) -> Result<SeatRecord, GatewayError> {
        let _writes = self.writes.lock().await;
        let record = self.store.create_seat(table_id, number, name).await?;
        if let Err(e) = self.persist(&record).await {
            self.store.remove(record.seat.id).await;
            return Err(e);
        }
        tracing::info!(seat_id = %record.seat.id, table_id = %record.seat.table_id, number, "seat created");
        Ok(record)
    }

    /// Returns a seat with its associations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`] for an unknown id.
    pub async fn get_seat(&self, seat_id: SeatId) -> Result<SeatRecord, GatewayError> {
        self.store.get(seat_id).await
    }

    /// Returns the seats of a table ordered by number.
    pub async fn list_seats(&self, table_id: &str) -> Vec<SeatRecord> {
        self.store.list_for_table(table_id).await
    }

    /// Attributes units of an order item to a seat.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`],
    /// [`GatewayError::InvalidRequest`] or [`GatewayError::PersistenceError`].
    pub async fn associate_item(
        &self,
        seat_id: SeatId,
        order_item_id: &str,
        quantity: u32,
    ) -> Result<SeatRecord, GatewayError> {
        let _writes = self.writes.lock().await;
        let previous = self.store.get(seat_id).await?;
        let record = self.store.associate(seat_id, order_item_id, quantity).await?;
        if let Err(e) = self.persist(&record).await {
            self.store.put(previous).await;
            return Err(e);
        }
        tracing::debug!(%seat_id, order_item_id, quantity, "item associated with seat");
        Ok(record)
    }

    /// Removes an order item from a seat.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`],
    /// [`GatewayError::InvalidRequest`] or [`GatewayError::PersistenceError`].
    pub async fn dissociate_item(
        &self,
        seat_id: SeatId,
        order_item_id: &str,
    ) -> Result<SeatRecord, GatewayError> {
        let _writes = self.writes.lock().await;
        let previous = self.store.get(seat_id).await?;
        let record = self.store.dissociate(seat_id, order_item_id).await?;
        if let Err(e) = self.persist(&record).await {
            self.store.put(previous).await;
            return Err(e);
        }
        tracing::debug!(%seat_id, order_item_id, "item removed from seat");
        Ok(record)
    }

    async fn persist(&self, record: &SeatRecord) -> Result<(), GatewayError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        journal.save_seat(record).await.map_err(|e| {
            tracing::error!(seat_id = %record.seat.id, error = %e, "seat journal write failed");
            match e {
                GatewayError::PersistenceError(_) => e,
                other => GatewayError::PersistenceError(other.to_string()),
            }
        })
    }
}
