//! Seat assignment store.
//!
//! Holds every seat with its item associations. Associations are keyed by
//! `(seat, order_item)`: associating the same item again replaces the
//! quantity rather than adding a second row. A seat is `occupied` while it
//! has at least one association.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::{Seat, SeatId, SeatItemAssociation, SeatStatus};
use crate::error::GatewayError;

/// A seat together with its associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRecord {
    /// The seat.
    pub seat: Seat,
    /// Items attributed to it.
    pub items: Vec<SeatItemAssociation>,
}

/// Concurrent store of seats and their item associations.
#[derive(Debug, Default)]
pub struct SeatStore {
    seats: RwLock<HashMap<SeatId, SeatRecord>>,
}

impl SeatStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a free seat at a table.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank table id or a
    /// zero seat number, and [`GatewayError::SeatConflict`] if the table
    /// already has a seat with this number.
    pub async fn create_seat(
        &self,
        table_id: &str,
        number: u32,
        name: Option<String>,
    ) -> Result<SeatRecord, GatewayError> {
        let table_id = table_id.trim();
        if table_id.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "table_id must not be empty".to_string(),
            ));
        }
        if number == 0 {
            return Err(GatewayError::InvalidRequest(
                "seat number must be at least 1".to_string(),
            ));
        }

        let mut seats = self.seats.write().await;
        if seats
            .values()
            .any(|r| r.seat.table_id == table_id && r.seat.number == number)
        {
            return Err(GatewayError::SeatConflict {
                table_id: table_id.to_string(),
                number,
            });
        }

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Seat {number}"));
        let record = SeatRecord {
            seat: Seat {
                id: SeatId::new(),
                table_id: table_id.to_string(),
                number,
                name,
                status: SeatStatus::Free,
                created_at: Utc::now(),
            },
            items: Vec::new(),
        };
        seats.insert(record.seat.id, record.clone());
        Ok(record)
    }

    /// Returns a seat with its associations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`] if no seat has this id.
    pub async fn get(&self, seat_id: SeatId) -> Result<SeatRecord, GatewayError> {
        self.seats
            .read()
            .await
            .get(&seat_id)
            .cloned()
            .ok_or(GatewayError::SeatNotFound(*seat_id.as_uuid()))
    }

    /// Returns the seats of a table ordered by number.
    pub async fn list_for_table(&self, table_id: &str) -> Vec<SeatRecord> {
        let seats = self.seats.read().await;
        let mut records: Vec<SeatRecord> = seats
            .values()
            .filter(|r| r.seat.table_id == table_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.seat.number, r.seat.id));
        records
    }

    /// Attributes `quantity` units of an item to a seat, replacing any
    /// previous quantity for the same item.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank item id or a
    /// zero quantity and [`GatewayError::SeatNotFound`] for an unknown seat.
    pub async fn associate(
        &self,
        seat_id: SeatId,
        order_item_id: &str,
        quantity: u32,
    ) -> Result<SeatRecord, GatewayError> {
        let order_item_id = order_item_id.trim();
        if order_item_id.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "order_item_id must not be empty".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(GatewayError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }

        let mut seats = self.seats.write().await;
        let record = seats
            .get_mut(&seat_id)
            .ok_or(GatewayError::SeatNotFound(*seat_id.as_uuid()))?;
        match record
            .items
            .iter_mut()
            .find(|a| a.order_item_id == order_item_id)
        {
            Some(existing) => existing.quantity = quantity,
            None => record.items.push(SeatItemAssociation {
                seat_id,
                order_item_id: order_item_id.to_string(),
                quantity,
            }),
        }
        record.seat.status = SeatStatus::Occupied;
        Ok(record.clone())
    }

    /// Removes an item from a seat. The seat becomes free when its last
    /// association goes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`] for an unknown seat and
    /// [`GatewayError::InvalidRequest`] if the item is not on the seat.
    pub async fn dissociate(
        &self,
        seat_id: SeatId,
        order_item_id: &str,
    ) -> Result<SeatRecord, GatewayError> {
        let mut seats = self.seats.write().await;
        let record = seats
            .get_mut(&seat_id)
            .ok_or(GatewayError::SeatNotFound(*seat_id.as_uuid()))?;
        let before = record.items.len();
        record.items.retain(|a| a.order_item_id != order_item_id);
        if record.items.len() == before {
            return Err(GatewayError::InvalidRequest(format!(
                "item {order_item_id:?} is not associated with seat {seat_id}"
            )));
        }
        if record.items.is_empty() {
            record.seat.status = SeatStatus::Free;
        }
        Ok(record.clone())
    }

    /// Resolves a set of seats, preserving the requested order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SeatNotFound`] for the first unknown id.
    pub async fn seats_by_ids(&self, seat_ids: &[SeatId]) -> Result<Vec<Seat>, GatewayError> {
        let seats = self.seats.read().await;
        seat_ids
            .iter()
            .map(|id| {
                seats
                    .get(id)
                    .map(|r| r.seat.clone())
                    .ok_or(GatewayError::SeatNotFound(*id.as_uuid()))
            })
            .collect()
    }

    /// Returns every association of every seat at a table.
    pub async fn associations_for_table(&self, table_id: &str) -> Vec<SeatItemAssociation> {
        self.seats
            .read()
            .await
            .values()
            .filter(|r| r.seat.table_id == table_id)
            .flat_map(|r| r.items.iter().cloned())
            .collect()
    }

    /// Puts a record back as it was, e.g. after a failed journal write.
    pub async fn put(&self, record: SeatRecord) {
        self.seats.write().await.insert(record.seat.id, record);
    }

    /// Drops a seat entirely.
    pub async fn remove(&self, seat_id: SeatId) -> Option<SeatRecord> {
        self.seats.write().await.remove(&seat_id)
    }

    /// Loads previously persisted seats, replacing entries with the same id.
    pub async fn restore(&self, records: Vec<SeatRecord>) -> usize {
        let mut seats = self.seats.write().await;
        let count = records.len();
        for record in records {
            seats.insert(record.seat.id, record);
        }
        count
    }

    /// Returns the number of seats.
    pub async fn len(&self) -> usize {
        self.seats.read().await.len()
    }

    /// Returns `true` if the store holds no seats.
    pub async fn is_empty(&self) -> bool {
        self.seats.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_list_in_number_order() {
        let store = SeatStore::new();
        assert!(store.create_seat("t1", 2, None).await.is_ok());
        assert!(store.create_seat("t1", 1, Some("Ana".to_string())).await.is_ok());
        assert!(store.create_seat("t2", 1, None).await.is_ok());

        let seats = store.list_for_table("t1").await;
        let numbers: Vec<u32> = seats.iter().map(|r| r.seat.number).collect();
        assert_eq!(numbers, [1, 2]);
        assert_eq!(seats.first().map(|r| r.seat.name.as_str()), Some("Ana"));
        assert_eq!(seats.last().map(|r| r.seat.name.as_str()), Some("Seat 2"));
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let store = SeatStore::new();
        assert!(store.create_seat("t1", 1, None).await.is_ok());
        assert!(matches!(
            store.create_seat("t1", 1, None).await,
            Err(GatewayError::SeatConflict { .. })
        ));
    }

    #[tokio::test]
    async fn association_occupies_and_replaces() {
        let store = SeatStore::new();
        let Ok(created) = store.create_seat("t1", 1, None).await else {
            panic!("seat not created");
        };
        let id = created.seat.id;
        assert_eq!(created.seat.status, SeatStatus::Free);

        assert!(store.associate(id, "burger", 1).await.is_ok());
        let Ok(record) = store.associate(id, "burger", 3).await else {
            panic!("associate failed");
        };
        assert_eq!(record.seat.status, SeatStatus::Occupied);
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items.first().map(|a| a.quantity), Some(3));
    }

    #[tokio::test]
    async fn dissociating_last_item_frees_seat() {
        let store = SeatStore::new();
        let Ok(created) = store.create_seat("t1", 1, None).await else {
            panic!("seat not created");
        };
        let id = created.seat.id;
        assert!(store.associate(id, "burger", 1).await.is_ok());

        let Ok(record) = store.dissociate(id, "burger").await else {
            panic!("dissociate failed");
        };
        assert_eq!(record.seat.status, SeatStatus::Free);
        assert!(store.dissociate(id, "burger").await.is_err());
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let store = SeatStore::new();
        let Ok(created) = store.create_seat("t1", 1, None).await else {
            panic!("seat not created");
        };
        assert!(matches!(
            store.associate(created.seat.id, "burger", 0).await,
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn seats_by_ids_reports_unknown() {
        let store = SeatStore::new();
        let Ok(created) = store.create_seat("t1", 1, None).await else {
            panic!("seat not created");
        };
        assert!(store.seats_by_ids(&[created.seat.id]).await.is_ok());
        assert!(matches!(
            store.seats_by_ids(&[created.seat.id, SeatId::new()]).await,
            Err(GatewayError::SeatNotFound(_))
        ));
    }

    #[tokio::test]
    async fn associations_are_scoped_to_table() {
        let store = SeatStore::new();
        let (Ok(a), Ok(b)) = (
            store.create_seat("t1", 1, None).await,
            store.create_seat("t2", 1, None).await,
        ) else {
            panic!("seats not created");
        };
        assert!(store.associate(a.seat.id, "x", 1).await.is_ok());
        assert!(store.associate(b.seat.id, "y", 1).await.is_ok());

        let assocs = store.associations_for_table("t1").await;
        assert_eq!(assocs.len(), 1);
        assert_eq!(assocs.first().map(|a| a.order_item_id.as_str()), Some("x"));
    }
}
