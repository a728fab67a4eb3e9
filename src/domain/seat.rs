//! Seats and their item associations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::SeatId;

/// Occupancy state of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// No items attributed.
    Free,
    /// At least one item attributed.
    Occupied,
}

/// A per-diner slot at a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Seat {
    /// Seat identifier.
    pub id: SeatId,
    /// Table the seat belongs to (opaque reference).
    pub table_id: String,
    /// Seat number, unique per table; orders seat splits.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Occupancy.
    pub status: SeatStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Attribution of `quantity` units of an order item to a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeatItemAssociation {
    /// Seat receiving the units.
    pub seat_id: SeatId,
    /// Order line item (opaque reference).
    pub order_item_id: String,
    /// Units attributed, at least 1.
    pub quantity: u32,
}
