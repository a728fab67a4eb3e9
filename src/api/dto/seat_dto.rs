//! DTOs for seat endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Seat, SeatItemAssociation, SeatRecord};

/// Request body for `POST /tables/{table_id}/seats`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSeatRequest {
    /// Seat number, unique per table.
    pub number: u32,
    /// Display name, defaulting to `Seat N`.
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for `POST /seats/{id}/items`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssociateItemRequest {
    /// Order line item.
    pub order_item_id: String,
    /// Units attributed to the seat.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// A seat with its item associations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeatResponse {
    /// The seat.
    pub seat: Seat,
    /// Items attributed to the seat.
    pub items: Vec<SeatItemAssociation>,
}

impl From<SeatRecord> for SeatResponse {
    fn from(record: SeatRecord) -> Self {
        Self {
            seat: record.seat,
            items: record.items,
        }
    }
}

/// Response for `GET /tables/{table_id}/seats`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeatListResponse {
    /// Seats ordered by number.
    pub data: Vec<SeatResponse>,
}
