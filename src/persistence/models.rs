//! Database models for events and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PaymentSession, SeatRecord, SessionEvent};
use crate::error::GatewayError;

/// A stored event row from the `session_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Session that generated the event.
    pub session_id: Uuid,
    /// Event type discriminator (e.g. `"part_paid"`).
    pub event_type: String,
    /// JSONB payload with the full event.
    pub payload: serde_json::Value,
    /// Event timestamp.
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Builds the row for a domain event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the event cannot be encoded.
    pub fn from_event(event: &SessionEvent) -> Result<Self, GatewayError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| GatewayError::Internal(format!("event encoding failed: {e}")))?;
        Ok(Self {
            session_id: *event.session_id().as_uuid(),
            event_type: event.event_type_str().to_string(),
            payload,
            created_at: event.timestamp(),
        })
    }
}

/// A row from the `session_snapshots` table: the latest state of one
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: Uuid,
    /// Order reference, unique.
    pub order_id: String,
    /// `open` or `completed`.
    pub status: String,
    /// Full session state as JSONB.
    pub state_json: serde_json::Value,
    /// When the snapshot was written.
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Builds the row for a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the session cannot be encoded.
    pub fn from_session(session: &PaymentSession) -> Result<Self, GatewayError> {
        let state_json = serde_json::to_value(session)
            .map_err(|e| GatewayError::Internal(format!("session encoding failed: {e}")))?;
        Ok(Self {
            session_id: *session.id.as_uuid(),
            order_id: session.order_id.clone(),
            status: session.status.as_str().to_string(),
            state_json,
            updated_at: session.updated_at,
        })
    }

    /// Decodes the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the JSON no longer
    /// matches the session shape.
    pub fn into_session(self) -> Result<PaymentSession, GatewayError> {
        serde_json::from_value(self.state_json).map_err(|e| {
            GatewayError::PersistenceError(format!(
                "snapshot of session {} is unreadable: {e}",
                self.session_id
            ))
        })
    }
}

/// A row from the `seats` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRow {
    /// Seat identifier.
    pub seat_id: Uuid,
    /// Table reference.
    pub table_id: String,
    /// Seat with its associations as JSONB.
    pub state_json: serde_json::Value,
}

/// JSON shape of [`SeatRow::state_json`].
#[derive(Debug, Serialize, Deserialize)]
struct SeatState {
    seat: crate::domain::Seat,
    items: Vec<crate::domain::SeatItemAssociation>,
}

impl SeatRow {
    /// Builds the row for a seat.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the seat cannot be encoded.
    pub fn from_record(record: &SeatRecord) -> Result<Self, GatewayError> {
        let state = SeatState {
            seat: record.seat.clone(),
            items: record.items.clone(),
        };
        let state_json = serde_json::to_value(&state)
            .map_err(|e| GatewayError::Internal(format!("seat encoding failed: {e}")))?;
        Ok(Self {
            seat_id: *record.seat.id.as_uuid(),
            table_id: record.seat.table_id.clone(),
            state_json,
        })
    }

    /// Decodes the stored seat.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the JSON no longer
    /// matches the seat shape.
    pub fn into_record(self) -> Result<SeatRecord, GatewayError> {
        let state: SeatState = serde_json::from_value(self.state_json).map_err(|e| {
            GatewayError::PersistenceError(format!("seat {} is unreadable: {e}", self.seat_id))
        })?;
        Ok(SeatRecord {
            seat: state.seat,
            items: state.items,
        })
    }
}
