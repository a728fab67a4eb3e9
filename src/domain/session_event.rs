//! Domain events reflecting session state changes.
//!
//! Every committed mutation emits one or more [`SessionEvent`]s through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers and,
//! when persistence is enabled, appended to the event log in the same
//! transaction as the session snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    Money, PartId, Payment, PaymentId, SessionId, SplitAdjustment, SplitId, SplitPart,
    SplitStrategy,
};

/// Domain event emitted after every committed session mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session was opened for an order.
    SessionOpened {
        /// Session identifier.
        session_id: SessionId,
        /// Order reference.
        order_id: String,
        /// Bill total.
        total_amount: Money,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A payment entered the ledger, pending or confirmed.
    PaymentRecorded {
        /// Session identifier.
        session_id: SessionId,
        /// The payment as recorded.
        payment: Payment,
        /// Confirmed total after the payment.
        paid_amount: Money,
        /// Outstanding balance after the payment.
        remaining_amount: Money,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A pending payment was confirmed.
    PaymentConfirmed {
        /// Session identifier.
        session_id: SessionId,
        /// Confirmed payment.
        payment_id: PaymentId,
        /// Amount that became paid.
        amount: Money,
        /// Outstanding balance after confirmation.
        remaining_amount: Money,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A pending payment failed or expired and released its reservation.
    PaymentFailed {
        /// Session identifier.
        session_id: SessionId,
        /// Failed payment.
        payment_id: PaymentId,
        /// Amount released.
        amount: Money,
        /// Failure reason (`"expired"` for sweeper expiry).
        reason: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A split became the session's active split.
    SplitCreated {
        /// Session identifier.
        session_id: SessionId,
        /// Split identifier.
        split_id: SplitId,
        /// Strategy used.
        strategy: SplitStrategy,
        /// Balance divided by the split.
        amount: Money,
        /// Parts as created.
        parts: Vec<SplitPart>,
        /// Corrective adjustment applied by the seat calculator.
        #[serde(skip_serializing_if = "Option::is_none")]
        adjustment: Option<SplitAdjustment>,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An unpaid split was replaced or discarded.
    SplitDiscarded {
        /// Session identifier.
        session_id: SessionId,
        /// Split identifier.
        split_id: SplitId,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A split part was paid.
    PartPaid {
        /// Session identifier.
        session_id: SessionId,
        /// Split identifier.
        split_id: SplitId,
        /// Part identifier.
        part_id: PartId,
        /// Payment that settled the part.
        payment_id: PaymentId,
        /// Part amount.
        amount: Money,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The session reached `completed`. Emitted exactly once per session.
    SessionCompleted {
        /// Session identifier.
        session_id: SessionId,
        /// Bill total.
        total_amount: Money,
        /// Confirmed total, equal to `total_amount`.
        paid_amount: Money,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Every value [`SessionEvent::event_type_str`] can return.
    pub const EVENT_TYPES: [&'static str; 8] = [
        "session_opened",
        "payment_recorded",
        "payment_confirmed",
        "payment_failed",
        "split_created",
        "split_discarded",
        "part_paid",
        "session_completed",
    ];

    /// Returns the session ID associated with this event.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SessionOpened { session_id, .. }
            | Self::PaymentRecorded { session_id, .. }
            | Self::PaymentConfirmed { session_id, .. }
            | Self::PaymentFailed { session_id, .. }
            | Self::SplitCreated { session_id, .. }
            | Self::SplitDiscarded { session_id, .. }
            | Self::PartPaid { session_id, .. }
            | Self::SessionCompleted { session_id, .. } => *session_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SessionOpened { .. } => "session_opened",
            Self::PaymentRecorded { .. } => "payment_recorded",
            Self::PaymentConfirmed { .. } => "payment_confirmed",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::SplitCreated { .. } => "split_created",
            Self::SplitDiscarded { .. } => "split_discarded",
            Self::PartPaid { .. } => "part_paid",
            Self::SessionCompleted { .. } => "session_completed",
        }
    }

    /// Returns the event timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionOpened { timestamp, .. }
            | Self::PaymentRecorded { timestamp, .. }
            | Self::PaymentConfirmed { timestamp, .. }
            | Self::PaymentFailed { timestamp, .. }
            | Self::SplitCreated { timestamp, .. }
            | Self::SplitDiscarded { timestamp, .. }
            | Self::PartPaid { timestamp, .. }
            | Self::SessionCompleted { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn completed_event_type() {
        let event = SessionEvent::SessionCompleted {
            session_id: SessionId::new(),
            total_amount: Money::from_minor(5_000),
            paid_amount: Money::from_minor(5_000),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "session_completed");
    }

    #[test]
    fn part_paid_serializes_with_tag_and_string_amounts() {
        let event = SessionEvent::PartPaid {
            session_id: SessionId::new(),
            split_id: SplitId::new(),
            part_id: PartId::new(),
            payment_id: PaymentId::new(),
            amount: Money::from_minor(3_334),
            timestamp: Utc::now(),
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["event_type"], "part_paid");
        assert_eq!(json["amount"], "33.34");
    }

    #[test]
    fn event_types_lists_every_tag() {
        let event = SessionEvent::SplitDiscarded {
            session_id: SessionId::new(),
            split_id: SplitId::new(),
            timestamp: Utc::now(),
        };
        assert!(SessionEvent::EVENT_TYPES.contains(&event.event_type_str()));
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["event_type"], event.event_type_str());
    }

    #[test]
    fn session_id_accessor() {
        let id = SessionId::new();
        let event = SessionEvent::SplitDiscarded {
            session_id: id,
            split_id: SplitId::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.session_id(), id);
    }
}
