//! Payments recorded against a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Money, PartId, PaymentId, SessionId};

/// Settlement state of a payment.
///
/// The only permitted transitions are `pending → confirmed` and
/// `pending → failed`, each taken at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Waiting for external confirmation; reserves balance but is not paid.
    Pending,
    /// Counts toward the session's paid amount.
    Confirmed,
    /// Rejected or expired; never counts.
    Failed,
}

impl PaymentStatus {
    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// A single payment against a session.
///
/// Created either ad hoc or by paying a split part (`part_id` is set in
/// that case). Immutable after creation apart from the one-time status
/// transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Owning session.
    pub session_id: SessionId,
    /// Opaque payment method tag (`cash`, `card`, `pix`, ...).
    pub method: String,
    /// Amount paid.
    pub amount: Money,
    /// Optional name of the payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
    /// Settlement state.
    pub status: PaymentStatus,
    /// Split part settled by this payment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<PartId>,
    /// Client idempotency key the payment was recorded under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Why the payment failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the payment left `pending`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Returns `true` if this payment counts toward the paid amount.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }

    /// Returns `true` if this payment still awaits confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}
