//! Payment session aggregate: one bill's lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ledger;
use super::{Money, Payment, PaymentId, SessionId, Split};

/// Lifecycle state of a session. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting payments and splits.
    Open,
    /// Fully paid; read-only.
    Completed,
}

impl SessionStatus {
    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
        }
    }
}

/// An order line item as supplied by the order system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    /// Line item identifier (opaque reference).
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Units ordered.
    pub quantity: u32,
}

impl OrderItem {
    /// Most units a single line item may carry.
    pub const MAX_QUANTITY: u32 = 9_999;
}

/// The bill-level record for one order.
///
/// `paid_amount` and `remaining_amount` are never stored; they are
/// recomputed from `payments` by the [`ledger`] on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Session identifier.
    pub id: SessionId,
    /// Order this bill belongs to (opaque reference).
    pub order_id: String,
    /// Amount owed for the whole bill.
    pub total_amount: Money,
    /// Line items, consumed by seat splits.
    pub items: Vec<OrderItem>,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Every payment ever recorded, in order.
    pub payments: Vec<Payment>,
    /// The single active split, if any.
    pub active_split: Option<Split>,
    /// Client idempotency keys already applied, mapped to their payment.
    #[serde(default)]
    pub processed_requests: HashMap<String, PaymentId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last state change.
    pub updated_at: DateTime<Utc>,
    /// When the session reached `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentSession {
    /// Creates an open session with no payments.
    #[must_use]
    pub fn new(order_id: String, total_amount: Money, items: Vec<OrderItem>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            order_id,
            total_amount,
            items,
            status: SessionStatus::Open,
            payments: Vec::new(),
            active_split: None,
            processed_requests: HashMap::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Returns `true` once the session is completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Sum of confirmed payments.
    #[must_use]
    pub fn paid_amount(&self) -> Money {
        ledger::paid_amount(self)
    }

    /// `total_amount - paid_amount`.
    #[must_use]
    pub fn remaining_amount(&self) -> Money {
        ledger::remaining_amount(self)
    }

    /// Looks up a payment by id.
    #[must_use]
    pub fn payment(&self, payment_id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }

    /// Returns the payment previously recorded under `request_id`.
    #[must_use]
    pub fn replayed(&self, request_id: Option<&str>) -> Option<&Payment> {
        let id = self.processed_requests.get(request_id?)?;
        self.payment(*id)
    }
}

/// Lightweight view of a session for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Order reference.
    pub order_id: String,
    /// Bill total.
    pub total_amount: Money,
    /// Confirmed amount.
    pub paid_amount: Money,
    /// Outstanding amount.
    pub remaining_amount: Money,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentSession> for SessionSummary {
    fn from(session: &PaymentSession) -> Self {
        Self {
            id: session.id,
            order_id: session.order_id.clone(),
            total_amount: session.total_amount,
            paid_amount: session.paid_amount(),
            remaining_amount: session.remaining_amount(),
            status: session.status,
            created_at: session.created_at,
        }
    }
}
