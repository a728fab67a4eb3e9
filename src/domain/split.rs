//! Splits of a session's balance into independently payable parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Money, PartId, PaymentId, SeatId, SessionId, SplitId};

/// Strategy used to compute a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// `n` parts differing by at most one minor unit.
    Equal,
    /// Caller-supplied named amounts.
    Custom,
    /// One part per seat, derived from seat/item associations.
    Seat,
}

impl SplitStrategy {
    /// Returns the strategy as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
            Self::Seat => "seat",
        }
    }
}

/// A named amount supplied for a custom split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NamedAmount {
    /// Part label.
    pub name: String,
    /// Part amount.
    pub amount: Money,
}

/// Strategy-specific parameters of a split request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitParams {
    /// Divide evenly into `number_of_parts`.
    Equal {
        /// Number of parts, at least 2.
        number_of_parts: usize,
        /// Optional labels; missing ones default to `Pessoa N`.
        names: Vec<String>,
    },
    /// Use the given amounts, which must reconcile exactly.
    Custom {
        /// Named amounts.
        parts: Vec<NamedAmount>,
    },
    /// One part per seat.
    Seat {
        /// Seats included in the split.
        seat_ids: Vec<SeatId>,
        /// Spread unassigned items over the seats instead of a separate part.
        include_shared_items: bool,
    },
}

impl SplitParams {
    /// Returns the strategy these parameters select.
    #[must_use]
    pub const fn strategy(&self) -> SplitStrategy {
        match self {
            Self::Equal { .. } => SplitStrategy::Equal,
            Self::Custom { .. } => SplitStrategy::Custom,
            Self::Seat { .. } => SplitStrategy::Seat,
        }
    }
}

/// Corrective adjustment applied by the seat calculator so that parts
/// reconcile to the split amount. Kept on the split for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SplitAdjustment {
    /// Seat whose part absorbed the difference.
    pub seat_id: SeatId,
    /// Signed amount added to that part.
    pub delta: Money,
}

/// One payable slice of a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SplitPart {
    /// Part identifier.
    pub id: PartId,
    /// Owning split.
    pub split_id: SplitId,
    /// Label such as `"Pessoa 2"` or a seat name.
    pub name: String,
    /// Amount due for this part.
    pub amount: Money,
    /// Seat the part belongs to (seat splits only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_id: Option<SeatId>,
    /// Monotonic flag, false until the part is paid. A zero-amount part
    /// owes nothing and starts paid.
    pub is_paid: bool,
    /// Payment that settled this part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by_payment_id: Option<PaymentId>,
}

/// A split of a session's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Split identifier.
    pub id: SplitId,
    /// Owning session.
    pub session_id: SessionId,
    /// Strategy used.
    pub strategy: SplitStrategy,
    /// Balance divided by this split; equals the sum of the parts.
    pub amount: Money,
    /// Parts in display order.
    pub parts: Vec<SplitPart>,
    /// Corrective adjustment, if the calculator had to apply one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<SplitAdjustment>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Split {
    /// Returns `true` if any part has been settled by a payment.
    #[must_use]
    pub fn has_paid_parts(&self) -> bool {
        self.parts.iter().any(|p| p.paid_by_payment_id.is_some())
    }

    /// Returns `true` once every part is paid.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.parts.iter().all(|p| p.is_paid)
    }

    /// Looks up a part by id.
    #[must_use]
    pub fn part(&self, part_id: PartId) -> Option<&SplitPart> {
        self.parts.iter().find(|p| p.id == part_id)
    }

    /// Looks up a part by id for mutation.
    pub fn part_mut(&mut self, part_id: PartId) -> Option<&mut SplitPart> {
        self.parts.iter_mut().find(|p| p.id == part_id)
    }

    /// Returns the ids of all parts.
    #[must_use]
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts.iter().map(|p| p.id).collect()
    }
}
