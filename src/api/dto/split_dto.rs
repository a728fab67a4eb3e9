//! DTOs for split endpoints.
//!
//! The split request is a closed, tagged union: the `strategy` field
//! selects the variant and its payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Money, NamedAmount, SeatId, SessionId, Split, SplitAdjustment, SplitId, SplitParams,
    SplitPart, SplitStrategy,
};

/// Request body for `POST /sessions/{id}/splits`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CreateSplitRequest {
    /// Divide the balance into equal parts.
    Equal {
        /// Number of parts, at least 2.
        number_of_parts: usize,
        /// Optional labels, defaulting to `Pessoa N`.
        #[serde(default)]
        names: Vec<String>,
    },
    /// Caller-chosen amounts that must sum to the balance.
    Custom {
        /// Named amounts.
        parts: Vec<NamedAmount>,
    },
    /// One part per seat from item associations.
    Seat {
        /// Seats to include.
        seat_ids: Vec<SeatId>,
        /// Spread unassigned items over the seats (default) instead of a
        /// separate part.
        #[serde(default = "default_include_shared")]
        include_shared_items: bool,
    },
}

fn default_include_shared() -> bool {
    true
}

impl From<CreateSplitRequest> for SplitParams {
    fn from(req: CreateSplitRequest) -> Self {
        match req {
            CreateSplitRequest::Equal {
                number_of_parts,
                names,
            } => Self::Equal {
                number_of_parts,
                names,
            },
            CreateSplitRequest::Custom { parts } => Self::Custom { parts },
            CreateSplitRequest::Seat {
                seat_ids,
                include_shared_items,
            } => Self::Seat {
                seat_ids,
                include_shared_items,
            },
        }
    }
}

/// A split with its parts.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SplitResponse {
    /// Split identifier.
    pub id: SplitId,
    /// Owning session.
    pub session_id: SessionId,
    /// Strategy used.
    pub strategy: SplitStrategy,
    /// Balance divided; equals the sum of the parts.
    pub amount: Money,
    /// Parts in display order.
    pub parts: Vec<SplitPart>,
    /// Corrective adjustment applied by the seat calculator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<SplitAdjustment>,
    /// `true` once every part is paid.
    pub is_settled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Split> for SplitResponse {
    fn from(split: &Split) -> Self {
        Self {
            id: split.id,
            session_id: split.session_id,
            strategy: split.strategy,
            amount: split.amount,
            parts: split.parts.clone(),
            adjustment: split.adjustment.clone(),
            is_settled: split.is_settled(),
            created_at: split.created_at,
        }
    }
}
