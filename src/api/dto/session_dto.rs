//! DTOs for session endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{PaginationMeta, SplitResponse};
use crate::domain::{
    Money, OrderItem, Payment, PaymentSession, SessionId, SessionStatus, SessionSummary,
};

/// Request body for `POST /sessions` (get-or-create by order).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenSessionRequest {
    /// Order the bill belongs to.
    pub order_id: String,
    /// Bill total, e.g. `"100.00"` or `100.00`.
    pub total_amount: Money,
    /// Order line items, used by seat splits.
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Full session view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Session identifier.
    pub id: SessionId,
    /// Order reference.
    pub order_id: String,
    /// Bill total.
    pub total_amount: Money,
    /// Sum of confirmed payments.
    pub paid_amount: Money,
    /// `total_amount - paid_amount`.
    pub remaining_amount: Money,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Order line items.
    pub items: Vec<OrderItem>,
    /// Every payment, in recording order.
    pub payments: Vec<Payment>,
    /// Active split, if any.
    pub active_split: Option<SplitResponse>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&PaymentSession> for SessionResponse {
    fn from(session: &PaymentSession) -> Self {
        Self {
            id: session.id,
            order_id: session.order_id.clone(),
            total_amount: session.total_amount,
            paid_amount: session.paid_amount(),
            remaining_amount: session.remaining_amount(),
            status: session.status,
            items: session.items.clone(),
            payments: session.payments.clone(),
            active_split: session.active_split.as_ref().map(SplitResponse::from),
            created_at: session.created_at,
            updated_at: session.updated_at,
            completed_at: session.completed_at,
        }
    }
}

/// Query parameters for `GET /sessions`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SessionListQuery {
    /// Page number (1-indexed).
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Only sessions with this status.
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

/// Paginated session list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionListResponse {
    /// Sessions on this page, oldest first.
    pub data: Vec<SessionSummary>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
