//! DTOs for payment endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Money, Payment, SessionSummary, SplitPart};
use crate::service::{NewPayment, PartPayment, PaymentReceipt};

/// Request body for `POST /sessions/{id}/payments`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Payment method tag, e.g. `"cash"` or `"card"`.
    pub method: String,
    /// Amount, at most 2 fraction digits.
    pub amount: Money,
    /// Optional payer name.
    #[serde(default)]
    pub payer_name: Option<String>,
    /// Client idempotency key.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Record as pending until confirmed.
    #[serde(default)]
    pub pending: bool,
}

impl From<RecordPaymentRequest> for NewPayment {
    fn from(req: RecordPaymentRequest) -> Self {
        Self {
            method: req.method,
            amount: req.amount,
            payer_name: req.payer_name,
            request_id: req.request_id,
            pending: req.pending,
        }
    }
}

/// Request body for `POST /parts/{part_id}/pay`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PayPartRequest {
    /// Payment method tag.
    pub method: String,
    /// Optional payer name; defaults to the part name.
    #[serde(default)]
    pub payer_name: Option<String>,
    /// Client idempotency key.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl From<PayPartRequest> for PartPayment {
    fn from(req: PayPartRequest) -> Self {
        Self {
            method: req.method,
            payer_name: req.payer_name,
            request_id: req.request_id,
        }
    }
}

/// Request body for `POST /sessions/{sid}/payments/{pid}/fail`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FailPaymentRequest {
    /// Why the payment failed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response for every payment operation: the payment plus the session
/// totals right after it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    /// Session totals after the operation.
    pub session: SessionSummary,
    /// The payment.
    pub payment: Payment,
    /// The part this payment settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<SplitPart>,
    /// `true` when this answers a retried request.
    pub replayed: bool,
}

impl From<PaymentReceipt> for PaymentResponse {
    fn from(receipt: PaymentReceipt) -> Self {
        Self {
            session: receipt.session,
            payment: receipt.payment,
            part: receipt.part,
            replayed: receipt.replayed,
        }
    }
}

/// Response for `GET /sessions/{id}/payments`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentListResponse {
    /// Payments in recording order.
    pub data: Vec<Payment>,
}
