//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::money::MoneyError;
use crate::domain::split_calculator::SplitError;
use crate::domain::{Money, PaymentStatus};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "payment of 30.00 exceeds remaining balance 20.00",
///     "details": { "amount": "30.00", "remaining": "20.00" }
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable context for the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Not Found       | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Reconciliation  | 422 Unprocessable / 409      |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An amount was malformed, non-positive or out of range.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A split request cannot be satisfied.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Payment with the given ID was not found in the session.
    #[error("payment not found: {0}")]
    PaymentNotFound(uuid::Uuid),

    /// Split part with the given ID was not found.
    #[error("split part not found: {0}")]
    PartNotFound(uuid::Uuid),

    /// Seat with the given ID was not found.
    #[error("seat not found: {0}")]
    SeatNotFound(uuid::Uuid),

    /// The session has no active split.
    #[error("session {0} has no active split")]
    NoActiveSplit(uuid::Uuid),

    /// A seat with the same number already exists at the table.
    #[error("table {table_id} already has seat {number}")]
    SeatConflict {
        /// Table reference.
        table_id: String,
        /// Conflicting seat number.
        number: u32,
    },

    /// A payment exceeds what is left to pay.
    #[error("payment of {amount} exceeds remaining balance {remaining}")]
    Overpayment {
        /// Requested amount.
        amount: Money,
        /// Amount still available to pay.
        remaining: Money,
    },

    /// Split parts do not reconcile to the amount being split.
    #[error("split parts sum to {got}, expected {expected}")]
    SplitMismatch {
        /// Required sum.
        expected: Money,
        /// Actual sum.
        got: Money,
    },

    /// The active split cannot be replaced because a part is paid.
    #[error("session {0} already has a split with paid parts")]
    SplitAlreadyActiveWithPayments(uuid::Uuid),

    /// The part has already been paid.
    #[error("split part {0} is already paid")]
    PartAlreadyPaid(uuid::Uuid),

    /// The session is completed and accepts no further mutation.
    #[error("session {0} is closed")]
    SessionClosed(uuid::Uuid),

    /// The payment is not pending and cannot change state this way.
    #[error("payment {payment_id} is {}", status.as_str())]
    PaymentNotPending {
        /// Payment identifier.
        payment_id: uuid::Uuid,
        /// Its current status.
        status: PaymentStatus,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAmount(_) => 1002,
            Self::InvalidSplit(_) => 1003,
            Self::SessionNotFound(_) => 2001,
            Self::PaymentNotFound(_) => 2002,
            Self::PartNotFound(_) => 2003,
            Self::SeatNotFound(_) => 2004,
            Self::NoActiveSplit(_) => 2005,
            Self::SeatConflict { .. } => 2006,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Overpayment { .. } => 4001,
            Self::SplitMismatch { .. } => 4002,
            Self::SplitAlreadyActiveWithPayments(_) => 4003,
            Self::PartAlreadyPaid(_) => 4004,
            Self::SessionClosed(_) => 4005,
            Self::PaymentNotPending { .. } => 4006,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAmount(_) | Self::InvalidSplit(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::SessionNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::PartNotFound(_)
            | Self::SeatNotFound(_)
            | Self::NoActiveSplit(_) => StatusCode::NOT_FOUND,
            Self::SeatConflict { .. }
            | Self::SplitAlreadyActiveWithPayments(_)
            | Self::PartAlreadyPaid(_)
            | Self::SessionClosed(_)
            | Self::PaymentNotPending { .. } => StatusCode::CONFLICT,
            Self::Overpayment { .. } | Self::SplitMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns structured details for variants that carry amounts.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Overpayment { amount, remaining } => Some(json!({
                "amount": amount,
                "remaining": remaining,
            })),
            Self::SplitMismatch { expected, got } => Some(json!({
                "expected": expected,
                "got": got,
                "delta": *expected - *got,
            })),
            Self::PaymentNotPending { status, .. } => Some(json!({ "status": status })),
            Self::SeatConflict { table_id, number } => Some(json!({
                "table_id": table_id,
                "number": number,
            })),
            _ => None,
        }
    }
}

impl From<MoneyError> for GatewayError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::InvalidDivisor(_) => Self::InvalidSplit(err.to_string()),
            _ => Self::InvalidAmount(err.to_string()),
        }
    }
}

impl From<SplitError> for GatewayError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::Invalid(msg) => Self::InvalidSplit(msg),
            SplitError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            SplitError::Mismatch { expected, got } => Self::SplitMismatch { expected, got },
            SplitError::Money(e) => Self::from(e),
        }
    }
}

/// Markers of [`MoneyError`] messages that surface through serde when an
/// amount field fails to parse.
const AMOUNT_ERROR_MARKERS: [&str; 3] = ["malformed amount", "fraction digits", "out of range"];

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        if AMOUNT_ERROR_MARKERS.iter().any(|m| text.contains(m)) {
            Self::InvalidAmount(text)
        } else {
            Self::InvalidRequest(text)
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
