//! Payment handlers: record, list, confirm, fail, pay a part.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    FailPaymentRequest, PayPartRequest, PaymentListResponse, PaymentResponse, RecordPaymentRequest,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::{PartId, PaymentId, SessionId};
use crate::error::{ErrorResponse, GatewayError};

/// Status for a payment write: `201` for a new payment, `200` for a replay.
fn write_status(response: &PaymentResponse) -> StatusCode {
    if response.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

/// `POST /sessions/:id/payments`: Record an ad-hoc payment.
///
/// # Errors
///
/// Returns [`GatewayError::Overpayment`], [`GatewayError::InvalidAmount`] or
/// [`GatewayError::SessionClosed`] when the payment cannot be accepted.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/payments",
    tag = "Payments",
    summary = "Record an ad-hoc payment",
    description = "Records a payment against the outstanding balance. A payment that would exceed the balance is rejected. A retried `request_id` returns the original payment.",
    request_body = RecordPaymentRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 200, description = "Retried request, original payment returned", body = PaymentResponse),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session closed", body = ErrorResponse),
        (status = 422, description = "Overpayment", body = ErrorResponse),
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    ApiJson(req): ApiJson<RecordPaymentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state
        .session_service
        .record_payment(SessionId::from_uuid(id), req.into())
        .await?;
    let response = PaymentResponse::from(receipt);
    Ok((write_status(&response), Json(response)))
}

/// `GET /sessions/:id/payments`: List payments of a session.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] if the session does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/payments",
    tag = "Payments",
    summary = "List payments",
    description = "Returns every payment of the session in recording order, including failed ones.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Payment list", body = PaymentListResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state
        .session_service
        .list_payments(SessionId::from_uuid(id))
        .await?;
    Ok(Json(PaymentListResponse { data }))
}

/// `POST /sessions/:sid/payments/:pid/confirm`: Confirm a pending payment.
///
/// # Errors
///
/// Returns [`GatewayError::PaymentNotFound`] or
/// [`GatewayError::PaymentNotPending`] when the payment cannot be confirmed.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/payments/{payment_id}/confirm",
    tag = "Payments",
    summary = "Confirm a pending payment",
    description = "Moves a pending payment to confirmed. Confirming an already confirmed payment is a no-op.",
    params(
        ("session_id" = uuid::Uuid, Path, description = "Session UUID"),
        ("payment_id" = uuid::Uuid, Path, description = "Payment UUID"),
    ),
    responses(
        (status = 200, description = "Payment confirmed", body = PaymentResponse),
        (status = 404, description = "Session or payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already failed", body = ErrorResponse),
    )
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path((session_id, payment_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state
        .session_service
        .confirm_payment(
            SessionId::from_uuid(session_id),
            PaymentId::from_uuid(payment_id),
        )
        .await?;
    Ok(Json(PaymentResponse::from(receipt)))
}

/// `POST /sessions/:sid/payments/:pid/fail`: Fail a pending payment.
///
/// # Errors
///
/// Returns [`GatewayError::PaymentNotFound`] or
/// [`GatewayError::PaymentNotPending`] when the payment cannot be failed.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/payments/{payment_id}/fail",
    tag = "Payments",
    summary = "Fail a pending payment",
    description = "Marks a pending payment as failed and releases the balance it reserved.",
    request_body = FailPaymentRequest,
    params(
        ("session_id" = uuid::Uuid, Path, description = "Session UUID"),
        ("payment_id" = uuid::Uuid, Path, description = "Payment UUID"),
    ),
    responses(
        (status = 200, description = "Payment failed", body = PaymentResponse),
        (status = 404, description = "Session or payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already confirmed", body = ErrorResponse),
    )
)]
pub async fn fail_payment(
    State(state): State<AppState>,
    Path((session_id, payment_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    ApiJson(req): ApiJson<FailPaymentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state
        .session_service
        .fail_payment(
            SessionId::from_uuid(session_id),
            PaymentId::from_uuid(payment_id),
            req.reason.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(PaymentResponse::from(receipt)))
}

/// `POST /parts/:part_id/pay`: Pay one split part in full.
///
/// # Errors
///
/// Returns [`GatewayError::PartNotFound`], [`GatewayError::PartAlreadyPaid`]
/// or [`GatewayError::SessionClosed`].
#[utoipa::path(
    post,
    path = "/api/v1/parts/{part_id}/pay",
    tag = "Payments",
    summary = "Pay a split part",
    description = "Records a confirmed payment for the full amount of the part and marks it paid. Paying the last outstanding amount completes the session.",
    request_body = PayPartRequest,
    params(
        ("part_id" = uuid::Uuid, Path, description = "Split part UUID"),
    ),
    responses(
        (status = 201, description = "Part paid", body = PaymentResponse),
        (status = 200, description = "Retried request, original payment returned", body = PaymentResponse),
        (status = 404, description = "Part not found", body = ErrorResponse),
        (status = 409, description = "Part already paid or session closed", body = ErrorResponse),
    )
)]
pub async fn pay_part(
    State(state): State<AppState>,
    Path(part_id): Path<uuid::Uuid>,
    ApiJson(req): ApiJson<PayPartRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state
        .session_service
        .pay_part(PartId::from_uuid(part_id), req.into())
        .await?;
    let response = PaymentResponse::from(receipt);
    Ok((write_status(&response), Json(response)))
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions/{id}/payments",
            get(list_payments).post(record_payment),
        )
        .route(
            "/sessions/{session_id}/payments/{payment_id}/confirm",
            post(confirm_payment),
        )
        .route(
            "/sessions/{session_id}/payments/{payment_id}/fail",
            post(fail_payment),
        )
        .route("/parts/{part_id}/pay", post(pay_part))
}
