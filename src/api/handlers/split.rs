//! Split handlers: create, get, discard.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateSplitRequest, SplitResponse};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::SessionId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /sessions/:id/splits`: Create or replace the active split.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidSplit`], [`GatewayError::SplitMismatch`] or
/// [`GatewayError::SplitAlreadyActiveWithPayments`].
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/splits",
    tag = "Splits",
    summary = "Create a split",
    description = "Divides the outstanding balance with the `equal`, `custom` or `seat` strategy. Replaces an active split that has no paid parts.",
    request_body = CreateSplitRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 201, description = "Split created", body = SplitResponse),
        (status = 400, description = "Invalid split parameters", body = ErrorResponse),
        (status = 404, description = "Session or seat not found", body = ErrorResponse),
        (status = 409, description = "Active split already has payments, or session closed", body = ErrorResponse),
        (status = 422, description = "Custom amounts do not reconcile", body = ErrorResponse),
    )
)]
pub async fn create_split(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    ApiJson(req): ApiJson<CreateSplitRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let split = state
        .session_service
        .create_split(SessionId::from_uuid(id), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(SplitResponse::from(&split))))
}

/// `GET /sessions/:id/split`: Get the active split.
///
/// # Errors
///
/// Returns [`GatewayError::NoActiveSplit`] when the session has no split.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/split",
    tag = "Splits",
    summary = "Get the active split",
    description = "Returns the active split with the paid state of each part.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Active split", body = SplitResponse),
        (status = 404, description = "Session not found or no active split", body = ErrorResponse),
    )
)]
pub async fn get_split(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let split = state
        .session_service
        .active_split(SessionId::from_uuid(id))
        .await?;
    Ok(Json(SplitResponse::from(&split)))
}

/// `DELETE /sessions/:id/split`: Discard the active split.
///
/// # Errors
///
/// Returns [`GatewayError::NoActiveSplit`] or
/// [`GatewayError::SplitAlreadyActiveWithPayments`].
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}/split",
    tag = "Splits",
    summary = "Discard the active split",
    description = "Removes the active split while none of its parts has been paid.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Discarded split", body = SplitResponse),
        (status = 404, description = "Session not found or no active split", body = ErrorResponse),
        (status = 409, description = "Split has paid parts, or session closed", body = ErrorResponse),
    )
)]
pub async fn discard_split(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let split = state
        .session_service
        .discard_split(SessionId::from_uuid(id))
        .await?;
    Ok(Json(SplitResponse::from(&split)))
}

/// Split routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/splits", post(create_split))
        .route("/sessions/{id}/split", get(get_split).delete(discard_split))
}
