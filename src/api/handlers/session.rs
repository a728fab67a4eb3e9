//! Session handlers: get-or-create, list, get.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    OpenSessionRequest, PaginationParams, SessionListQuery, SessionListResponse, SessionResponse,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::SessionId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /sessions`: Get or create the payment session of an order.
///
/// # Errors
///
/// Returns [`GatewayError`] for a blank order id or an invalid total.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "Get or create a payment session",
    description = "Returns the session of `order_id`, creating it with `total_amount` when none exists. An existing session keeps its stored total.",
    request_body = OpenSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 200, description = "Existing session returned", body = SessionResponse),
        (status = 400, description = "Invalid order id, amount or items", body = ErrorResponse),
    )
)]
pub async fn open_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<OpenSessionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let (session, created) = state
        .session_service
        .open_session(&req.order_id, req.total_amount, req.items)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SessionResponse::from(&session))))
}

/// `GET /sessions`: List sessions with pagination and status filter.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "List sessions",
    description = "Returns a paginated list of session summaries, oldest first, optionally filtered by status.",
    params(SessionListQuery),
    responses(
        (status = 200, description = "Paginated session list", body = SessionListResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let params = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .clamped();
    let (data, total) = state
        .session_service
        .list_sessions(query.status, params.offset(), params.per_page as usize)
        .await;

    Ok(Json(SessionListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /sessions/:id`: Get session details.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] if the session does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Get session details",
    description = "Returns the session with its derived totals, payments and active split.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = state
        .session_service
        .get_session(SessionId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(open_session))
        .route("/sessions/{id}", get(get_session))
}
