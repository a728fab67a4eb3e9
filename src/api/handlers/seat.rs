//! Seat handlers: create, list, get, associate and dissociate items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{AssociateItemRequest, CreateSeatRequest, SeatListResponse, SeatResponse};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::SeatId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /tables/:table_id/seats`: Create a seat.
///
/// # Errors
///
/// Returns [`GatewayError::SeatConflict`] if the number is taken.
#[utoipa::path(
    post,
    path = "/api/v1/tables/{table_id}/seats",
    tag = "Seats",
    summary = "Create a seat",
    description = "Adds a free seat to the table. Seat numbers are unique per table.",
    request_body = CreateSeatRequest,
    params(
        ("table_id" = String, Path, description = "Table reference"),
    ),
    responses(
        (status = 201, description = "Seat created", body = SeatResponse),
        (status = 400, description = "Invalid seat number", body = ErrorResponse),
        (status = 409, description = "Seat number already used", body = ErrorResponse),
    )
)]
pub async fn create_seat(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    ApiJson(req): ApiJson<CreateSeatRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .seat_service
        .create_seat(&table_id, req.number, req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(SeatResponse::from(record))))
}

/// `GET /tables/:table_id/seats`: List seats of a table.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/tables/{table_id}/seats",
    tag = "Seats",
    summary = "List seats",
    description = "Returns the seats of the table ordered by number, with their item associations.",
    params(
        ("table_id" = String, Path, description = "Table reference"),
    ),
    responses(
        (status = 200, description = "Seat list", body = SeatListResponse),
    )
)]
pub async fn list_seats(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state
        .seat_service
        .list_seats(&table_id)
        .await
        .into_iter()
        .map(SeatResponse::from)
        .collect();
    Ok(Json(SeatListResponse { data }))
}

/// `GET /seats/:id`: Get a seat.
///
/// # Errors
///
/// Returns [`GatewayError::SeatNotFound`] if the seat does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/seats/{id}",
    tag = "Seats",
    summary = "Get a seat",
    params(
        ("id" = uuid::Uuid, Path, description = "Seat UUID"),
    ),
    responses(
        (status = 200, description = "Seat with associations", body = SeatResponse),
        (status = 404, description = "Seat not found", body = ErrorResponse),
    )
)]
pub async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.seat_service.get_seat(SeatId::from_uuid(id)).await?;
    Ok(Json(SeatResponse::from(record)))
}

/// `POST /seats/:id/items`: Associate an order item with a seat.
///
/// # Errors
///
/// Returns [`GatewayError::SeatNotFound`] or [`GatewayError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/v1/seats/{id}/items",
    tag = "Seats",
    summary = "Associate an item with a seat",
    description = "Attributes units of an order item to the seat, replacing any previous quantity for that item. The seat becomes occupied.",
    request_body = AssociateItemRequest,
    params(
        ("id" = uuid::Uuid, Path, description = "Seat UUID"),
    ),
    responses(
        (status = 200, description = "Updated seat", body = SeatResponse),
        (status = 400, description = "Invalid item or quantity", body = ErrorResponse),
        (status = 404, description = "Seat not found", body = ErrorResponse),
    )
)]
pub async fn associate_item(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    ApiJson(req): ApiJson<AssociateItemRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .seat_service
        .associate_item(SeatId::from_uuid(id), &req.order_item_id, req.quantity)
        .await?;
    Ok(Json(SeatResponse::from(record)))
}

/// `DELETE /seats/:id/items/:order_item_id`: Remove an item from a seat.
///
/// # Errors
///
/// Returns [`GatewayError::SeatNotFound`] or [`GatewayError::InvalidRequest`].
#[utoipa::path(
    delete,
    path = "/api/v1/seats/{id}/items/{order_item_id}",
    tag = "Seats",
    summary = "Remove an item from a seat",
    description = "Drops the association. A seat without associations becomes free.",
    params(
        ("id" = uuid::Uuid, Path, description = "Seat UUID"),
        ("order_item_id" = String, Path, description = "Order item reference"),
    ),
    responses(
        (status = 200, description = "Updated seat", body = SeatResponse),
        (status = 400, description = "Item not on this seat", body = ErrorResponse),
        (status = 404, description = "Seat not found", body = ErrorResponse),
    )
)]
pub async fn dissociate_item(
    State(state): State<AppState>,
    Path((id, order_item_id)): Path<(uuid::Uuid, String)>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .seat_service
        .dissociate_item(SeatId::from_uuid(id), &order_item_id)
        .await?;
    Ok(Json(SeatResponse::from(record)))
}

/// Seat routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tables/{table_id}/seats", get(list_seats).post(create_seat))
        .route("/seats/{id}", get(get_seat))
        .route("/seats/{id}/items", post(associate_item))
        .route("/seats/{id}/items/{order_item_id}", delete(dissociate_item))
}
