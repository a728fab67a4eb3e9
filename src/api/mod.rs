//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health`,
//! `/config/*`, `/openapi.json` and `/ws` live at the root.

pub mod dto;
pub mod extract;
pub mod handlers;

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "tab-settle",
        description = "Split and partial payment reconciliation for restaurant bills"
    ),
    paths(
        handlers::session::open_session,
        handlers::session::list_sessions,
        handlers::session::get_session,
        handlers::payment::record_payment,
        handlers::payment::list_payments,
        handlers::payment::confirm_payment,
        handlers::payment::fail_payment,
        handlers::payment::pay_part,
        handlers::split::create_split,
        handlers::split::get_split,
        handlers::split::discard_split,
        handlers::seat::create_seat,
        handlers::seat::list_seats,
        handlers::seat::get_seat,
        handlers::seat::associate_item,
        handlers::seat::dissociate_item,
        handlers::system::health_handler,
        handlers::system::split_strategies_handler,
    ),
    tags(
        (name = "Sessions", description = "Payment sessions, one per order"),
        (name = "Payments", description = "Ad-hoc and part payments"),
        (name = "Splits", description = "Dividing the balance into payable parts"),
        (name = "Seats", description = "Seats and their order items"),
        (name = "System", description = "Health and catalogs"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the full application: REST routes, the `/ws` endpoint and the
/// HTTP middleware stack, bound to `state`.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}
