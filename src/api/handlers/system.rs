//! System endpoints: health check and split strategy catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::SplitStrategy;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported split strategy info.
#[derive(Debug, Serialize, ToSchema)]
pub struct SplitStrategyInfo {
    strategy: SplitStrategy,
    description: &'static str,
    required_fields: Vec<&'static str>,
    optional_fields: Vec<&'static str>,
}

/// `GET /config/split-strategies`: List supported split strategies.
#[utoipa::path(
    get,
    path = "/config/split-strategies",
    tag = "System",
    summary = "List split strategies",
    description = "Returns the strategies accepted by `POST /api/v1/sessions/{id}/splits` and the fields each one takes.",
    responses(
        (status = 200, description = "Split strategy catalog", body = Vec<SplitStrategyInfo>),
    )
)]
pub async fn split_strategies_handler() -> impl IntoResponse {
    let strategies = vec![
        SplitStrategyInfo {
            strategy: SplitStrategy::Equal,
            description: "Outstanding balance divided into N equal parts; leftover cents go to the first parts",
            required_fields: vec!["number_of_parts"],
            optional_fields: vec!["names"],
        },
        SplitStrategyInfo {
            strategy: SplitStrategy::Custom,
            description: "Caller-chosen named amounts that must add up to the outstanding balance",
            required_fields: vec!["parts"],
            optional_fields: Vec::new(),
        },
        SplitStrategyInfo {
            strategy: SplitStrategy::Seat,
            description: "One part per seat, priced from the order items associated with each seat",
            required_fields: vec!["seat_ids"],
            optional_fields: vec!["include_shared_items"],
        },
    ];
    (StatusCode::OK, Json(strategies))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/split-strategies", get(split_strategies_handler))
}
