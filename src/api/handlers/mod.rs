//! REST endpoint handlers organized by resource.

pub mod payment;
pub mod seat;
pub mod session;
pub mod split;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(session::routes())
        .merge(payment::routes())
        .merge(split::routes())
        .merge(seat::routes())
}
