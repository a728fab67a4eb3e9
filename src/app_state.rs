//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{SeatService, SessionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session service for payments and splits.
    pub session_service: Arc<SessionService>,
    /// Seat service for seat assignment.
    pub seat_service: Arc<SeatService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds the state, sharing the session service's event bus.
    #[must_use]
    pub fn new(session_service: Arc<SessionService>, seat_service: Arc<SeatService>) -> Self {
        let event_bus = session_service.event_bus().clone();
        Self {
            session_service,
            seat_service,
            event_bus,
        }
    }
}
