//! Service layer: business logic orchestration.
//!
//! [`SessionService`] drives the payment session state machine through
//! the ledger and split calculator, commits through the optional journal
//! and emits events on the [`super::domain::EventBus`]. [`SeatService`]
//! does the same for seats. [`sweeper`] holds the background loops.

pub mod seat_service;
pub mod session_service;
pub mod sweeper;

pub use seat_service::SeatService;
pub use session_service::{NewPayment, PartPayment, PaymentReceipt, SessionService};
