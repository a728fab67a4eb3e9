//! Domain layer: money, the session aggregate, and the pure rules over it.
//!
//! Nothing here performs I/O. The ledger and split calculator are plain
//! functions over owned data; the repository and seat store provide the
//! concurrent storage the service layer locks through; the event bus
//! carries committed changes to subscribers.

pub mod event_bus;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod seat;
pub mod seat_store;
pub mod session;
pub mod session_event;
pub mod session_repository;
pub mod split;
pub mod split_calculator;

pub use event_bus::EventBus;
pub use ids::{PartId, PaymentId, SeatId, SessionId, SplitId};
pub use money::Money;
pub use payment::{Payment, PaymentStatus};
pub use seat::{Seat, SeatItemAssociation, SeatStatus};
pub use seat_store::{SeatRecord, SeatStore};
pub use session::{OrderItem, PaymentSession, SessionStatus, SessionSummary};
pub use session_event::SessionEvent;
pub use session_repository::{SessionHandle, SessionRepository};
pub use split::{NamedAmount, Split, SplitAdjustment, SplitParams, SplitPart, SplitStrategy};
