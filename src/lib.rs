//! # tab-settle
//!
//! Split and partial payment reconciliation for restaurant bills.
//!
//! A payment session tracks one order's bill. Guests settle it with
//! ad-hoc payments or by paying the parts of a split (equal, custom, or
//! by seat). Every amount is integer minor units, parts always add up to
//! the amount split, and a session completes exactly once, when its
//! confirmed payments reach the total.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── SessionService / SeatService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── SessionRepository, SeatStore (domain/)
//!     ├── Ledger, Split Calculator, Money (domain/)
//!     │
//!     └── PostgreSQL journal (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
