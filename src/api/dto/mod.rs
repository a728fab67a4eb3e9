//! Data Transfer Objects for REST request/response serialization.
//!
//! All monetary amounts are serialized as decimal strings with two
//! fraction digits and accepted as strings or JSON numbers.

pub mod common_dto;
pub mod payment_dto;
pub mod seat_dto;
pub mod session_dto;
pub mod split_dto;

pub use common_dto::*;
pub use payment_dto::*;
pub use seat_dto::*;
pub use session_dto::*;
pub use split_dto::*;
