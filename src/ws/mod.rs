//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` lets terminals follow the sessions they
//! serve: payments, splits and completion are pushed as they commit, and
//! the current state of a session can be fetched on the same socket.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
