//! protoo node library.
//!
//! Transport, peer and room layers of the protoo RPC protocol, plus the
//! server session and client dial used by the `protoo-node` binary. The
//! in-memory connection in `transport::memory` lets tests and in-process
//! peers run without sockets.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod app_state;
pub mod client;
pub mod config;
pub mod peer;
pub mod room;
pub mod router;
pub mod session;
pub mod transport;
