//! protoo core: wire envelopes and error types.
//!
//! This crate defines the message contract and error surface shared by the
//! node runtime and anything else that speaks the protocol. It carries no
//! transport or runtime dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `ProtooError`/`Result` so a malformed frame never takes a
//! process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, PeerError, ProtooError, Result, TransportError};
