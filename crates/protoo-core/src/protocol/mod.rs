//! Wire protocol.
//!
//! JSON envelopes exchanged between peers. Decoding is panic-free: malformed
//! input is reported as `ProtooError::Decode` and left to the caller to drop.

pub mod message;

pub use message::{
    from_raw, to_raw, Message, Notification, Request, Response, ResponseError, TransactionId,
};
