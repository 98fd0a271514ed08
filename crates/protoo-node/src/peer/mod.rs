//! Peer protocol engine.
//!
//! Frames application data into protocol messages, correlates requests with
//! their responses, and surfaces inbound requests/notifications/closure as
//! event streams. One task per peer owns the transaction table.

mod engine;
pub mod events;
pub mod transaction;

pub use engine::Peer;
pub use events::{DropReason, DroppedMessage, IncomingRequest, PeerEvents};
pub use transaction::{PendingResponse, RequestResult};
