//! Transport layer.
//!
//! Owns one physical connection (read loop + write loop, keepalive,
//! coordinated shutdown) and exposes an async send/receive boundary to the
//! peer layer.

pub mod codec;
pub mod connection;
pub mod memory;
pub mod socket;
pub mod ws;

pub use connection::{Connection, Frame, FrameReader, FrameWriter};
pub use socket::{TransportEvents, TransportHandle, WebSocketTransport};
pub use ws::{AxumConnection, TungsteniteConnection};
