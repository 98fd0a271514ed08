//! Room broadcast layer.
//!
//! A lock-guarded registry of peers used for notification fan-out, plus the
//! process-wide room registry used by the server.

mod registry;
#[allow(clippy::module_inception)]
mod room;

pub use registry::RoomRegistry;
pub use room::Room;
