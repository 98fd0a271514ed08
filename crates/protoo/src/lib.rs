//! Top-level facade crate for protoo.
//!
//! Re-exports the wire types and the node runtime so users can depend on a
//! single crate.

pub mod core {
    pub use protoo_core::*;
}

pub mod node {
    pub use protoo_node::*;
}
