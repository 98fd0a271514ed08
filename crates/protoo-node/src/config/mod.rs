//! Node config loader (strict parsing).

pub mod schema;

use std::fs;

use protoo_core::error::{ProtooError, Result};

pub use schema::{
    NodeConfig, PeerConfig, PeerSection, ServerSection, TransportConfig, TransportSection,
};

pub fn load_from_file(path: &str) -> Result<NodeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ProtooError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<NodeConfig> {
    let cfg: NodeConfig = serde_yaml::from_str(s)
        .map_err(|e| ProtooError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
