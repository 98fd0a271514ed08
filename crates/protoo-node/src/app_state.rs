//! Shared application state for the demo node.

use std::sync::Arc;

use protoo_core::error::Result;

use crate::config::{NodeConfig, PeerConfig, TransportConfig};
use crate::room::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    rooms: Arc<RoomRegistry>,
}

struct AppStateInner {
    cfg: NodeConfig,
    transport: TransportConfig,
    peer: PeerConfig,
}

impl AppState {
    /// Build application state. Validates `cfg` again so hand-built configs
    /// get the same checks as loaded ones.
    pub fn new(cfg: NodeConfig) -> Result<Self> {
        cfg.validate()?;
        let transport = TransportConfig::from(&cfg.transport);
        let peer = PeerConfig::from(&cfg.peer);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                transport,
                peer,
            }),
            rooms: Arc::new(RoomRegistry::new()),
        })
    }

    pub fn cfg(&self) -> &NodeConfig {
        &self.inner.cfg
    }

    pub fn transport_config(&self) -> &TransportConfig {
        &self.inner.transport
    }

    pub fn peer_config(&self) -> &PeerConfig {
        &self.inner.peer
    }

    pub fn rooms(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.rooms)
    }
}
