use std::time::Duration;

use serde::Deserialize;
use protoo_core::error::{ProtooError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub peer: PeerSection,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            transport: TransportSection::default(),
            peer: PeerSection::default(),
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ProtooError::UnsupportedVersion);
        }

        self.transport.validate()?;
        self.peer.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,

    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    #[serde(default = "default_queue")]
    pub send_queue: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            pong_wait_ms: default_pong_wait_ms(),
            write_wait_ms: default_write_wait_ms(),
            max_message_bytes: default_max_message_bytes(),
            send_queue: default_queue(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval_ms == 0 || self.write_wait_ms == 0 {
            return Err(ProtooError::Config(
                "transport.ping_interval_ms and transport.write_wait_ms must be positive".into(),
            ));
        }
        if self.pong_wait_ms <= self.ping_interval_ms {
            return Err(ProtooError::Config(
                "transport.pong_wait_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(ProtooError::Config(
                "transport.max_message_bytes must be positive".into(),
            ));
        }
        if self.send_queue == 0 {
            return Err(ProtooError::Config("transport.send_queue must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerSection {
    #[serde(default = "default_queue")]
    pub event_queue: usize,

    #[serde(default = "default_queue")]
    pub command_queue: usize,
}

impl Default for PeerSection {
    fn default() -> Self {
        Self {
            event_queue: default_queue(),
            command_queue: default_queue(),
        }
    }
}

impl PeerSection {
    pub fn validate(&self) -> Result<()> {
        if self.event_queue == 0 || self.command_queue == 0 {
            return Err(ProtooError::Config(
                "peer.event_queue and peer.command_queue must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    5000
}
fn default_pong_wait_ms() -> u64 {
    60000
}
fn default_write_wait_ms() -> u64 {
    10000
}
fn default_max_message_bytes() -> usize {
    131072
}
fn default_queue() -> usize {
    100
}

/// Runtime transport settings.
///
/// Built from a validated `TransportSection` or by hand. Hand-built values
/// skip validation; a zero `ping_interval` is raised to 1ms by the transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Keepalive ping period. Must be shorter than `pong_wait`.
    pub ping_interval: Duration,
    /// Read deadline, refreshed on every pong.
    pub pong_wait: Duration,
    /// Bound on a single physical write.
    pub write_wait: Duration,
    /// Largest inbound frame accepted.
    pub max_message_bytes: usize,
    /// Outbound queue capacity.
    pub send_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::from(&TransportSection::default())
    }
}

impl From<&TransportSection> for TransportConfig {
    fn from(s: &TransportSection) -> Self {
        Self {
            ping_interval: Duration::from_millis(s.ping_interval_ms),
            pong_wait: Duration::from_millis(s.pong_wait_ms),
            write_wait: Duration::from_millis(s.write_wait_ms),
            max_message_bytes: s.max_message_bytes,
            send_queue: s.send_queue,
        }
    }
}

/// Runtime peer settings.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Capacity of each inbound event stream.
    pub event_queue: usize,
    /// Capacity of the outgoing request queue.
    pub command_queue: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        PeerConfig::from(&PeerSection::default())
    }
}

impl From<&PeerSection> for PeerConfig {
    fn from(s: &PeerSection) -> Self {
        Self {
            event_queue: s.event_queue,
            command_queue: s.command_queue,
        }
    }
}
