//! Shared error types across protoo crates.

use thiserror::Error;

/// Stable error kinds (used by tests and log fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value could not be encoded to the wire format.
    Encode,
    /// Inbound bytes are not a valid envelope.
    Decode,
    /// Invalid configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Transport or peer already shut down.
    Closed,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Encode => "ENCODE",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Closed => "CLOSED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ProtooError>;

/// Unified error type used by core and node.
#[derive(Debug, Error)]
pub enum ProtooError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("closed")]
    Closed,
    #[error("internal: {0}")]
    Internal(String),
}

impl ProtooError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtooError::Encode(_) => ErrorKind::Encode,
            ProtooError::Decode(_) => ErrorKind::Decode,
            ProtooError::Config(_) => ErrorKind::Config,
            ProtooError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            ProtooError::Closed => ErrorKind::Closed,
            ProtooError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Why a transport shut down.
///
/// Carries the remote close code/reason when one was received, otherwise one
/// of the synthetic local codes below.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport closed ({code}): {text}")]
pub struct TransportError {
    pub code: u16,
    pub text: String,
}

impl TransportError {
    /// Local close with no recorded cause.
    pub const CLOSED: u16 = 100;
    /// Close frame without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped, read/write deadline elapsed.
    pub const ABNORMAL: u16 = 1006;
    /// Inbound frame above the configured limit.
    pub const MESSAGE_TOO_BIG: u16 = 1009;

    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn closed() -> Self {
        Self::new(Self::CLOSED, "closed")
    }

    pub fn abnormal(text: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, text)
    }
}

/// Structured error handed to the issuer of a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("peer error ({code}): {text}")]
pub struct PeerError {
    pub code: i32,
    pub text: String,
}

impl PeerError {
    /// Request payload could not be serialized.
    pub const ENCODE_FAILED: i32 = 10;
    /// Peer closed before a response arrived.
    pub const PEER_CLOSED: i32 = 11;
    /// Local failure other than encoding.
    pub const INTERNAL: i32 = 12;

    pub fn new(code: i32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn peer_closed() -> Self {
        Self::new(Self::PEER_CLOSED, "peer closed")
    }
}

impl From<TransportError> for PeerError {
    fn from(e: TransportError) -> Self {
        PeerError::new(i32::from(e.code), e.text)
    }
}

impl From<ProtooError> for PeerError {
    fn from(e: ProtooError) -> Self {
        match e {
            ProtooError::Encode(msg) => PeerError::new(PeerError::ENCODE_FAILED, msg),
            ProtooError::Closed => PeerError::peer_closed(),
            other => PeerError::new(PeerError::INTERNAL, other.to_string()),
        }
    }
}
