//! Physical connection seam.
//!
//! A connection is anything ordered, message-framed and full-duplex. It is
//! split once into a reader half (owned by the read loop) and a writer half
//! (owned by the write loop), so the two loops never share a lock.

use async_trait::async_trait;
use bytes::Bytes;

use protoo_core::TransportError;

/// One frame as seen by the transport loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application payload (a JSON text frame on WebSocket).
    Data(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    /// Remote close, with its code/reason when one was sent.
    Close(Option<TransportError>),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Data(b) | Frame::Ping(b) | Frame::Pong(b) => b.len(),
            Frame::Close(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Next inbound frame. A stream that ends without a close frame is an
    /// `ABNORMAL` error.
    async fn read(&mut self) -> Result<Frame, TransportError>;
}

#[async_trait]
pub trait FrameWriter: Send + 'static {
    async fn write(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Physically close the connection. Called once, by the write loop.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// A connection that can be split into independent halves.
pub trait Connection: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    fn split(self) -> (Self::Reader, Self::Writer);
}
