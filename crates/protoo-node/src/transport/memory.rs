//! In-process connection pair.
//!
//! Behaves like a WebSocket for the transport's purposes: pings are answered
//! with pongs by the receiving side, a close sends a close frame, and a side
//! that disappears without closing surfaces as an abnormal closure. Used by
//! tests and by peers living in the same process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use protoo_core::TransportError;

use crate::transport::connection::{Connection, Frame, FrameReader, FrameWriter};

/// Close code sent by `FrameWriter::close`.
pub const NORMAL_CLOSURE: u16 = 1000;

/// One end of an in-memory connection.
pub struct MemoryConnection {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
    auto_pong: bool,
    closes: Arc<AtomicUsize>,
}

/// Two connected ends.
pub fn pair() -> (MemoryConnection, MemoryConnection) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (MemoryConnection::new(a_tx, a_rx), MemoryConnection::new(b_tx, b_rx))
}

impl MemoryConnection {
    fn new(tx: mpsc::UnboundedSender<Frame>, rx: mpsc::UnboundedReceiver<Frame>) -> Self {
        Self {
            tx,
            rx,
            auto_pong: true,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stop answering pings (simulates an unresponsive remote).
    pub fn without_auto_pong(mut self) -> Self {
        self.auto_pong = false;
        self
    }

    /// Shared counter of physical closes performed on this end.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

pub struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Frame>,
    pong: Option<mpsc::UnboundedSender<Frame>>,
}

pub struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    closes: Arc<AtomicUsize>,
}

impl Connection for MemoryConnection {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (MemoryReader, MemoryWriter) {
        let pong = self.auto_pong.then(|| self.tx.clone());
        (
            MemoryReader { rx: self.rx, pong },
            MemoryWriter {
                tx: Some(self.tx),
                closes: self.closes,
            },
        )
    }
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read(&mut self) -> Result<Frame, TransportError> {
        let frame = self
            .rx
            .recv()
            .await
            .ok_or_else(|| TransportError::abnormal("connection reset"))?;

        if let (Frame::Ping(payload), Some(pong)) = (&frame, &self.pong) {
            let _ = pong.send(Frame::Pong(payload.clone()));
        }
        if let Frame::Close(_) = frame {
            // Stop answering once the remote has closed.
            self.pong = None;
        }
        Ok(frame)
    }
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TransportError::abnormal("already closed"))?;
        tx.send(frame)
            .map_err(|_| TransportError::abnormal("connection reset"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        let Some(tx) = self.tx.take() else {
            return Err(TransportError::abnormal("already closed"));
        };
        tx.send(Frame::Close(Some(TransportError::new(NORMAL_CLOSURE, "normal closure"))))
            .map_err(|_| TransportError::abnormal("connection reset"))
    }
}
