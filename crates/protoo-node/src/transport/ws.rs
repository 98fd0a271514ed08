//! WebSocket connection adapters.
//!
//! - `AxumConnection`: server side, wraps an upgraded axum `WebSocket`
//! - `TungsteniteConnection`: client side, wraps a tokio-tungstenite stream
//!
//! Pong replies to remote pings are produced by the WebSocket stacks
//! themselves; the adapters only translate frames.

use async_trait::async_trait;
use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use protoo_core::TransportError;

use crate::transport::codec;
use crate::transport::connection::{Connection, Frame, FrameReader, FrameWriter};

/// Close code sent when we initiate the close handshake.
const NORMAL_CLOSURE: u16 = 1000;

fn closing_frame() -> Frame {
    Frame::Close(Some(TransportError::new(NORMAL_CLOSURE, "")))
}

// --------------------
// axum (server)
// --------------------
pub struct AxumConnection {
    socket: WebSocket,
}

impl AxumConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

pub struct AxumReader(SplitStream<WebSocket>);

pub struct AxumWriter(SplitSink<WebSocket, AxumMessage>);

impl Connection for AxumConnection {
    type Reader = AxumReader;
    type Writer = AxumWriter;

    fn split(self) -> (AxumReader, AxumWriter) {
        let (tx, rx) = self.socket.split();
        (AxumReader(rx), AxumWriter(tx))
    }
}

#[async_trait]
impl FrameReader for AxumReader {
    async fn read(&mut self) -> Result<Frame, TransportError> {
        match self.0.next().await {
            Some(Ok(msg)) => Ok(codec::from_axum(msg)),
            Some(Err(e)) => Err(codec::axum_read_error(&e)),
            None => Err(TransportError::abnormal("connection reset")),
        }
    }
}

#[async_trait]
impl FrameWriter for AxumWriter {
    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.0
            .send(codec::to_axum(frame))
            .await
            .map_err(|e| TransportError::abnormal(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // The close frame may fail if the remote already went away; still
        // shut the sink down.
        let sent = self.0.send(codec::to_axum(closing_frame())).await;
        let closed = self.0.close().await;
        sent.and(closed)
            .map_err(|e| TransportError::abnormal(e.to_string()))
    }
}

// --------------------
// tokio-tungstenite (client)
// --------------------
pub struct TungsteniteConnection<S> {
    stream: WebSocketStream<S>,
}

impl<S> TungsteniteConnection<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

pub struct TungsteniteReader<S>(SplitStream<WebSocketStream<S>>);

pub struct TungsteniteWriter<S>(SplitSink<WebSocketStream<S>, WsMessage>);

impl<S> Connection for TungsteniteConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Reader = TungsteniteReader<S>;
    type Writer = TungsteniteWriter<S>;

    fn split(self) -> (TungsteniteReader<S>, TungsteniteWriter<S>) {
        let (tx, rx) = self.stream.split();
        (TungsteniteReader(rx), TungsteniteWriter(tx))
    }
}

#[async_trait]
impl<S> FrameReader for TungsteniteReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn read(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.0.next().await {
                Some(Ok(msg)) => {
                    if let Some(frame) = codec::from_tungstenite(msg) {
                        return Ok(frame);
                    }
                }
                Some(Err(e)) => return Err(TransportError::abnormal(e.to_string())),
                None => return Err(TransportError::abnormal("connection reset")),
            }
        }
    }
}

#[async_trait]
impl<S> FrameWriter for TungsteniteWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.0
            .send(codec::to_tungstenite(frame))
            .await
            .map_err(|e| TransportError::abnormal(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let sent = self.0.send(codec::to_tungstenite(closing_frame())).await;
        let closed = self.0.close().await;
        sent.and(closed)
            .map_err(|e| TransportError::abnormal(e.to_string()))
    }
}
