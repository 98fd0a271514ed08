//! Frame mapping for the WebSocket stacks.
//!
//! - Text/Binary => `Frame::Data` (outbound data goes out as Text when it is
//!   valid UTF-8, which protocol JSON always is)
//! - Ping/Pong/Close are surfaced for lifecycle management

use std::borrow::Cow;

use axum::extract::ws::{CloseFrame as AxumCloseFrame, Message as AxumMessage};
use bytes::Bytes;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use protoo_core::TransportError;

use crate::transport::connection::Frame;

pub fn from_axum(msg: AxumMessage) -> Frame {
    match msg {
        AxumMessage::Text(s) => Frame::Data(Bytes::from(s)),
        AxumMessage::Binary(b) => Frame::Data(Bytes::from(b)),
        AxumMessage::Ping(v) => Frame::Ping(Bytes::from(v)),
        AxumMessage::Pong(v) => Frame::Pong(Bytes::from(v)),
        AxumMessage::Close(cf) => {
            Frame::Close(cf.map(|cf| TransportError::new(cf.code, cf.reason.into_owned())))
        }
    }
}

pub fn to_axum(frame: Frame) -> AxumMessage {
    match frame {
        Frame::Data(b) => match String::from_utf8(b.to_vec()) {
            Ok(s) => AxumMessage::Text(s),
            Err(e) => AxumMessage::Binary(e.into_bytes()),
        },
        Frame::Ping(b) => AxumMessage::Ping(b.to_vec()),
        Frame::Pong(b) => AxumMessage::Pong(b.to_vec()),
        Frame::Close(reason) => AxumMessage::Close(reason.map(|r| AxumCloseFrame {
            code: r.code,
            reason: Cow::Owned(r.text),
        })),
    }
}

/// Display prefix of tungstenite's capacity error, which axum only exposes
/// boxed (its tungstenite version is private to it).
const CAPACITY_EXCEEDED: &str = "Space limit exceeded";

/// Read failures are abnormal, except the socket's own size limit, which is
/// the same protocol error the read loop raises.
pub fn axum_read_error(e: &axum::Error) -> TransportError {
    let text = e.to_string();
    if text.contains(CAPACITY_EXCEEDED) {
        TransportError::new(TransportError::MESSAGE_TOO_BIG, "message too big")
    } else {
        TransportError::abnormal(text)
    }
}

/// `None` for raw frames, which only exist on the write path.
pub fn from_tungstenite(msg: WsMessage) -> Option<Frame> {
    match msg {
        WsMessage::Text(t) => Some(Frame::Data(Bytes::copy_from_slice(t.as_bytes()))),
        WsMessage::Binary(b) => Some(Frame::Data(b)),
        WsMessage::Ping(b) => Some(Frame::Ping(b)),
        WsMessage::Pong(b) => Some(Frame::Pong(b)),
        WsMessage::Close(cf) => Some(Frame::Close(
            cf.map(|cf| TransportError::new(u16::from(cf.code), cf.reason.as_str())),
        )),
        WsMessage::Frame(_) => None,
    }
}

pub fn to_tungstenite(frame: Frame) -> WsMessage {
    match frame {
        Frame::Data(b) => match String::from_utf8(b.to_vec()) {
            Ok(s) => WsMessage::Text(s.into()),
            Err(e) => WsMessage::Binary(Bytes::from(e.into_bytes())),
        },
        Frame::Ping(b) => WsMessage::Ping(b),
        Frame::Pong(b) => WsMessage::Pong(b),
        Frame::Close(reason) => WsMessage::Close(reason.map(|r| WsCloseFrame {
            code: CloseCode::from(r.code),
            reason: r.text.into(),
        })),
    }
}
