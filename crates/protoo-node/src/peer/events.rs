//! Inbound events delivered to the application.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::sync::{mpsc, oneshot};

use protoo_core::error::Result;
use protoo_core::protocol::{
    to_raw, Message, Notification, Request, Response, ResponseError, TransactionId,
};
use protoo_core::TransportError;

use crate::transport::TransportHandle;

/// Receivers for everything a peer reports.
///
/// `requests` and `notifications` apply backpressure: the peer task waits
/// while either is full, so drain both (or drop the ones you do not need).
/// `dropped` is lossy and never blocks the peer.
pub struct PeerEvents {
    pub requests: mpsc::Receiver<IncomingRequest>,
    pub notifications: mpsc::Receiver<Notification>,
    /// Fires once with the transport's close reason.
    pub closed: oneshot::Receiver<TransportError>,
    pub dropped: mpsc::Receiver<DroppedMessage>,
}

/// A request from the remote peer awaiting `accept` or `reject`.
///
/// Both consume the request, so at most one response goes out. Dropping it
/// without answering leaves the remote caller pending.
#[derive(Debug)]
pub struct IncomingRequest {
    request: Request,
    transport: TransportHandle,
}

impl IncomingRequest {
    pub(crate) fn new(request: Request, transport: TransportHandle) -> Self {
        Self { request, transport }
    }

    pub fn id(&self) -> TransactionId {
        self.request.id
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn data(&self) -> &RawValue {
        &self.request.data
    }

    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T> {
        self.request.parse_data()
    }

    /// Send a success response carrying `data`.
    ///
    /// Fails with `Encode` if `data` does not serialize, `Closed` if the
    /// transport already shut down.
    pub async fn accept<T: Serialize + ?Sized>(self, data: &T) -> Result<()> {
        let response = Message::Response(Response {
            id: self.request.id,
            data: to_raw(data)?,
        });
        self.transport.send(response.encode()?).await
    }

    /// Send an error response.
    pub async fn reject(self, code: i32, reason: impl Into<String>) -> Result<()> {
        let response = Message::ResponseError(ResponseError {
            id: self.request.id,
            error_code: code,
            error_reason: reason.into(),
        });
        self.transport.send(response.encode()?).await
    }
}

/// Why an inbound message never reached the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not JSON, no discriminator, or missing required fields.
    Malformed(String),
    /// Response for an id that is not outstanding.
    UnknownTransaction(TransactionId),
}

#[derive(Debug, Clone)]
pub struct DroppedMessage {
    pub reason: DropReason,
    pub raw: Bytes,
}
