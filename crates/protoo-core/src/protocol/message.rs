//! Message envelopes (JSON, one object per frame).
//!
//! Four shapes, told apart by boolean discriminator fields:
//! - request: `{request:true, id, method, data}`
//! - response: `{response:true, ok:true, id, data}`
//! - response error: `{response:true, ok:false, id, errorCode, errorReason}`
//! - notification: `{notification:true, method, data}`
//!
//! Payloads are kept as `RawValue` so the receiver decides when (and into
//! what) to parse them.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{ProtooError, Result};

/// Correlation key shared by a request and its response.
pub type TransactionId = u32;

#[derive(Debug)]
pub struct Request {
    pub id: TransactionId,
    pub method: String,
    pub data: Box<RawValue>,
}

#[derive(Debug)]
pub struct Response {
    pub id: TransactionId,
    pub data: Box<RawValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub id: TransactionId,
    pub error_code: i32,
    pub error_reason: String,
}

#[derive(Debug)]
pub struct Notification {
    pub method: String,
    pub data: Box<RawValue>,
}

/// Any of the four envelopes.
#[derive(Debug)]
pub enum Message {
    Request(Request),
    Response(Response),
    ResponseError(ResponseError),
    Notification(Notification),
}

// --------------------
// Inbound shapes
// --------------------
#[derive(Debug, Default, Deserialize)]
struct Discriminator {
    #[serde(default)]
    request: bool,
    #[serde(default)]
    response: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    notification: bool,
}

#[derive(Deserialize)]
struct RequestIn {
    id: TransactionId,
    #[serde(default)]
    method: String,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
struct ResponseIn {
    id: TransactionId,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseErrorIn {
    id: TransactionId,
    #[serde(default)]
    error_code: i32,
    #[serde(default)]
    error_reason: String,
}

#[derive(Deserialize)]
struct NotificationIn {
    #[serde(default)]
    method: String,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

// --------------------
// Outbound shapes (borrowed, serialize only)
// --------------------
#[derive(Serialize)]
struct RequestOut<'a> {
    request: bool,
    id: TransactionId,
    method: &'a str,
    data: &'a RawValue,
}

#[derive(Serialize)]
struct ResponseOut<'a> {
    response: bool,
    ok: bool,
    id: TransactionId,
    data: &'a RawValue,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseErrorOut<'a> {
    response: bool,
    ok: bool,
    id: TransactionId,
    #[serde(default)]
    error_code: i32,
    error_reason: &'a str,
}

#[derive(Serialize)]
struct NotificationOut<'a> {
    notification: bool,
    method: &'a str,
    data: &'a RawValue,
}

fn decode_err(e: serde_json::Error) -> ProtooError {
    ProtooError::Decode(e.to_string())
}

/// `data` may be absent or `null`; both normalize to a raw `null`.
fn data_or_null(data: Option<Box<RawValue>>) -> Result<Box<RawValue>> {
    match data {
        Some(raw) => Ok(raw),
        None => RawValue::from_string("null".to_owned()).map_err(decode_err),
    }
}

/// Serialize any value into a raw payload.
pub fn to_raw<T: Serialize + ?Sized>(value: &T) -> Result<Box<RawValue>> {
    serde_json::value::to_raw_value(value).map_err(|e| ProtooError::Encode(e.to_string()))
}

/// Parse a raw payload into a concrete type.
pub fn from_raw<T: DeserializeOwned>(raw: &RawValue) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(decode_err)
}

impl Message {
    /// Decode one frame.
    ///
    /// Only the discriminators are read first; the matching shape is decoded
    /// second. `request` wins over `response`, which wins over `notification`.
    pub fn decode(frame: &[u8]) -> Result<Message> {
        let tag: Discriminator = serde_json::from_slice(frame).map_err(decode_err)?;

        if tag.request {
            let r: RequestIn = serde_json::from_slice(frame).map_err(decode_err)?;
            return Ok(Message::Request(Request {
                id: r.id,
                method: r.method,
                data: data_or_null(r.data)?,
            }));
        }

        if tag.response {
            if tag.ok {
                let r: ResponseIn = serde_json::from_slice(frame).map_err(decode_err)?;
                return Ok(Message::Response(Response {
                    id: r.id,
                    data: data_or_null(r.data)?,
                }));
            }
            let r: ResponseErrorIn = serde_json::from_slice(frame).map_err(decode_err)?;
            return Ok(Message::ResponseError(ResponseError {
                id: r.id,
                error_code: r.error_code,
                error_reason: r.error_reason,
            }));
        }

        if tag.notification {
            let n: NotificationIn = serde_json::from_slice(frame).map_err(decode_err)?;
            return Ok(Message::Notification(Notification {
                method: n.method,
                data: data_or_null(n.data)?,
            }));
        }

        Err(ProtooError::Decode("missing message discriminator".into()))
    }

    /// Encode to a JSON text frame.
    pub fn encode(&self) -> Result<Bytes> {
        let encoded = match self {
            Message::Request(r) => serde_json::to_vec(&RequestOut {
                request: true,
                id: r.id,
                method: &r.method,
                data: &r.data,
            }),
            Message::Response(r) => serde_json::to_vec(&ResponseOut {
                response: true,
                ok: true,
                id: r.id,
                data: &r.data,
            }),
            Message::ResponseError(r) => serde_json::to_vec(&ResponseErrorOut {
                response: true,
                ok: false,
                id: r.id,
                error_code: r.error_code,
                error_reason: &r.error_reason,
            }),
            Message::Notification(n) => serde_json::to_vec(&NotificationOut {
                notification: true,
                method: &n.method,
                data: &n.data,
            }),
        };
        encoded
            .map(Bytes::from)
            .map_err(|e| ProtooError::Encode(e.to_string()))
    }

    /// Short shape name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request(_) => "request",
            Message::Response(_) => "response",
            Message::ResponseError(_) => "response_error",
            Message::Notification(_) => "notification",
        }
    }
}

impl Request {
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T> {
        from_raw(&self.data)
    }
}

impl Response {
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T> {
        from_raw(&self.data)
    }
}

impl Notification {
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T> {
        from_raw(&self.data)
    }
}
