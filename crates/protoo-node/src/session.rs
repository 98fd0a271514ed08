//! Demo session: one WebSocket connection = one peer in one room.
//!
//! - `GET /v1/ws?peer=...&room=...`, subprotocol `protoo`
//! - notifications are re-broadcast to the rest of the room
//! - request `ping` is accepted with `{"pong":true}`; anything else gets 404

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use tracing::Instrument;

use protoo_core::TransportError;

use crate::app_state::AppState;
use crate::client::SUBPROTOCOL;
use crate::peer::{IncomingRequest, Peer, PeerEvents};
use crate::room::{Room, RoomRegistry};
use crate::transport::{AxumConnection, WebSocketTransport};

/// Error code for requests the demo node does not implement.
pub const UNKNOWN_METHOD: i32 = 404;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub peer: String,
    pub room: String,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    // The socket refuses oversized frames before buffering them.
    let max = app.transport_config().max_message_bytes;
    ws.protocols([SUBPROTOCOL])
        .max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| {
            let span = tracing::info_span!("session", peer = %q.peer, room = %q.room);
            run_session(app, q, socket).instrument(span)
        })
}

async fn run_session(app: AppState, q: WsQuery, socket: WebSocket) {
    let transport = WebSocketTransport::new(
        AxumConnection::new(socket),
        app.transport_config().clone(),
    );
    let (peer, events) = Peer::new(q.peer, transport, app.peer_config().clone());
    let reason = serve_peer(&app.rooms(), &q.room, peer, events).await;
    tracing::info!(code = reason.code, text = %reason.text, "session ended");
}

/// Join `room_id`, serve the peer until its transport closes, then leave.
///
/// Returns the close reason.
pub async fn serve_peer(
    rooms: &Arc<RoomRegistry>,
    room_id: &str,
    peer: Peer,
    mut events: PeerEvents,
) -> TransportError {
    let room = rooms.join(room_id, peer.clone()).await;
    tracing::info!(peer = %peer.id(), room = %room_id, "peer joined");

    let reason = loop {
        tokio::select! {
            Some(request) = events.requests.recv() => handle_request(request).await,

            Some(n) = events.notifications.recv() => {
                relay(&room, &peer, &n.method, &n.data).await;
            }

            reason = &mut events.closed => {
                break reason.unwrap_or_else(|_| TransportError::closed());
            }
        }
    };

    rooms.leave(room_id, &peer).await;
    tracing::info!(peer = %peer.id(), room = %room_id, "peer left");
    reason
}

async fn handle_request(request: IncomingRequest) {
    let method = request.method().to_owned();
    let res = match method.as_str() {
        "ping" => request.accept(&json!({ "pong": true })).await,
        _ => request.reject(UNKNOWN_METHOD, "unknown method").await,
    };
    if let Err(e) = res {
        tracing::warn!(%method, error = %e, "response not sent");
    }
}

async fn relay(room: &Room, from: &Peer, method: &str, data: &serde_json::value::RawValue) {
    tracing::trace!(peer = %from.id(), method, "relaying notification");
    room.notify(from, method, data).await;
}
