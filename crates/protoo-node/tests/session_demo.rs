#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::task::JoinHandle;

use protoo_core::TransportError;
use protoo_node::config::{PeerConfig, TransportConfig};
use protoo_node::peer::{Peer, PeerEvents};
use protoo_node::room::RoomRegistry;
use protoo_node::session::{serve_peer, UNKNOWN_METHOD};
use protoo_node::transport::memory;
use protoo_node::transport::WebSocketTransport;

/// Serve a server-side peer in `room` and hand back the client end.
fn connect(
    rooms: &Arc<RoomRegistry>,
    room: &str,
    id: &str,
) -> (Peer, PeerEvents, JoinHandle<TransportError>) {
    let (a, b) = memory::pair();
    let (server, server_events) = Peer::new(
        id,
        WebSocketTransport::new(a, TransportConfig::default()),
        PeerConfig::default(),
    );
    let (client, client_events) = Peer::new(
        format!("{id}-client"),
        WebSocketTransport::new(b, TransportConfig::default()),
        PeerConfig::default(),
    );

    let rooms = Arc::clone(rooms);
    let room = room.to_owned();
    let task = tokio::spawn(async move { serve_peer(&rooms, &room, server, server_events).await });
    (client, client_events, task)
}

async fn wait_for_members(rooms: &RoomRegistry, room: &str, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(r) = rooms.get(room) {
                if r.len().await == n {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("room never reached the expected size");
}

#[tokio::test]
async fn ping_is_answered_and_unknown_methods_rejected() {
    let rooms = Arc::new(RoomRegistry::new());
    let (client, _events, _task) = connect(&rooms, "r", "a");

    let res = client.request("ping", &()).await.await.unwrap();
    let v: Value = serde_json::from_str(res.get()).unwrap();
    assert_eq!(v, json!({ "pong": true }));

    let err = client.request("teleport", &()).await.await.unwrap_err();
    assert_eq!(err.code, UNKNOWN_METHOD);
    assert_eq!(err.text, "unknown method");
}

#[tokio::test]
async fn notifications_are_relayed_to_the_room() {
    let rooms = Arc::new(RoomRegistry::new());
    let (alice, _ae, alice_task) = connect(&rooms, "r", "alice");
    let (bob, mut be, bob_task) = connect(&rooms, "r", "bob");
    wait_for_members(&rooms, "r", 2).await;

    alice.notify("chat", &json!({ "text": "hi bob" })).await;

    let n = be.notifications.recv().await.unwrap();
    assert_eq!(n.method, "chat");
    let v: Value = n.parse_data().unwrap();
    assert_eq!(v, json!({ "text": "hi bob" }));

    alice.close();
    let reason = alice_task.await.unwrap();
    assert_eq!(reason.code, memory::NORMAL_CLOSURE);
    assert!(rooms.get("r").is_some());

    bob.close();
    bob_task.await.unwrap();
    assert!(rooms.get("r").is_none());
}
