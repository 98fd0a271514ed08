use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

use protoo_core::protocol::{to_raw, Message, Notification};

use crate::config::PeerConfig;
use crate::peer::{Peer, PeerEvents};
use crate::transport::{Connection, WebSocketTransport};

#[derive(Default)]
struct RoomState {
    peers: HashMap<String, Peer>,
    // Set by `close`.
    closed: bool,
    // Set when the last member leaves through the registry.
    retired: bool,
}

/// A set of peers keyed by peer id, with all-but-sender broadcast.
///
/// Every operation takes the same lock, held for the whole of bulk
/// operations (`map`, `notify`, `close`). Closures passed to `map` must not
/// call back into the room and must not block.
pub struct Room {
    id: String,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(RoomState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Build a peer over `transport`. The peer is not added to the room.
    pub fn create_peer<C: Connection>(
        &self,
        peer_id: impl Into<String>,
        transport: WebSocketTransport<C>,
        cfg: PeerConfig,
    ) -> (Peer, PeerEvents) {
        Peer::new(peer_id, transport, cfg)
    }

    /// Insert `peer`, replacing (and returning) any member with the same id.
    pub async fn add_peer(&self, peer: Peer) -> Option<Peer> {
        let mut g = self.state.lock().await;
        g.peers.insert(peer.id().to_owned(), peer)
    }

    pub async fn remove_peer(&self, peer_id: &str) -> Option<Peer> {
        let mut g = self.state.lock().await;
        g.peers.remove(peer_id)
    }

    pub async fn get_peer(&self, peer_id: &str) -> Option<Peer> {
        let g = self.state.lock().await;
        g.peers.get(peer_id).cloned()
    }

    pub async fn has_peer(&self, peer_id: &str) -> bool {
        let g = self.state.lock().await;
        g.peers.contains_key(peer_id)
    }

    /// Apply `f` to every member while holding the lock.
    pub async fn map<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Peer),
    {
        let g = self.state.lock().await;
        for (id, peer) in g.peers.iter() {
            f(id, peer);
        }
    }

    pub async fn peer_ids(&self) -> Vec<String> {
        let g = self.state.lock().await;
        g.peers.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.peers.is_empty()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// True once the registry has dropped this room for being empty.
    pub async fn is_retired(&self) -> bool {
        self.state.lock().await.retired
    }

    /// Send a notification to every member except `from`.
    ///
    /// The message is encoded once. Members are served one after another
    /// under the lock; a member whose send queue is full delays the rest.
    pub async fn notify<T: Serialize + ?Sized>(&self, from: &Peer, method: &str, data: &T) {
        let encoded = to_raw(data).and_then(|data| {
            Message::Notification(Notification {
                method: method.to_owned(),
                data,
            })
            .encode()
        });
        let bytes = match encoded {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(room = %self.id, method, error = %e, "room notification encode failed");
                return;
            }
        };

        let g = self.state.lock().await;
        for (id, peer) in g.peers.iter() {
            if id != from.id() {
                peer.send_encoded(bytes.clone()).await;
            }
        }
    }

    /// Close every member's transport and mark the room closed.
    ///
    /// Members stay in the map.
    pub async fn close(&self) {
        let mut g = self.state.lock().await;
        for (id, peer) in g.peers.iter() {
            tracing::info!(room = %self.id, peer = %id, "closing peer");
            peer.close();
        }
        g.closed = true;
    }

    /// Add `peer` unless the room is closed or retired.
    pub(crate) async fn admit(&self, peer: Peer) -> bool {
        let mut g = self.state.lock().await;
        if g.closed || g.retired {
            return false;
        }
        g.peers.insert(peer.id().to_owned(), peer);
        true
    }

    /// Remove `peer` (unless its id now belongs to a newer peer); if that
    /// empties the room, retire it. Returns whether it was retired.
    pub(crate) async fn leave(&self, peer: &Peer) -> bool {
        let mut g = self.state.lock().await;
        if g.peers.get(peer.id()).is_some_and(|p| Peer::ptr_eq(p, peer)) {
            g.peers.remove(peer.id());
        }
        if g.peers.is_empty() && !g.retired {
            g.retired = true;
            return true;
        }
        false
    }
}
