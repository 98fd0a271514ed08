use std::sync::Arc;

use dashmap::DashMap;

use crate::peer::Peer;
use crate::room::Room;

/// Room registry: `room_id -> Room`.
///
/// Rooms are created on first join and retired when their last member
/// leaves.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        let entry = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Room::new(room_id)));
        Arc::clone(entry.value())
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Add `peer` to the room, creating it if needed.
    pub async fn join(&self, room_id: &str, peer: Peer) -> Arc<Room> {
        loop {
            let room = self.get_or_create(room_id);
            if room.admit(peer.clone()).await {
                return room;
            }
            // Closed or retired between lookup and admit; drop the stale entry.
            self.rooms.remove_if(room_id, |_, r| Arc::ptr_eq(r, &room));
        }
    }

    /// Remove `peer` from the room; retire the room if it is now empty.
    pub async fn leave(&self, room_id: &str, peer: &Peer) {
        let Some(room) = self.get(room_id) else { return; };
        if room.leave(peer).await {
            self.rooms.remove_if(room_id, |_, r| Arc::ptr_eq(r, &room));
            tracing::debug!(room = %room_id, "room retired");
        }
    }
}
