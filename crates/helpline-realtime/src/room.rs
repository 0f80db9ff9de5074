//! Room membership tracking.

use crate::connection::ConnectionId;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Identifier of a pub/sub room (`ticket:{id}` for ticket rooms).
pub type RoomId = String;

/// Tracks which connections are subscribed to which rooms.
///
/// Rooms are purely ephemeral: they exist exactly as long as they have
/// members and are rebuilt as clients re-join after a restart. The registry
/// holds connection *ids* only, never the connection handles themselves.
///
/// Both maps live under one lock so a membership mutation is atomic with
/// respect to concurrent [`subscribers_of`](RoomRegistry::subscribers_of)
/// snapshots: a reader sees either the pre- or post-mutation set, never a
/// half-applied one.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    inner: RwLock<Membership>,
}

#[derive(Debug, Default)]
struct Membership {
    /// Room -> members.
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    /// Reverse index: connection -> rooms it joined.
    joined: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Idempotent: returns false if the
    /// connection was already a member.
    pub fn subscribe(&self, room: &str, connection: &str) -> bool {
        let mut inner = self.inner.write();
        let added = inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection.to_string());
        if added {
            inner
                .joined
                .entry(connection.to_string())
                .or_default()
                .insert(room.to_string());
        }
        added
    }

    /// Removes a connection from a room. Removing a non-member is a no-op;
    /// returns whether a membership was actually removed.
    pub fn unsubscribe(&self, room: &str, connection: &str) -> bool {
        let mut inner = self.inner.write();
        let removed = match inner.rooms.get_mut(room) {
            Some(members) => members.remove(connection),
            None => false,
        };
        if removed {
            if inner.rooms.get(room).is_some_and(HashSet::is_empty) {
                inner.rooms.remove(room);
            }
            if let Some(rooms) = inner.joined.get_mut(connection) {
                rooms.remove(room);
                if rooms.is_empty() {
                    inner.joined.remove(connection);
                }
            }
        }
        removed
    }

    /// Returns a snapshot of the room's members. Empty for unknown rooms.
    ///
    /// Fan-out iterates over this owned snapshot, so a disconnect racing a
    /// publish can never corrupt the iteration.
    pub fn subscribers_of(&self, room: &str) -> Vec<ConnectionId> {
        self.inner
            .read()
            .rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the connection from every room it belongs to.
    ///
    /// Called when a connection terminates. After this returns, no room
    /// retains the connection id. Returns the rooms the removal left
    /// empty, so the caller can release any per-room state of its own.
    pub fn drop_connection(&self, connection: &str) -> Vec<RoomId> {
        let mut inner = self.inner.write();
        let Some(rooms) = inner.joined.remove(connection) else {
            return Vec::new();
        };
        let mut emptied = Vec::new();
        for room in rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(connection);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                    emptied.push(room);
                }
            }
        }
        emptied
    }

    /// True if the connection is currently a member of the room.
    pub fn is_member(&self, room: &str, connection: &str) -> bool {
        self.inner
            .read()
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(connection))
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.inner.read().rooms.len()
    }
}
