//! The pub/sub broker: connection registry plus room fan-out.

use crate::connection::{create_connection, Connection, ConnectionId, ConnectionReceiver};
use crate::error::RealtimeError;
use crate::event::{ticket_room, TicketEvent};
use crate::room::{RoomId, RoomRegistry};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Maximum number of concurrent connections.
pub const MAX_CONNECTIONS: usize = 10000;

/// The pub/sub core.
///
/// Owns the connection handles and the room membership, and performs the
/// fan-out when an event is published. Callers (the ticket service) publish
/// synchronously after persistence has succeeded; the asynchronous push to
/// the actual socket happens behind each connection's channel and is not
/// part of this control flow.
#[derive(Debug, Default)]
pub struct Broker {
    /// Connected clients indexed by id.
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    /// Room membership (ids only).
    rooms: RoomRegistry,
    /// Per-room fan-out locks. One publish to a room runs to completion
    /// before the next starts, so subscribers observe publishes in order.
    /// Entries are released together with the room: once a room has no
    /// members there is nothing left to order.
    fanout_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    /// Statistics.
    stats: RwLock<BrokerStats>,
}

impl Broker {
    /// Creates a new broker with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its push receiver.
    pub fn connect(&self) -> Result<(Arc<Connection>, ConnectionReceiver), RealtimeError> {
        if self.connections.read().len() >= MAX_CONNECTIONS {
            return Err(RealtimeError::ConnectionLimit(MAX_CONNECTIONS));
        }

        let connection_id = uuid::Uuid::new_v4().to_string();
        let (connection, receiver) = create_connection(connection_id.clone());

        self.connections
            .write()
            .insert(connection_id.clone(), connection.clone());
        self.stats.write().total_connections += 1;

        info!(connection_id = %connection_id, "Client connected");

        Ok((connection, receiver))
    }

    /// Removes a connection and drops it from every room.
    ///
    /// Safe to call at any time, including while a publish to this
    /// connection is in flight: fan-out re-checks the connection table, so
    /// no delivery is attempted once removal completes.
    pub fn disconnect(&self, connection_id: &str) {
        if self.connections.write().remove(connection_id).is_some() {
            let emptied = self.rooms.drop_connection(connection_id);
            if !emptied.is_empty() {
                let mut locks = self.fanout_locks.lock();
                for room in &emptied {
                    locks.remove(room);
                }
            }
            info!(connection_id = %connection_id, "Client disconnected");
        }
    }

    /// Subscribes a connection to a ticket's room. Idempotent.
    pub fn join(&self, connection_id: &str, ticket_id: &str) -> bool {
        let joined = self.rooms.subscribe(&ticket_room(ticket_id), connection_id);
        if joined {
            self.stats.write().total_joins += 1;
            debug!(connection_id = %connection_id, ticket_id = %ticket_id, "Joined ticket room");
        }
        joined
    }

    /// Unsubscribes a connection from a ticket's room.
    pub fn leave(&self, connection_id: &str, ticket_id: &str) -> bool {
        let room = ticket_room(ticket_id);
        let left = self.rooms.unsubscribe(&room, connection_id);
        if left {
            if self.rooms.subscribers_of(&room).is_empty() {
                self.fanout_locks.lock().remove(&room);
            }
            debug!(connection_id = %connection_id, ticket_id = %ticket_id, "Left ticket room");
        }
        left
    }

    /// Publishes an event to every member of `room`, except
    /// `exclude` if given (used so a typing sender gets no echo).
    ///
    /// Delivery is fire-and-forget: a dead connection is counted and
    /// skipped, never surfaced to the caller. Returns the number of
    /// connections the event was handed to.
    pub fn publish(&self, room: &str, event: &TicketEvent, exclude: Option<&str>) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(room = %room, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        // Serialize publishes per room: snapshot and all delivery attempts
        // happen under the room's fan-out lock.
        let lock = self.fanout_lock(room);
        let _guard = lock.lock();

        let targets = self.rooms.subscribers_of(room);
        let mut delivered = 0;
        let mut failed = 0;

        let connections = self.connections.read();
        for connection_id in &targets {
            if exclude.is_some_and(|ex| ex == connection_id) {
                continue;
            }
            // A connection dropped after the snapshot is simply gone from
            // the table; skip it.
            let Some(connection) = connections.get(connection_id) else {
                continue;
            };
            match connection.send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!(connection_id = %connection_id, room = %room, "Delivery failed, channel closed");
                    failed += 1;
                }
            }
        }
        drop(connections);

        // Publishing to a memberless room must not leave a lock entry
        // behind (typing indicators may target tickets nobody is viewing).
        if targets.is_empty() {
            self.fanout_locks.lock().remove(room);
        }

        let mut stats = self.stats.write();
        stats.events_published += 1;
        stats.delivery_failures += failed;
        drop(stats);

        debug!(
            room = %room,
            event = event.kind(),
            recipients = delivered,
            "Event published"
        );

        delivered
    }

    /// Handles a room control command from a client and returns the reply.
    ///
    /// Typing is not handled here: it carries the caller's identity, so the
    /// gateway routes it through the ticket service instead.
    pub fn handle_command(&self, connection: &Connection, command: ClientCommand) -> ServerMessage {
        match command {
            ClientCommand::Join { ticket_id } => {
                self.join(&connection.id, &ticket_id);
                ServerMessage::Joined { ticket_id }
            }
            ClientCommand::Leave { ticket_id } => {
                self.leave(&connection.id, &ticket_id);
                ServerMessage::Left { ticket_id }
            }
            ClientCommand::Typing { .. } => ServerMessage::Error {
                message: "typing must be sent over an authenticated session".to_string(),
            },
            ClientCommand::Ping => ServerMessage::Pong,
        }
    }

    /// Looks up a connection by id.
    pub fn get_connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.read().get(connection_id).cloned()
    }

    /// Current number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Number of members in a ticket's room.
    pub fn room_size(&self, ticket_id: &str) -> usize {
        self.rooms.subscribers_of(&ticket_room(ticket_id)).len()
    }

    /// Broker statistics.
    pub fn stats(&self) -> BrokerStats {
        let mut stats = self.stats.read().clone();
        stats.current_connections = self.connection_count();
        stats.active_rooms = self.rooms.room_count();
        stats
    }

    fn fanout_lock(&self, room: &str) -> Arc<Mutex<()>> {
        self.fanout_locks
            .lock()
            .entry(room.to_string())
            .or_default()
            .clone()
    }
}

/// Commands that clients send over the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe to a ticket's room.
    Join { ticket_id: String },
    /// Unsubscribe from a ticket's room.
    Leave { ticket_id: String },
    /// Announce typing to everyone else in the room.
    Typing { ticket_id: String },
    /// Ping for keepalive.
    Ping,
}

/// Messages sent from server to client (other than room events).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Room subscription confirmed.
    Joined { ticket_id: String },
    /// Room unsubscription confirmed.
    Left { ticket_id: String },
    /// Pong response to ping.
    Pong,
    /// Error message.
    Error { message: String },
}

/// Broker statistics.
#[derive(Debug, Clone, Default)]
pub struct BrokerStats {
    /// Current number of connections.
    pub current_connections: usize,
    /// Rooms with at least one member.
    pub active_rooms: usize,
    /// Total connections since start.
    pub total_connections: u64,
    /// Total room joins since start.
    pub total_joins: u64,
    /// Total events published since start.
    pub events_published: u64,
    /// Deliveries that hit a closed connection.
    pub delivery_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpline_types::TicketStatus;

    fn typing_event(ticket_id: &str) -> TicketEvent {
        TicketEvent::Typing {
            ticket_id: ticket_id.to_string(),
            user_id: "u1".to_string(),
            user_name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_disconnect() {
        let broker = Broker::new();
        let (conn, _rx) = broker.connect().unwrap();
        assert!(!conn.id.is_empty());
        assert_eq!(broker.connection_count(), 1);

        broker.disconnect(&conn.id);
        assert_eq!(broker.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let broker = Broker::new();
        let (conn, _rx) = broker.connect().unwrap();

        assert!(broker.join(&conn.id, "t1"));
        assert!(!broker.join(&conn.id, "t1"));
        assert_eq!(broker.room_size("t1"), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_room_members_only() {
        let broker = Broker::new();
        let (c1, mut rx1) = broker.connect().unwrap();
        let (c2, mut rx2) = broker.connect().unwrap();

        broker.join(&c1.id, "t1");
        broker.join(&c2.id, "t2");

        let delivered = broker.publish(&ticket_room("t1"), &typing_event("t1"), None);
        assert_eq!(delivered, 1);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_with_exclusion() {
        let broker = Broker::new();
        let (c1, mut rx1) = broker.connect().unwrap();
        let (c2, mut rx2) = broker.connect().unwrap();

        broker.join(&c1.id, "t1");
        broker.join(&c2.id, "t1");

        broker.publish(&ticket_room("t1"), &typing_event("t1"), Some(&c1.id));

        // Sender gets no echo, the other member does.
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_no_delivery_after_disconnect() {
        let broker = Broker::new();
        let (c1, mut rx1) = broker.connect().unwrap();
        let (c2, mut rx2) = broker.connect().unwrap();

        broker.join(&c1.id, "t1");
        broker.join(&c2.id, "t1");

        broker.disconnect(&c1.id);

        let delivered = broker.publish(&ticket_room("t1"), &typing_event("t1"), None);
        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_dead_connection_does_not_abort_fanout() {
        let broker = Broker::new();
        let (c1, rx1) = broker.connect().unwrap();
        let (c2, mut rx2) = broker.connect().unwrap();

        broker.join(&c1.id, "t1");
        broker.join(&c2.id, "t1");

        // Client went away without a clean disconnect.
        drop(rx1);

        broker.publish(&ticket_room("t1"), &typing_event("t1"), None);

        assert!(rx2.try_recv().is_ok());
        assert_eq!(broker.stats().delivery_failures, 1);
    }

    #[tokio::test]
    async fn test_sequential_publishes_arrive_in_order() {
        let broker = Broker::new();
        let (conn, mut rx) = broker.connect().unwrap();
        broker.join(&conn.id, "t1");

        let e1 = TicketEvent::StatusChanged {
            ticket_id: "t1".to_string(),
            status: TicketStatus::InProgress,
            updated_by: "Admin".to_string(),
        };
        let e2 = TicketEvent::StatusChanged {
            ticket_id: "t1".to_string(),
            status: TicketStatus::Closed,
            updated_by: "Admin".to_string(),
        };

        broker.publish(&ticket_room("t1"), &e1, None);
        broker.publish(&ticket_room("t1"), &e2, None);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(first.contains("in_progress"));
        assert!(second.contains("closed"));
    }

    #[tokio::test]
    async fn test_publish_to_empty_room() {
        let broker = Broker::new();
        assert_eq!(broker.publish(&ticket_room("t1"), &typing_event("t1"), None), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let broker = Broker::new();
        let (conn, _rx) = broker.connect().unwrap();
        broker.join(&conn.id, "t1");
        broker.publish(&ticket_room("t1"), &typing_event("t1"), None);

        let stats = broker.stats();
        assert_eq!(stats.current_connections, 1);
        assert_eq!(stats.active_rooms, 1);
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.total_joins, 1);
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.delivery_failures, 0);
    }

    #[tokio::test]
    async fn test_concurrent_publishes_keep_per_room_order() {
        use std::sync::Arc;

        let broker = Arc::new(Broker::new());
        let (conn, mut rx) = broker.connect().unwrap();
        broker.join(&conn.id, "t1");

        let mut handles = Vec::new();
        for writer in 0..4u64 {
            let broker = Arc::clone(&broker);
            handles.push(std::thread::spawn(move || {
                for i in 0..25u64 {
                    let event = TicketEvent::Typing {
                        ticket_id: "t1".to_string(),
                        user_id: format!("w{writer}"),
                        user_name: format!("{}", writer * 100 + i),
                    };
                    broker.publish(&ticket_room("t1"), &event, None);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every publish completed its fan-out under the room lock, so all
        // 100 events arrived and each writer's events are in order.
        let mut per_writer: std::collections::HashMap<String, Vec<u64>> = Default::default();
        let mut total = 0;
        while let Ok(payload) = rx.try_recv() {
            let event: TicketEvent = serde_json::from_str(&payload).unwrap();
            if let TicketEvent::Typing {
                user_id, user_name, ..
            } = event
            {
                per_writer
                    .entry(user_id)
                    .or_default()
                    .push(user_name.parse().unwrap());
            }
            total += 1;
        }
        assert_eq!(total, 100);
        for (_, seen) in per_writer {
            let mut sorted = seen.clone();
            sorted.sort_unstable();
            assert_eq!(seen, sorted);
        }
    }

    #[tokio::test]
    async fn test_fanout_locks_released_with_empty_rooms() {
        let broker = Broker::new();

        // A publish to a room nobody joined leaves no lock behind.
        broker.publish(&ticket_room("t1"), &typing_event("t1"), None);
        assert!(broker.fanout_locks.lock().is_empty());

        let (conn, _rx) = broker.connect().unwrap();
        broker.join(&conn.id, "t1");
        broker.publish(&ticket_room("t1"), &typing_event("t1"), None);
        assert_eq!(broker.fanout_locks.lock().len(), 1);

        // Leaving the last member releases the room's lock.
        broker.leave(&conn.id, "t1");
        assert!(broker.fanout_locks.lock().is_empty());

        // So does disconnecting it.
        broker.join(&conn.id, "t2");
        broker.publish(&ticket_room("t2"), &typing_event("t2"), None);
        assert_eq!(broker.fanout_locks.lock().len(), 1);
        broker.disconnect(&conn.id);
        assert!(broker.fanout_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_handle_command() {
        let broker = Broker::new();
        let (conn, _rx) = broker.connect().unwrap();

        let reply = broker.handle_command(
            &conn,
            ClientCommand::Join {
                ticket_id: "t1".to_string(),
            },
        );
        assert!(matches!(reply, ServerMessage::Joined { .. }));
        assert_eq!(broker.room_size("t1"), 1);

        let reply = broker.handle_command(
            &conn,
            ClientCommand::Leave {
                ticket_id: "t1".to_string(),
            },
        );
        assert!(matches!(reply, ServerMessage::Left { .. }));
        assert_eq!(broker.room_size("t1"), 0);

        let reply = broker.handle_command(&conn, ClientCommand::Ping);
        assert!(matches!(reply, ServerMessage::Pong));
    }

    #[test]
    fn test_client_command_serialization() {
        let cmd = ClientCommand::Join {
            ticket_id: "t1".to_string(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("join"));
        assert!(json.contains("t1"));

        let parsed: ClientCommand = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, ClientCommand::Join { .. }));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Joined {
            ticket_id: "t1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("joined"));

        let pong = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert!(pong.contains("pong"));
    }
}
