//! Connection push handles.

use crate::error::RealtimeError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unique identifier for a connected client.
pub type ConnectionId = String;

/// A connected live-update client.
///
/// The broker only ever holds this lightweight handle; the actual transport
/// (the WebSocket session) is owned by the gateway, which drains the paired
/// [`ConnectionReceiver`] and writes to the socket.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Channel for pushing serialized events to this connection.
    sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Creates a new connection with a message sender.
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<String>) -> Self {
        Self { id, sender }
    }

    /// Pushes a serialized payload to this connection.
    ///
    /// Never blocks; fails only when the receiving side is gone.
    pub fn send(&self, payload: String) -> Result<(), RealtimeError> {
        self.sender
            .send(payload)
            .map_err(|_| RealtimeError::ChannelClosed)
    }
}

/// Handle for receiving payloads from the broker to write to the transport.
pub type ConnectionReceiver = mpsc::UnboundedReceiver<String>;

/// Creates a new connection with its paired receiver.
pub fn create_connection(id: ConnectionId) -> (Arc<Connection>, ConnectionReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let connection = Arc::new(Connection::new(id, sender));
    (connection, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_send() {
        let (conn, mut rx) = create_connection("c1".to_string());
        assert_eq!(conn.id, "c1");

        conn.send("hello".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (conn, rx) = create_connection("c1".to_string());
        drop(rx);

        assert!(matches!(
            conn.send("hello".to_string()),
            Err(RealtimeError::ChannelClosed)
        ));
    }
}
