//! # Helpline Real-time
//!
//! Room-based pub/sub for live ticket chat.
//!
//! Every ticket maps to one room (`ticket:{id}`). Clients viewing a ticket
//! join its room; messages, status changes, and typing indicators published
//! to the room are fanned out to every member's connection. Delivery is
//! best-effort: the durable record always lives in the message store, the
//! live push is only an optimization for open browser tabs.
//!
//! ## WebSocket Protocol
//!
//! ### Client -> Server
//!
//! ```json
//! {"type": "join", "ticket_id": "..."}
//! {"type": "leave", "ticket_id": "..."}
//! {"type": "typing", "ticket_id": "..."}
//! {"type": "ping"}
//! ```
//!
//! ### Server -> Client
//!
//! ```json
//! {"type": "joined", "ticket_id": "..."}
//! {"type": "ticket:newMessage", "ticket_id": "...", "id": "...", ...}
//! {"type": "pong"}
//! ```

pub mod broker;
pub mod connection;
pub mod error;
pub mod event;
pub mod room;

pub use broker::{Broker, BrokerStats, ClientCommand, ServerMessage, MAX_CONNECTIONS};
pub use connection::{create_connection, Connection, ConnectionId, ConnectionReceiver};
pub use error::RealtimeError;
pub use event::{ticket_room, TicketEvent, TICKET_ROOM_PREFIX};
pub use room::{RoomId, RoomRegistry};
