//! Room event types.

use helpline_types::{TicketMessage, TicketStatus};
use serde::{Deserialize, Serialize};

/// Prefix for ticket room identifiers.
pub const TICKET_ROOM_PREFIX: &str = "ticket:";

/// Room identifier for a ticket.
pub fn ticket_room(ticket_id: &str) -> String {
    format!("{TICKET_ROOM_PREFIX}{ticket_id}")
}

/// An event broadcast to a ticket room.
///
/// Events are transient and never persisted; only the `TicketMessage`
/// behind `NewMessage` is durable, and it is written before the event is
/// emitted. The serde attributes pin the exact wire shape the web clients
/// expect, mixed casing included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TicketEvent {
    /// A chat message was appended to the ticket.
    #[serde(rename = "ticket:newMessage")]
    NewMessage {
        ticket_id: String,
        id: String,
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
        content: String,
        created_at: u64,
    },

    /// An admin changed the ticket's status.
    #[serde(rename = "ticket:statusChange")]
    StatusChanged {
        ticket_id: String,
        status: TicketStatus,
        #[serde(rename = "updatedBy")]
        updated_by: String,
    },

    /// Someone is typing in the ticket's chat.
    #[serde(rename = "ticket:typing")]
    Typing {
        ticket_id: String,
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
}

impl TicketEvent {
    /// Builds a `NewMessage` event from a persisted message and the
    /// author's display name.
    pub fn new_message(message: &TicketMessage, user_name: impl Into<String>) -> Self {
        TicketEvent::NewMessage {
            ticket_id: message.ticket_id.clone(),
            id: message.id.clone(),
            user_id: message.user_id.clone(),
            user_name: user_name.into(),
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }

    /// Ticket the event belongs to.
    pub fn ticket_id(&self) -> &str {
        match self {
            TicketEvent::NewMessage { ticket_id, .. }
            | TicketEvent::StatusChanged { ticket_id, .. }
            | TicketEvent::Typing { ticket_id, .. } => ticket_id,
        }
    }

    /// Room the event should be published to.
    pub fn room(&self) -> String {
        ticket_room(self.ticket_id())
    }

    /// Short event name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TicketEvent::NewMessage { .. } => "new_message",
            TicketEvent::StatusChanged { .. } => "status_change",
            TicketEvent::Typing { .. } => "typing",
        }
    }
}
