//! Ticket chat orchestration: validate, persist, then publish.

use std::sync::Arc;

use helpline_realtime::{ticket_room, Broker, TicketEvent};
use helpline_types::{Identity, Ticket, TicketMessage, TicketStatus};
use tracing::{debug, info};

use crate::{Result, TicketError, TicketStore};

/// Placeholder content for a ticket opened without an initial message.
pub const DEFAULT_OPENING_MESSAGE: &str = "Ticket created.";

/// Orchestrates ticket actions.
///
/// Every mutating operation follows the same shape: validate the action
/// against the store, write the log, and only then hand the resulting
/// event to the broker. A failed persist therefore never produces a live
/// event, and a failed live delivery never affects the persisted result.
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    broker: Arc<Broker>,
}

/// A ticket annotated with metadata computed from its message log.
#[derive(Debug, Clone)]
pub struct TicketSummary {
    pub ticket: Ticket,
    /// Number of messages in the log.
    pub message_count: usize,
    /// Timestamp of the newest message, or the ticket's `updated_at` when
    /// the log is empty.
    pub last_activity: u64,
}

impl TicketService {
    /// Creates a service over the given store and broker.
    pub fn new(store: Arc<dyn TicketStore>, broker: Arc<Broker>) -> Self {
        Self { store, broker }
    }

    /// Opens a new ticket with its initial message.
    ///
    /// When no initial message text is given, a placeholder is appended so
    /// the log is never empty. Publishes nothing: a brand-new ticket cannot
    /// have room subscribers yet.
    pub fn open_ticket(
        &self,
        user_id: &str,
        title: &str,
        category: Option<&str>,
        initial_message: Option<&str>,
    ) -> Result<Ticket> {
        let ticket = self.store.create_ticket(user_id, title, category)?;

        let content = initial_message
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_OPENING_MESSAGE);
        self.store.create_message(&ticket.id, user_id, content)?;

        info!(ticket_id = %ticket.id, user_id = %user_id, "Ticket opened");
        self.store.get_ticket(&ticket.id)
    }

    /// Appends a chat message and fans it out to the ticket's room.
    ///
    /// The author must be the ticket owner or an admin. No connection is
    /// excluded from the fan-out: the sender's other open tabs should see
    /// the message through the live channel too.
    pub fn post_message(
        &self,
        ticket_id: &str,
        author: &Identity,
        content: &str,
    ) -> Result<TicketMessage> {
        let ticket = self.store.get_ticket(ticket_id)?;
        Self::authorize(&ticket, author)?;

        let message = self.store.create_message(ticket_id, &author.user_id, content)?;

        let event = TicketEvent::new_message(&message, &author.display_name);
        self.broker.publish(&ticket_room(ticket_id), &event, None);

        Ok(message)
    }

    /// Sets a ticket's status and notifies the room.
    ///
    /// Admin-only by contract; the gateway enforces that before calling.
    pub fn change_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        changed_by_name: &str,
    ) -> Result<Ticket> {
        let ticket = self.store.update_status(ticket_id, status)?;

        let event = TicketEvent::StatusChanged {
            ticket_id: ticket_id.to_string(),
            status,
            updated_by: changed_by_name.to_string(),
        };
        self.broker.publish(&ticket_room(ticket_id), &event, None);

        info!(ticket_id = %ticket_id, status = %status, "Ticket status changed");
        Ok(ticket)
    }

    /// Broadcasts a typing indicator to everyone else in the room.
    ///
    /// Ephemeral: nothing is persisted and no ticket lookup is made; a
    /// room for a nonexistent ticket simply has no subscribers. The origin
    /// connection is excluded so the sender gets no echo.
    pub fn broadcast_typing(
        &self,
        ticket_id: &str,
        user_id: &str,
        user_name: &str,
        origin_connection_id: &str,
    ) {
        let event = TicketEvent::Typing {
            ticket_id: ticket_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        };
        let delivered =
            self.broker
                .publish(&ticket_room(ticket_id), &event, Some(origin_connection_id));
        debug!(ticket_id = %ticket_id, recipients = delivered, "Typing broadcast");
    }

    /// Assigns a ticket to an admin.
    ///
    /// Persists only; the live clients have no wire event for assignment,
    /// so none is published.
    pub fn assign_ticket(&self, ticket_id: &str, admin_user_id: &str) -> Result<Ticket> {
        let ticket = self.store.assign(ticket_id, admin_user_id)?;
        info!(ticket_id = %ticket_id, admin_user_id = %admin_user_id, "Ticket assigned");
        Ok(ticket)
    }

    /// Returns a ticket and its ordered message log, for the owner or an
    /// admin.
    pub fn ticket_view(
        &self,
        ticket_id: &str,
        viewer: &Identity,
    ) -> Result<(Ticket, Vec<TicketMessage>)> {
        let ticket = self.store.get_ticket(ticket_id)?;
        Self::authorize(&ticket, viewer)?;
        let messages = self.store.list_messages(ticket_id);
        Ok((ticket, messages))
    }

    /// Lists the caller's tickets with computed metadata.
    pub fn tickets_for_user(&self, user_id: &str) -> Vec<TicketSummary> {
        self.store
            .list_tickets_for_user(user_id)
            .into_iter()
            .map(|t| self.summarize(t))
            .collect()
    }

    /// Lists every ticket with computed metadata (admin views).
    pub fn all_tickets(&self) -> Vec<TicketSummary> {
        self.store
            .list_all_tickets()
            .into_iter()
            .map(|t| self.summarize(t))
            .collect()
    }

    fn summarize(&self, ticket: Ticket) -> TicketSummary {
        let messages = self.store.list_messages(&ticket.id);
        let last_activity = messages
            .last()
            .map(|m| m.created_at)
            .unwrap_or(ticket.updated_at);
        TicketSummary {
            message_count: messages.len(),
            last_activity,
            ticket,
        }
    }

    fn authorize(ticket: &Ticket, identity: &Identity) -> Result<()> {
        if ticket.is_owned_by(&identity.user_id) || identity.is_admin {
            Ok(())
        } else {
            Err(TicketError::Forbidden(
                "not the ticket owner or an admin".to_string(),
            ))
        }
    }
}
