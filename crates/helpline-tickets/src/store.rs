//! The ticket message store: an append-only log of tickets and messages.

use parking_lot::RwLock;
use std::collections::HashMap;

use helpline_types::{Ticket, TicketMessage, TicketStatus};

use crate::{Result, TicketError};

/// Durable storage contract for tickets and their message logs.
///
/// The store is append-only: no operation deletes a ticket or a message,
/// which is the basis for auditability. Backends may be in-memory or
/// durable; the service layer does not care.
pub trait TicketStore: Send + Sync {
    /// Creates a new open, unassigned ticket.
    ///
    /// Fails with [`TicketError::Validation`] if the title is empty after
    /// trimming.
    fn create_ticket(&self, user_id: &str, title: &str, category: Option<&str>) -> Result<Ticket>;

    /// Appends a message to a ticket's log and bumps the ticket's
    /// `updated_at`.
    ///
    /// Fails with [`TicketError::NotFound`] for unknown tickets and
    /// [`TicketError::Validation`] for empty content. The append is atomic
    /// per ticket: concurrent calls never lose a message or hand out a
    /// duplicate sequence number.
    fn create_message(&self, ticket_id: &str, user_id: &str, content: &str)
        -> Result<TicketMessage>;

    /// Looks up a ticket by id.
    fn get_ticket(&self, ticket_id: &str) -> Result<Ticket>;

    /// Returns the ticket's messages in ascending creation order.
    ///
    /// Empty for a ticket without messages; whether the ticket exists at
    /// all is a separate [`get_ticket`](TicketStore::get_ticket) lookup.
    fn list_messages(&self, ticket_id: &str) -> Vec<TicketMessage>;

    /// Lists the tickets opened by a user.
    fn list_tickets_for_user(&self, user_id: &str) -> Vec<Ticket>;

    /// Lists every ticket (admin views).
    fn list_all_tickets(&self) -> Vec<Ticket>;

    /// Sets a ticket's status and bumps `updated_at`.
    fn update_status(&self, ticket_id: &str, status: TicketStatus) -> Result<Ticket>;

    /// Assigns a ticket to an admin and bumps `updated_at`.
    fn assign(&self, ticket_id: &str, admin_user_id: &str) -> Result<Ticket>;
}

/// In-memory ticket store.
///
/// Thread-safe; tickets and message logs live under separate locks, always
/// taken in `tickets` -> `messages` order.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    /// Tickets indexed by id.
    tickets: RwLock<HashMap<String, Ticket>>,
    /// Message logs indexed by ticket id, each in insertion order.
    messages: RwLock<HashMap<String, Vec<TicketMessage>>>,
}

impl MemoryTicketStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(ticket_id: &str) -> TicketError {
        TicketError::NotFound {
            ticket_id: ticket_id.to_string(),
        }
    }
}

impl TicketStore for MemoryTicketStore {
    fn create_ticket(&self, user_id: &str, title: &str, category: Option<&str>) -> Result<Ticket> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TicketError::Validation("title must not be empty".to_string()));
        }
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let ticket = Ticket::new(uuid::Uuid::new_v4().to_string(), user_id, title, category);

        let mut tickets = self.tickets.write();
        let mut messages = self.messages.write();
        messages.insert(ticket.id.clone(), Vec::new());
        tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    fn create_message(
        &self,
        ticket_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<TicketMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TicketError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        // Both locks are held for the whole append so the seq assignment
        // and the updated_at bump are atomic per ticket.
        let mut tickets = self.tickets.write();
        let ticket = tickets
            .get_mut(ticket_id)
            .ok_or_else(|| Self::not_found(ticket_id))?;

        let mut messages = self.messages.write();
        let log = messages.entry(ticket_id.to_string()).or_default();

        let message = TicketMessage::new(
            uuid::Uuid::new_v4().to_string(),
            ticket_id,
            user_id,
            content,
            log.len() as u64,
        );
        log.push(message.clone());
        ticket.touch();

        Ok(message)
    }

    fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.tickets
            .read()
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| Self::not_found(ticket_id))
    }

    fn list_messages(&self, ticket_id: &str) -> Vec<TicketMessage> {
        self.messages
            .read()
            .get(ticket_id)
            .cloned()
            .unwrap_or_default()
    }

    fn list_tickets_for_user(&self, user_id: &str) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .read()
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        tickets
    }

    fn list_all_tickets(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.read().values().cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        tickets
    }

    fn update_status(&self, ticket_id: &str, status: TicketStatus) -> Result<Ticket> {
        let mut tickets = self.tickets.write();
        let ticket = tickets
            .get_mut(ticket_id)
            .ok_or_else(|| Self::not_found(ticket_id))?;
        ticket.set_status(status);
        Ok(ticket.clone())
    }

    fn assign(&self, ticket_id: &str, admin_user_id: &str) -> Result<Ticket> {
        let mut tickets = self.tickets.write();
        let ticket = tickets
            .get_mut(ticket_id)
            .ok_or_else(|| Self::not_found(ticket_id))?;
        ticket.assign_to(admin_user_id);
        Ok(ticket.clone())
    }
}
