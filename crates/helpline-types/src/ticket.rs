//! Ticket and ticket message types.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::UserId;

/// Unique identifier for a ticket.
pub type TicketId = String;

/// Current Unix timestamp in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Ticket is waiting for a first response.
    Open,
    /// An admin is working on the ticket.
    InProgress,
    /// Ticket is resolved.
    Closed,
}

impl TicketStatus {
    /// Parses a raw status string as sent by clients.
    ///
    /// Returns `None` for anything outside `open`, `in_progress`, `closed`;
    /// the caller decides how to surface that.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::InProgress => write!(f, "in_progress"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

/// A support ticket: one conversation thread with a lifecycle status.
///
/// Tickets are never deleted; the append-only philosophy of the message log
/// extends to the tickets themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket id.
    pub id: TicketId,
    /// Id of the user who opened the ticket.
    pub user_id: UserId,
    /// Short summary of the problem.
    pub title: String,
    /// Optional free-form category label.
    pub category: Option<String>,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Admin the ticket is assigned to, if any.
    pub assigned_to: Option<UserId>,
    /// Unix timestamp when the ticket was created.
    pub created_at: u64,
    /// Unix timestamp of the last mutation (message, status, assignment).
    pub updated_at: u64,
}

impl Ticket {
    /// Creates a new open, unassigned ticket.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        category: Option<String>,
    ) -> Self {
        let now = unix_now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            category,
            status: TicketStatus::Open,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the given user opened this ticket.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Sets the status and bumps `updated_at`.
    pub fn set_status(&mut self, status: TicketStatus) {
        self.status = status;
        self.touch();
    }

    /// Assigns the ticket to an admin and bumps `updated_at`.
    pub fn assign_to(&mut self, admin_user_id: impl Into<String>) {
        self.assigned_to = Some(admin_user_id.into());
        self.touch();
    }

    /// Bumps `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = unix_now();
    }
}

/// One chat message inside a ticket. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketMessage {
    /// Unique message id.
    pub id: String,
    /// Ticket this message belongs to.
    pub ticket_id: TicketId,
    /// Author of the message.
    pub user_id: UserId,
    /// Message text.
    pub content: String,
    /// Unix timestamp when the message was created.
    pub created_at: u64,
    /// Position in the ticket's message log. Timestamps have second
    /// granularity; `seq` breaks ties with insertion order.
    pub seq: u64,
}

impl TicketMessage {
    /// Creates a new message.
    pub fn new(
        id: impl Into<String>,
        ticket_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
        seq: u64,
    ) -> Self {
        Self {
            id: id.into(),
            ticket_id: ticket_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            created_at: unix_now(),
            seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(TicketStatus::parse("open"), Some(TicketStatus::Open));
        assert_eq!(
            TicketStatus::parse("in_progress"),
            Some(TicketStatus::InProgress)
        );
        assert_eq!(TicketStatus::parse("closed"), Some(TicketStatus::Closed));
        assert_eq!(TicketStatus::parse("resolved"), None);
        assert_eq!(TicketStatus::parse(""), None);
    }

    #[test]
    fn test_status_display_roundtrip() {
        for status in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Closed,
        ] {
            assert_eq!(TicketStatus::parse(&status.to_string()), Some(status));
        }
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_new_ticket_defaults() {
        let ticket = Ticket::new("t1", "u1", "Printer broken", None);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.assigned_to.is_none());
        assert_eq!(ticket.created_at, ticket.updated_at);
        assert!(ticket.is_owned_by("u1"));
        assert!(!ticket.is_owned_by("u2"));
    }

    #[test]
    fn test_ticket_mutations_touch() {
        let mut ticket = Ticket::new("t1", "u1", "Printer broken", None);
        ticket.set_status(TicketStatus::InProgress);
        assert_eq!(ticket.status, TicketStatus::InProgress);

        ticket.assign_to("a1");
        assert_eq!(ticket.assigned_to.as_deref(), Some("a1"));
        assert!(ticket.updated_at >= ticket.created_at);
    }
}
