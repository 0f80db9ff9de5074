//! Error types for ticket operations.

use thiserror::Error;

/// Errors that can occur during ticket operations.
///
/// All of these are request-scoped and recoverable; nothing in the ticket
/// core is fatal to the process. Fan-out failures never show up here --
/// live delivery is best-effort and is logged inside the broker.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("ticket not found: {ticket_id}")]
    NotFound { ticket_id: String },

    /// Bad input: empty title/content, invalid status value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is neither the ticket owner nor an admin.
    #[error("forbidden: {0}")]
    Forbidden(String),
}
