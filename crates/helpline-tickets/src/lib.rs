//! Ticket storage and chat orchestration for Helpline.
//!
//! This crate provides the durable side of the ticket chat feature: the
//! append-only message log behind the [`TicketStore`] trait, an in-memory
//! backend, and the [`TicketService`] that validates actions, writes the
//! log, and then hands the resulting event to the real-time broker.

mod error;
mod service;
mod store;

pub use error::TicketError;
pub use service::{TicketService, TicketSummary, DEFAULT_OPENING_MESSAGE};
pub use store::{MemoryTicketStore, TicketStore};

/// Result type for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;
