//! Common types used throughout Helpline.
//!
//! This crate holds the domain types shared by the storage, real-time, and
//! gateway layers: the authenticated [`Identity`] handed in by the
//! surrounding web server, and the [`Ticket`] / [`TicketMessage`] records
//! owned by the message store.

mod identity;
mod ticket;

pub use identity::{Identity, UserId};
pub use ticket::{unix_now, Ticket, TicketId, TicketMessage, TicketStatus};
