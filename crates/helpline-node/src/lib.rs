//! # Helpline Node
//!
//! HTTP and WebSocket gateway for the Helpline ticket system.
//!
//! The node wires the three layers together:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Helpline Node                │
//! ├─────────────────────────────────────────────┤
//! │  HTTP API (axum)                            │
//! │  • Ticket CRUD and chat endpoints           │
//! │  • Identity extraction from auth headers    │
//! │  • WebSocket endpoint for live updates      │
//! ├─────────────────────────────────────────────┤
//! │  TicketService (helpline-tickets)           │
//! │  • validate -> persist -> publish           │
//! ├─────────────────────────────────────────────┤
//! │  Broker (helpline-realtime)                 │
//! │  • room membership and fan-out              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Authentication itself lives in a fronting layer; the node trusts the
//! `x-user-id` / `x-user-name` / `x-user-admin` headers it injects.
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin helpline-node -- --api-addr 127.0.0.1:8080
//! ```

pub mod api;
pub mod config;
pub mod identity;
pub mod realtime_api;
