//! Error types for the real-time module.

use thiserror::Error;

/// Errors that can occur in real-time operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection limit reached.
    #[error("connection limit reached: max {0} connections")]
    ConnectionLimit(usize),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection's channel is closed (client went away).
    #[error("channel closed")]
    ChannelClosed,
}
