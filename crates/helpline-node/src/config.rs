//! Node configuration types.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the Helpline node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// API listen address.
    pub api_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_addr: "127.0.0.1:8080"
                .parse()
                .expect("default address is valid"),
            log_level: "info".to_string(),
        }
    }
}
