//! Helpline Node - Ticket system gateway.
//!
//! This is the main entry point for running a Helpline node.

use clap::Parser;
use helpline_node::api::{create_router, AppState};
use helpline_node::config::Config;
use helpline_realtime::Broker;
use helpline_tickets::{MemoryTicketStore, TicketService, TicketStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Helpline Node - Real-time ticket system gateway
#[derive(Parser, Debug)]
#[command(name = "helpline-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    api_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config {
        api_addr: args.api_addr,
        log_level: args.log_level,
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("helpline={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Helpline node");

    let store: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());
    let broker = Arc::new(Broker::new());
    let service = Arc::new(TicketService::new(store, broker.clone()));

    let state = AppState { broker, service };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.api_addr).await?;
    tracing::info!(api_addr = %config.api_addr, "Node is ready");

    axum::serve(listener, router).await?;

    Ok(())
}
