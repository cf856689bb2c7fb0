//! Enrollment portal gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 GATEWAY                       │
//!     Browser request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│ gateway  │──▶│ upstream  │──┼──▶ REST API
//!                         │  │ server  │   │ handler  │   │  client   │  │
//!                         │  └─────────┘   └────┬─────┘   └───────────┘  │
//!                         │                     │                        │
//!                         │         body codec · url · classifier        │
//!                         │                                              │
//!                         │  ┌─────────┐   ┌──────────────┐ ┌─────────┐  │
//!                         │  │ session │   │observability │ │lifecycle│  │
//!                         │  └─────────┘   └──────────────┘ └─────────┘  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use portal_gateway::config::load_config;
use portal_gateway::lifecycle::signals::shutdown_on_signal;
use portal_gateway::observability::{logging, metrics};
use portal_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "portal-gateway")]
#[command(about = "Request forwarding gateway for the enrollment portal", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        "portal-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let mut serve = tokio::spawn(server.run(listener, server_shutdown));
    tokio::select! {
        result = &mut serve => {
            result??;
            return Ok(());
        }
        _ = shutdown_on_signal(&shutdown) => {}
    }
    serve.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
