//! Registry proxy
//!
//! A reverse proxy whose routing table is filled at runtime by peers
//! announcing themselves, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  REGISTRY PROXY                  │
//!                     │                                                  │
//!  Client Request     │  ┌────────┐   ┌──────────┐   ┌───────────────┐   │
//!  ───────────────────┼─▶│  http  │──▶│  admin   │──▶│   registry    │   │
//!                     │  │ server │   │ endpoint │   │ (path index)  │   │
//!                     │  └───┬────┘   └──────────┘   └───────▲───────┘   │
//!                     │      │                               │           │
//!                     │      ▼                               │           │
//!  Client Response    │  ┌─────────┐                         │           │
//!  ◀──────────────────┼──│ forward │──────────────▶ upstream │           │
//!                     │  └─────────┘                         │           │
//!                     │                                      │           │
//!  Peer registry ◀────┼── presence notifier (heartbeat) ─────┘           │
//!                     │                                                  │
//!                     │  config (+ watcher) · observability · lifecycle  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use registry_proxy::config::{load_config, ConfigWatcher, ProxyConfig};
use registry_proxy::lifecycle::{signals, Shutdown};
use registry_proxy::observability::{logging, metrics};
use registry_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "registry-proxy", version, about = "Registry-driven reverse proxy")]
struct Args {
    /// Path to the TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("registry-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path_base = %config.listener.path_base,
        static_proxies = config.proxies.len(),
        peers = config.presence.peers.len(),
        "Configuration loaded"
    );

    // Hot reload; the watcher must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
