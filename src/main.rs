//! twinserve
//!
//! Serves a directory, pushes change notifications to browsers, and forwards
//! configured path prefixes and ports to backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                      TWINSERVE                        │
//!                    │                                                       │
//!  Browser ──────────┼─▶ http::server ──┬─▶ /events ──────▶ live::sse        │
//!                    │   (shared port)  │                       ▲            │
//!                    │                  │                  live::hub         │
//!                    │                  │                       ▲            │
//!                    │                  │   filesystem ─▶ live::watcher      │
//!                    │                  │                                    │
//!                    │                  ├─▶ /admin/api ─▶ admin ─▶ routing    │
//!                    │                  │                   │   ::RuleStore  │
//!                    │                  │                   ▼                │
//!                    │                  │              net::PortListeners ─┐ │
//!                    │                  │                                  │ │
//!                    │                  ├─▶ prefix rule ─▶ proxy ◀─────────┘ │
//!                    │                  │                    │               │──▶ Backend
//!                    │                  └─▶ otherwise ─▶ http::files         │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use twinserve::config::{load_config, ServerConfig};
use twinserve::lifecycle::{wait_for_signal, Shutdown};
use twinserve::observability::{logging, metrics};
use twinserve::HttpServer;

#[derive(Parser)]
#[command(name = "twinserve")]
#[command(about = "Static file server with live reload and a dynamic reverse proxy", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve and watch (overrides files.root)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Listen address (overrides listener.bind_address); port 0 picks a free port
    #[arg(short, long)]
    bind: Option<String>,

    /// JSON settings document to import at startup (overrides rules_file)
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(root) = args.root {
        config.files.root = root;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(rules) = args.rules {
        config.rules_file = Some(rules);
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "twinserve starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        root = %config.files.root.display(),
        live_reload = config.live_reload.enabled,
        rules = config.rules.len(),
        "Configuration loaded"
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

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                bind_address = %config.listener.bind_address,
                error = %e,
                "Failed to bind listener"
            );
            return Err(e.into());
        }
    };
    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        files = %format!("http://localhost:{}/", local_addr.port()),
        admin = %format!("http://localhost:{}/admin/api/proxies", local_addr.port()),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
