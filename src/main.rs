//! Request monitor demo host.
//!
//! Serves a small axum application with the configured monitoring backend
//! installed on every route.
//!
//! # Startup
//! ```text
//! CLI args → config file (optional) → backend (fatal on failure)
//!     → tokio runtime → listener → HttpServer
//! ```
//!
//! Backend construction fails fast, before any runtime or listener exists.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_monitor::config::{load_config, MonitorConfig};
use request_monitor::http::server::{shutdown_signal, HttpServer};
use request_monitor::selector;

#[derive(Parser)]
#[command(name = "request-monitor")]
#[command(about = "Demo host for the request monitoring layer", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured backend ("tracing", "metrics", anything else disables).
    #[arg(short, long)]
    backend: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_monitor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("request-monitor v{} starting", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.monitoring.backend = backend;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.monitoring.backend,
        service = %config.monitoring.service_name,
        "Configuration loaded"
    );

    let backend = selector::from_config(&config.monitoring);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = TcpListener::bind(&config.listener.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Listening for connections");

        let server = HttpServer::new(config, backend);
        server.run(listener, shutdown_signal()).await?;

        tracing::info!("Shutdown complete");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
