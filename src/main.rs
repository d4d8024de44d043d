//! Relay service.
//!
//! Receives card requests, relays them to the configured upstream through
//! the instrumented client and exposes the resulting metrics.
//!
//! ```text
//!     Client ──▶ axum router ──▶ TaggedClient ──▶ ReqwestTransport ──▶ Upstream
//!                                     │
//!                                     ├──▶ metrics registry ──▶ GET /metrics
//!                                     └──▶ audit log (tracing, stdout)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use instrumented_http::config::{load_config, ServiceConfig};
use instrumented_http::http::server::serve_metrics;
use instrumented_http::lifecycle::signals::shutdown_on_ctrl_c;
use instrumented_http::observability::{logging, metrics};
use instrumented_http::{HttpServer, InstrumentedClient, Shutdown};

#[derive(Parser)]
#[command(name = "instrumented-http")]
#[command(about = "Relay service with instrumented upstream calls", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("instrumented-http v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.cards_url,
        call_timeout_secs = config.client.call_timeout_secs,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let client = InstrumentedClient::from_config(&config.client)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    if let (Some(address), Some(handle)) =
        (&config.observability.metrics_address, metrics_handle.clone())
    {
        let metrics_listener = TcpListener::bind(address).await?;
        let metrics_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(metrics_listener, handle, metrics_shutdown).await {
                tracing::error!(error = %e, "Metrics listener failed");
            }
        });
    }
    tokio::spawn(async move {
        shutdown_on_ctrl_c(&shutdown).await;
    });

    let server = HttpServer::new(config, client, metrics_handle);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
