//! Randimg Serve - HTTP API server for random wallpaper URLs.
//!
//! This binary loads the image lists and starts the `/api` endpoint.

use axum::http::Request;
use clap::Parser;
use randimg_core::metrics::{init_metrics, start_metrics_server};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use randimg_serve::{AppState, Config, router};

/// Random image URL server.
#[derive(Parser, Debug)]
#[command(name = "randimg-serve")]
#[command(about = "HTTP API server for random wallpaper URLs", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load .env file if it exists
    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    // Initialize metrics
    if let Some(port) = config.metrics_port {
        let handle = init_metrics();
        start_metrics_server(port, handle).await?;
    }

    // Create application state
    let state = AppState::new(config)?;

    // Warm the image cache so the first request doesn't pay for the load
    if let Err(e) = state.library.current().await {
        tracing::warn!(error = %e, "initial image library load failed");
    }

    // Build router with middleware
    let app = router(state).layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                query = request.uri().query().unwrap_or("")
            )
        },
    ));

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting server");

    axum::serve(listener, app).await?;

    Ok(())
}
