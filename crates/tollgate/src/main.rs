//! # Tollgate - bot-detection token relay
//!
//! Accepts a client token, asks the siteverify API about it exactly once,
//! and answers with an accept/reject decision (plus a redirect on accept).
//!
//! ## Architecture
//! ```text
//! Client → Tollgate (/verify-token) → siteverify
//!             ↓
//!     ScorePolicy (threshold 0.5)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod policy;
mod ratelimit;
mod routes;
mod state;
mod upstream;

use config::{AppConfig, Environment};
use state::AppState;

/// Tollgate - bot-detection token relay
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/tollgate.toml")]
    config: String,

    /// Siteverify shared secret (overrides config)
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Redirect URL returned to accepted clients (overrides config)
    #[arg(long, env = "REDIRECT_URL")]
    redirect_url: Option<String>,

    /// CORS allowed origin, `*` for any (overrides config)
    #[arg(long, env = "ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,

    /// Bind host (overrides config)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Deployment environment (overrides config)
    #[arg(long, env = "APP_ENV", value_enum)]
    environment: Option<Environment>,

    /// Siteverify endpoint (overrides config)
    #[arg(long, env = "VERIFY_URL")]
    verify_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads the environment
    let dotenv_path = dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("🚦 Starting Tollgate v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("📄 Loaded environment from {}", path.display());
    }

    let config = AppConfig::load(&args.config, &args)?;
    info!(
        environment = ?config.environment,
        verify_url = %config.verify_url,
        redirect_url = %config.redirect_url,
        allowed_origin = %config.allowed_origin,
        "📋 Configuration loaded"
    );

    if !config.has_secret() {
        warn!("SECRET_KEY is not set; every verify request will fail with 500");
    }

    let listen_addr = config.listen_addr();
    let state = AppState::new(config)?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("🚀 Tollgate listening on {}", listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("👋 Tollgate shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => {
            // Keep serving; the process can still be stopped externally
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
