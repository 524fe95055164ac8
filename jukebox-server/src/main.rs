//! Jukebox server - Main entry point
//!
//! Binds the request/queue HTTP API over a SQLite database. All secrets
//! and paths come from flags or environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox_server::api::{create_router, AppContext};
use jukebox_server::Config;

/// Command-line arguments for jukebox-server
#[derive(Parser, Debug)]
#[command(name = "jukebox-server")]
#[command(about = "Song request and queue service for live events")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "JUKEBOX_PORT")]
    port: u16,

    /// Path to the SQLite database
    #[arg(short, long, default_value = "jukebox.db", env = "JUKEBOX_DB")]
    db_path: PathBuf,

    /// Operator password for the admin endpoints
    #[arg(long, default_value = "1234", env = "ADMIN_PASSWORD")]
    admin_password: String,

    /// Shared secret expected from kiosk devices
    #[arg(long, default_value = "classical-remix-kiosk", env = "KIOSK_MASTER_KEY")]
    kiosk_secret: String,

    /// Shared secret for payment webhook signatures
    #[arg(long, default_value = "dev-webhook-secret", env = "PAYMENT_WEBHOOK_SECRET")]
    webhook_secret: String,

    /// Credits seeded into a brand-new party state
    #[arg(long, default_value = "10", env = "JUKEBOX_INITIAL_CREDITS")]
    initial_credits: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting jukebox server on port {}", args.port);
    info!("Database: {}", args.db_path.display());

    let db_pool = jukebox_common::db::init_database(&args.db_path)
        .await
        .context("Failed to initialize database")?;
    jukebox_common::db::ensure_party_state(&db_pool, args.initial_credits)
        .await
        .context("Failed to bootstrap party state")?;

    let config = Config {
        db_path: args.db_path,
        bind_addr: format!("0.0.0.0:{}", args.port),
        admin_password: args.admin_password,
        kiosk_secret: args.kiosk_secret,
        webhook_secret: args.webhook_secret,
        initial_credits: args.initial_credits,
    };

    let ctx = AppContext { db_pool, config };
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
