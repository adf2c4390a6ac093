//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database, document storage and email worker
//! - Starts the HTTP server with graceful shutdown support

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rentmycam::config::Config;
use rentmycam::database::{init_db, AppState};
use rentmycam::dispatch::{spawn_dispatcher, BrevoMailer, LogMailer, Mailer};
use rentmycam::route::create_app;
use rentmycam::storage::{CloudinaryStorage, LocalDiskStorage, ObjectStorage};

/// Upper bound for any outbound call to Cloudinary or Brevo
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rentmycam=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = init_db(&config.database_url)
        .with_context(|| format!("Failed to initialize database at {}", config.database_url))?;

    let http = reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let storage: Arc<dyn ObjectStorage> = match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(cloud = %cloudinary.cloud_name, "Storing uploads on Cloudinary");
            Arc::new(CloudinaryStorage::new(http.clone(), cloudinary.clone()))
        }
        None => {
            tracing::warn!(dir = %config.upload_dir, "Cloudinary not configured; storing uploads on local disk");
            Arc::new(LocalDiskStorage::new(&config.upload_dir, &config.public_base_url))
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.brevo_api_key {
        Some(api_key) => Arc::new(BrevoMailer::new(http, api_key.clone())),
        None => {
            tracing::warn!("BREVO_API_KEY not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (notifications, dispatcher) = spawn_dispatcher(mailer);

    let port = config.port;
    let db_path = config.database_url.clone();
    let state = AppState::new(db, config, storage, notifications);

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(address = %addr, database = %db_path, "🚀 Server running");

    // The router (and with it every queue handle) is dropped when serve
    // returns, which lets the dispatcher drain and exit.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(err) = dispatcher.await {
        tracing::error!(error = %err, "Notification worker crashed");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Open connections are allowed to complete before the server stops.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Shutdown signal received, stopping server");
}
