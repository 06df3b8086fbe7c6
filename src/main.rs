//! Campaign Engine - authoritative state server for live tabletop sessions
//!
//! The engine:
//! - Holds the canonical session document (catalog plus live players)
//! - Evaluates formulas and runs the combat turn order state machine
//! - Serves clients over WebSocket with snapshot/patch synchronization
//! - Persists the document to a JSON snapshot file

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::ports::outbound::SnapshotStorePort;
use crate::domain::aggregates::GameState;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::persistence::FileStore;
use crate::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Campaign Engine");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  State file: {}", config.state_path.display());
    tracing::info!("  Snapshot interval: {}s", config.snapshot_interval_secs);

    // Load the persisted document
    let store = Arc::new(FileStore::new(config.state_path.clone()));
    let document = store.load().await?;
    tracing::info!(
        "Document loaded: {} sheets, {} players",
        document.catalog.sheets.len(),
        document.players.len()
    );

    let server_port = config.server_port;
    let snapshot_interval = Duration::from_secs(config.snapshot_interval_secs);
    let state = Arc::new(AppState::new(config, GameState::new(document), store));

    // Periodic snapshot worker
    let snapshot_worker = {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(snapshot_interval);
            // the first tick completes immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                let document = state.game.read().await.document.clone();
                if let Err(e) = state.store.save(&document).await {
                    tracing::error!("Periodic snapshot failed: {}", e);
                }
            }
        })
    };

    // Build the router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    snapshot_worker.abort();

    // Final snapshot so nothing since the last interval is lost
    let document = state.game.read().await.document.clone();
    state.store.save(&document).await?;
    tracing::info!("Document persisted, shutting down");

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
