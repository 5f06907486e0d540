use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::api::{self, AppState, SharedState};
use super::dispatcher::Dispatcher;
use super::presence::PresenceTracker;
use super::ws;
use crate::board::{BoardStore, StoreHandle, seed::demo_board};
use crate::config::RelayConfig;

/// Build the shared state for a fresh relay.
pub fn build_state(config: &RelayConfig) -> SharedState {
    let (tx, _rx) = broadcast::channel::<String>(config.broadcast.capacity);
    let store = if config.board.seed_demo {
        BoardStore::from_state(demo_board())
    } else {
        BoardStore::new()
    };
    let presence = Arc::new(PresenceTracker::new(tx.clone()));

    Arc::new(AppState {
        dispatcher: Dispatcher::new(StoreHandle::new(store), presence, tx),
        keepalive: config.keepalive(),
    })
}

/// Build the full application router with read API and WebSocket.
pub fn build_router(state: SharedState, dev_mode: bool) -> Router {
    let mut app = api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Start the relay and serve until Ctrl+C.
pub async fn start_server(config: RelayConfig) -> Result<()> {
    config.validate()?;

    let state = build_state(&config);
    let app = build_router(state, config.server.dev_mode);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        %local_addr,
        seed_demo = config.board.seed_demo,
        dev_mode = config.server.dev_mode,
        "Kanban relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
