use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use kanban_common::PresenceMap;
use serde::Serialize;

use super::dispatcher::Dispatcher;
use super::ws::Keepalive;
use crate::errors::RelayError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub keepalive: Keepalive,
}

pub type SharedState = Arc<AppState>;

// ── Response payload types ────────────────────────────────────────────

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: PresenceMap,
    pub count: usize,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    Internal(String),
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/initial-state", get(get_board))
        .route("/api/users", get(get_users))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn get_board(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let board = state.dispatcher.snapshot()?;
    Ok(Json(board))
}

async fn get_users(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.dispatcher.presence().snapshot()?;
    let count = users.len();
    Ok(Json(UsersResponse { users, count }))
}
