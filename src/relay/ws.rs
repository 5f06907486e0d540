use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::api::AppState;
use super::dispatcher::Dispatcher;
use super::protocol::ServerMessage;

/// How often to send WebSocket Ping frames.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
pub const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Liveness timing for one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_interval: PING_INTERVAL,
            pong_timeout: PONG_TIMEOUT,
        }
    }
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client_id = Uuid::new_v4().to_string();
    let dispatcher = state.dispatcher.clone();
    let (mut sender, receiver) = socket.split();

    // Subscribe before announcing the join so this client also receives
    // its own user-connected frame, right after the initial state.
    let (rx, board) = match dispatcher.subscribe() {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(%client_id, error = %e, "Failed to subscribe client");
            return;
        }
    };
    if !send_direct(&mut sender, &ServerMessage::InitialState(board)).await {
        return;
    }
    if let Err(e) = dispatcher.presence().connect(&client_id) {
        warn!(%client_id, error = %e, "Failed to register presence");
        return;
    }
    let connected = dispatcher.presence().count().unwrap_or_default();
    info!(%client_id, connected, "Client connected");

    run_socket_loop(&client_id, &dispatcher, state.keepalive, sender, receiver, rx).await;

    if let Err(e) = dispatcher.presence().disconnect(&client_id) {
        warn!(%client_id, error = %e, "Failed to deregister presence");
    }
    let connected = dispatcher.presence().count().unwrap_or_default();
    info!(%client_id, connected, "Client disconnected");
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Combines broadcast forwarding, client message dispatch, and periodic
/// ping/pong health checking into a single select loop. If no Pong is
/// received within the keepalive's pong timeout after a Ping is sent, the
/// connection is considered dead and the loop exits.
async fn run_socket_loop(
    client_id: &str,
    dispatcher: &Dispatcher,
    keepalive: Keepalive,
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(keepalive.ping_interval);
    // The first tick completes immediately; consume it so the first real
    // ping fires after one full interval.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > keepalive.pong_timeout {
                    debug!(client_id, "Pong timeout, dropping connection");
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Broadcast forwarding ────────────────────────────────
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Every board frame is a full snapshot; the next one catches us up.
                        debug!(client_id, skipped, "Client lagged behind broadcasts");
                        continue;
                    }
                }
            }

            // ── Client frames ───────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = dispatcher.handle_frame(client_id, text.as_str()) {
                            if !send_direct(&mut sender, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary frames and client pings carry nothing for us.
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

async fn send_direct(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match msg.to_frame() {
        Ok(frame) => sender.send(Message::Text(frame.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize reply");
            true
        }
    }
}

// ── Broadcast helper ─────────────────────────────────────────────────

/// Serialize and broadcast a message to all connected WebSocket clients.
/// Returns silently even if no clients are connected.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &ServerMessage) {
    match msg.to_frame() {
        Ok(json) => {
            let _ = tx.send(json); // Ignore error if no receivers
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize broadcast message");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_common::BoardState;

    #[tokio::test]
    async fn test_broadcast_channel_delivers_to_subscribers() {
        let (tx, _) = tokio::sync::broadcast::channel::<String>(16);
        let mut rx1 = tx.subscribe();
        let mut rx2 = tx.subscribe();

        broadcast_message(&tx, &ServerMessage::BoardUpdate(BoardState::default()));

        let received1 = rx1.recv().await.unwrap();
        let received2 = rx2.recv().await.unwrap();

        assert!(received1.contains("\"type\":\"board-update\""));
        assert_eq!(received1, received2);
    }

    #[tokio::test]
    async fn test_broadcast_no_receivers_does_not_panic() {
        let (tx, _) = tokio::sync::broadcast::channel::<String>(16);
        broadcast_message(&tx, &ServerMessage::error("nobody listening"));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_to_latest() {
        let (tx, mut rx) = tokio::sync::broadcast::channel::<String>(2);
        for i in 0..5 {
            let mut state = BoardState::default();
            state.column_order = (0..i).map(|n| format!("c{}", n)).collect();
            broadcast_message(&tx, &ServerMessage::BoardUpdate(state));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"c2\""));
    }

    #[test]
    fn test_keepalive_defaults() {
        let keepalive = Keepalive::default();
        // The pong timeout must exceed the ping interval so a fresh
        // connection is not considered dead on the first tick.
        assert!(keepalive.pong_timeout > keepalive.ping_interval);
        assert_eq!(keepalive.ping_interval, Duration::from_secs(30));
        assert_eq!(keepalive.pong_timeout, Duration::from_secs(60));
    }
}
