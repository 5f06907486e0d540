//! Relay: real-time fan-out of the shared board.
//!
//! ## Overview
//!
//! Browser clients hold a mirror of the board. Every mutation they make is
//! sent to the relay over a WebSocket, applied to the one canonical store,
//! and the resulting full board is broadcast back to every connected
//! client, which replaces its mirror wholesale.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐ WebSocket ┌─────────────────────────────────────────────────┐
//! │  Client  │ ────────> │  ws.rs  (per-connection select loop, keepalive) │
//! │ (mirror) │ <──────── │    │                                            │
//! └──────────┘           │    │ Dispatcher::handle_frame()                 │
//!                        │    v                                            │
//!                        │  dispatcher.rs ──> board::StoreHandle (mutex)   │
//!                        │    │                  │                         │
//!                        │    │                  └─ board-update broadcast │
//!                        │    v                                            │
//!                        │  presence.rs  (who is connected, doing what)    │
//!                        └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `protocol` | `ClientMessage` / `ServerMessage` tagged enums          |
//! | `api`      | `AppState`, read-only HTTP endpoints                    |
//! | `server`   | router assembly, bind, graceful shutdown                |
//!
//! ## Typical Flow (drag a task to another column)
//!
//! 1. Client applies the move to its mirror, sends `move-task`.
//! 2. `ws::run_socket_loop` hands the frame to `Dispatcher::handle_frame`.
//! 3. The dispatcher locks the store, calls `BoardStore::move_task`, and on
//!    success broadcasts `board-update` before unlocking.
//! 4. The mover's presence becomes `moving <taskId>`; `user-presence-update`
//!    is broadcast.
//! 5. On failure only the sender receives `error`; nothing is broadcast.

pub mod api;
pub mod dispatcher;
pub mod presence;
pub mod protocol;
pub mod server;
pub mod ws;
