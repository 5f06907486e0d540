//! Shared domain types for the Kanban relay.
//!
//! Everything here is plain data: the board (`Task`, `Column`, `BoardState`)
//! and per-connection presence. Both the relay and any Rust client mirror
//! speak these types on the wire.

pub mod models;
pub mod presence;

pub use models::{BoardState, Column, InvariantViolation, Task};
pub use presence::{ActionKind, PresenceAction, PresenceMap, UserPresence};
