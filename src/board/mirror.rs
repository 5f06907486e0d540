//! Client-side mirror of the board.
//!
//! A client applies its own mutations optimistically, then replaces the whole
//! mirror with every snapshot the relay broadcasts. When the relay rejects a
//! mutation, the mirror rolls back to the last snapshot it received, dropping
//! every optimistic change made since.

use kanban_common::{BoardState, PresenceMap};

use super::store::BoardStore;
use crate::errors::BoardError;
use crate::relay::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Clone, Default)]
pub struct BoardMirror {
    /// What the user sees: last snapshot plus pending optimistic changes.
    local: BoardState,
    /// Last state received from the relay.
    confirmed: BoardState,
    presence: PresenceMap,
    connected: usize,
    pending: usize,
    last_error: Option<String>,
}

impl BoardMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &BoardState {
        &self.local
    }

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    pub fn connected_count(&self) -> usize {
        self.connected
    }

    /// Number of optimistic mutations not yet covered by a snapshot.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply the user's own mutation locally before the relay confirms it.
    ///
    /// The message is returned so the caller can send it on unchanged. A
    /// mutation that cannot apply locally is still sent: the relay is the
    /// authority and will answer with either a snapshot or an error.
    pub fn apply_local(&mut self, msg: ClientMessage) -> ClientMessage {
        if let Err(e) = self.apply_optimistic(&msg) {
            tracing::debug!(error = %e, "Optimistic apply skipped");
        }
        if !matches!(msg, ClientMessage::UserPresenceUpdate(_)) {
            self.pending += 1;
        }
        msg
    }

    /// Fold one relay message into the mirror.
    pub fn apply_server(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::InitialState(state) | ServerMessage::BoardUpdate(state) => {
                self.confirmed = state.clone();
                self.local = state;
                self.pending = 0;
            }
            ServerMessage::UserPresenceUpdate(map) => {
                self.connected = map.len();
                self.presence = map;
            }
            ServerMessage::UserConnected(m) | ServerMessage::UserDisconnected(m) => {
                self.presence = m.connected_users;
                self.connected = m.count;
            }
            ServerMessage::Error(payload) => {
                self.local = self.confirmed.clone();
                self.pending = 0;
                self.last_error = Some(payload.message);
            }
        }
    }

    fn apply_optimistic(&mut self, msg: &ClientMessage) -> Result<(), BoardError> {
        let mut store = BoardStore::from_state(std::mem::take(&mut self.local));
        let result = apply_to_store(&mut store, msg);
        self.local = store.into_state();
        result
    }
}

fn apply_to_store(store: &mut BoardStore, msg: &ClientMessage) -> Result<(), BoardError> {
    match msg {
        ClientMessage::CreateTask(req) => store
            .create_task(&req.column_id, &req.title, req.description.as_deref())
            .map(drop),
        ClientMessage::UpdateTask(req) => store
            .update_task(&req.id, &req.title, req.description.as_deref())
            .map(drop),
        ClientMessage::DeleteTask(req) => store.delete_task(&req.task_id, &req.column_id),
        ClientMessage::CreateColumn(title) => {
            store.create_column(title);
            Ok(())
        }
        ClientMessage::UpdateColumn(req) => store
            .update_column(&req.id, &req.title, req.task_ids.clone())
            .map(drop),
        ClientMessage::DeleteColumn(column_id) => store.delete_column(column_id).map(drop),
        ClientMessage::MoveTask(req) => store.move_task(
            &req.task_id,
            &req.source_column_id,
            &req.dest_column_id,
            req.source_index,
            req.dest_index,
        ),
        ClientMessage::MoveColumn(req) => store.move_column(req.source_index, req.dest_index),
        ClientMessage::UserPresenceUpdate(_) => Ok(()),
    }
}
