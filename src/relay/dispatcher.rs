use std::sync::Arc;

use kanban_common::{BoardState, PresenceAction};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::presence::PresenceTracker;
use super::protocol::{ClientMessage, ServerMessage};
use super::ws::broadcast_message;
use crate::board::{BoardStore, StoreHandle};
use crate::errors::{BoardError, RelayError};

/// The single entry point for state-changing requests.
///
/// A mutation is applied under the store lock and, if it succeeds, the full
/// board is broadcast before the lock is released. Broadcast order therefore
/// always matches mutation order. A refused mutation changes nothing and
/// broadcasts nothing; the caller gets the error back.
#[derive(Clone)]
pub struct Dispatcher {
    store: StoreHandle,
    presence: Arc<PresenceTracker>,
    tx: broadcast::Sender<String>,
}

impl Dispatcher {
    pub fn new(
        store: StoreHandle,
        presence: Arc<PresenceTracker>,
        tx: broadcast::Sender<String>,
    ) -> Self {
        Self { store, presence, tx }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn snapshot(&self) -> Result<BoardState, RelayError> {
        self.store.snapshot()
    }

    /// Subscribe to broadcasts and take the board snapshot atomically.
    ///
    /// No mutation can land between the two, so a new client seeded with the
    /// snapshot misses nothing that follows it.
    pub fn subscribe(&self) -> Result<(broadcast::Receiver<String>, BoardState), RelayError> {
        self.store
            .call(|store| Ok((self.tx.subscribe(), store.state().clone())))
    }

    /// Parse, validate and apply one client text frame.
    ///
    /// Returns the reply meant for the sender only, if any.
    pub fn handle_frame(&self, client_id: &str, text: &str) -> Option<ServerMessage> {
        let result = ClientMessage::parse(text).and_then(|msg| {
            debug!(client_id, event = msg.event_name(), "Dispatching client message");
            self.dispatch(client_id, msg)
        });
        match result {
            Ok(()) => None,
            Err(e) => {
                warn!(client_id, error = %e, "Rejected client message");
                Some(ServerMessage::error(e.to_string()))
            }
        }
    }

    pub fn dispatch(&self, client_id: &str, msg: ClientMessage) -> Result<(), RelayError> {
        match msg {
            ClientMessage::CreateTask(req) => {
                self.mutate(|store| {
                    store
                        .create_task(&req.column_id, &req.title, req.description.as_deref())
                        .map(drop)
                })
            }
            ClientMessage::UpdateTask(req) => self.mutate(|store| {
                store
                    .update_task(&req.id, &req.title, req.description.as_deref())
                    .map(drop)
            }),
            ClientMessage::DeleteTask(req) => {
                self.mutate(|store| store.delete_task(&req.task_id, &req.column_id))
            }
            ClientMessage::CreateColumn(title) => self.mutate(|store| {
                store.create_column(&title);
                Ok(())
            }),
            ClientMessage::UpdateColumn(req) => self.mutate(|store| {
                store
                    .update_column(&req.id, &req.title, req.task_ids)
                    .map(drop)
            }),
            ClientMessage::DeleteColumn(column_id) => {
                self.mutate(|store| store.delete_column(&column_id).map(drop))
            }
            ClientMessage::MoveTask(req) => {
                self.mutate(|store| {
                    store.move_task(
                        &req.task_id,
                        &req.source_column_id,
                        &req.dest_column_id,
                        req.source_index,
                        req.dest_index,
                    )
                })?;
                self.presence
                    .update(client_id, Some(PresenceAction::moving(req.task_id)))?;
                Ok(())
            }
            ClientMessage::MoveColumn(req) => {
                self.mutate(|store| store.move_column(req.source_index, req.dest_index))
            }
            ClientMessage::UserPresenceUpdate(req) => {
                self.presence.update(client_id, req.action)?;
                Ok(())
            }
        }
    }

    fn mutate<F>(&self, op: F) -> Result<(), RelayError>
    where
        F: FnOnce(&mut BoardStore) -> Result<(), BoardError>,
    {
        self.store.call(|store| {
            op(store)?;
            broadcast_message(&self.tx, &ServerMessage::BoardUpdate(store.state().clone()));
            Ok(())
        })
    }
}
