use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use kanban_common::{PresenceAction, PresenceMap, UserPresence};
use tokio::sync::broadcast;
use tracing::debug;

use super::protocol::{Membership, ServerMessage};
use super::ws::broadcast_message;
use crate::errors::RelayError;

/// Who is connected and what they are doing.
///
/// Entries live exactly as long as their connection: there is no idle
/// eviction. Every change is broadcast while the map lock is held, so
/// clients observe presence changes in the order they were applied.
pub struct PresenceTracker {
    users: Mutex<PresenceMap>,
    tx: broadcast::Sender<String>,
}

impl PresenceTracker {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self {
            users: Mutex::new(PresenceMap::new()),
            tx,
        }
    }

    /// Register a new connection and announce it to everyone.
    pub fn connect(&self, client_id: &str) -> Result<(), RelayError> {
        let mut users = self.lock()?;
        users.insert(
            client_id.to_string(),
            UserPresence {
                id: client_id.to_string(),
                last_active: Utc::now(),
                current_action: None,
            },
        );
        broadcast_message(&self.tx, &membership(client_id, &users, true));
        Ok(())
    }

    /// Record the client's current action (or clear it with `None`).
    ///
    /// Returns `false` without broadcasting when the client has no entry.
    pub fn update(
        &self,
        client_id: &str,
        action: Option<PresenceAction>,
    ) -> Result<bool, RelayError> {
        let mut users = self.lock()?;
        let Some(entry) = users.get_mut(client_id) else {
            debug!(client_id, "Presence update for unknown client ignored");
            return Ok(false);
        };
        entry.last_active = Utc::now();
        entry.current_action = action;
        broadcast_message(&self.tx, &ServerMessage::UserPresenceUpdate(users.clone()));
        Ok(true)
    }

    /// Drop a connection's entry and announce the departure.
    pub fn disconnect(&self, client_id: &str) -> Result<(), RelayError> {
        let mut users = self.lock()?;
        users.remove(client_id);
        broadcast_message(&self.tx, &membership(client_id, &users, false));
        Ok(())
    }

    pub fn snapshot(&self) -> Result<PresenceMap, RelayError> {
        Ok(self.lock()?.clone())
    }

    pub fn count(&self) -> Result<usize, RelayError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PresenceMap>, RelayError> {
        self.users.lock().map_err(|_| RelayError::LockPoisoned)
    }
}

fn membership(client_id: &str, users: &PresenceMap, joined: bool) -> ServerMessage {
    let payload = Membership {
        user_id: client_id.to_string(),
        connected_users: users.clone(),
        count: users.len(),
    };
    if joined {
        ServerMessage::UserConnected(payload)
    } else {
        ServerMessage::UserDisconnected(payload)
    }
}
