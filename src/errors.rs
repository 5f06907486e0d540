//! Typed error hierarchy for the relay.
//!
//! Two enums cover the two layers:
//! - `BoardError`: a store operation was refused; the board is unchanged
//! - `RelayError`: a client frame was refused at the connection boundary
//!
//! Neither ever escapes a connection: the dispatcher turns both into an
//! `error` event for the requesting client.

use thiserror::Error;

/// Errors from a single board store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("Column {id} not found")]
    ColumnNotFound { id: String },

    #[error("Task {task_id} not found in column {column_id}")]
    TaskNotInColumn { task_id: String, column_id: String },

    #[error("Invalid task order for column {column_id}: {reason}")]
    InvalidTaskOrder { column_id: String, reason: String },

    #[error("Column index {index} out of range (board has {len} columns)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl BoardError {
    /// Whether the operation referenced an id that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound { .. } | Self::ColumnNotFound { .. } | Self::TaskNotInColumn { .. }
        )
    }
}

/// Errors raised while handling one client frame.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Board lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}
