use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use kanban_common::{BoardState, Column, Task};
use uuid::Uuid;

use crate::errors::{BoardError, RelayError};

/// Single-writer handle to the board store.
///
/// Every mutation from every connection goes through this one mutex, so
/// operations apply one at a time in the order their callers acquire it.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<BoardStore>>,
}

impl StoreHandle {
    pub fn new(store: BoardStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run a closure with exclusive access to the store.
    ///
    /// Store operations never block or await, so the lock is held only for
    /// the duration of `f`. Anything `f` does (including sending on a
    /// broadcast channel) is ordered with respect to every other call.
    pub fn call<F, R>(&self, f: F) -> Result<R, RelayError>
    where
        F: FnOnce(&mut BoardStore) -> Result<R, RelayError>,
    {
        let mut guard = self.lock()?;
        f(&mut guard)
    }

    /// Clone of the current board.
    pub fn snapshot(&self) -> Result<BoardState, RelayError> {
        Ok(self.lock()?.state().clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BoardStore>, RelayError> {
        self.inner.lock().map_err(|_| RelayError::LockPoisoned)
    }
}

/// Owner of the canonical board and its mutation operations.
///
/// Each operation validates everything it needs before touching the board,
/// so a failed call leaves the state exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    state: BoardState,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: BoardState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn into_state(self) -> BoardState {
        self.state
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(
        &mut self,
        column_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, BoardError> {
        let column = self
            .state
            .columns
            .get_mut(column_id)
            .ok_or_else(|| column_not_found(column_id))?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        column.task_ids.push(task.id.clone());
        self.state.tasks.insert(task.id.clone(), task.clone());
        self.debug_check();
        Ok(task)
    }

    /// Replace a task's title and description, keeping its creation time.
    pub fn update_task(
        &mut self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, BoardError> {
        let task = self
            .state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| task_not_found(task_id))?;
        task.title = title.to_string();
        task.description = description.map(str::to_string);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, task_id: &str, column_id: &str) -> Result<(), BoardError> {
        if !self.state.tasks.contains_key(task_id) {
            return Err(task_not_found(task_id));
        }
        if !self.state.columns.contains_key(column_id) {
            return Err(column_not_found(column_id));
        }
        if self.state.owner_of(task_id) != Some(column_id) {
            return Err(BoardError::TaskNotInColumn {
                task_id: task_id.to_string(),
                column_id: column_id.to_string(),
            });
        }

        if let Some(column) = self.state.columns.get_mut(column_id) {
            column.task_ids.retain(|id| id != task_id);
        }
        self.state.tasks.remove(task_id);
        self.debug_check();
        Ok(())
    }

    /// Move a task between (or within) columns.
    ///
    /// The task is removed by id; `source_index` is only used when it points
    /// at the task. `dest_index` is clamped to the destination length after
    /// removal.
    pub fn move_task(
        &mut self,
        task_id: &str,
        source_column_id: &str,
        dest_column_id: &str,
        source_index: usize,
        dest_index: usize,
    ) -> Result<(), BoardError> {
        if !self.state.tasks.contains_key(task_id) {
            return Err(task_not_found(task_id));
        }
        if !self.state.columns.contains_key(dest_column_id) {
            return Err(column_not_found(dest_column_id));
        }
        let source = self
            .state
            .columns
            .get_mut(source_column_id)
            .ok_or_else(|| column_not_found(source_column_id))?;

        let position = match source.task_ids.get(source_index) {
            Some(id) if id == task_id => source_index,
            _ => source
                .task_ids
                .iter()
                .position(|id| id == task_id)
                .ok_or_else(|| BoardError::TaskNotInColumn {
                    task_id: task_id.to_string(),
                    column_id: source_column_id.to_string(),
                })?,
        };
        let moved = source.task_ids.remove(position);

        // Source and destination may be the same column; look it up again.
        if let Some(dest) = self.state.columns.get_mut(dest_column_id) {
            let index = dest_index.min(dest.task_ids.len());
            dest.task_ids.insert(index, moved);
        }
        self.debug_check();
        Ok(())
    }

    // ── Columns ──────────────────────────────────────────────────────

    pub fn create_column(&mut self, title: &str) -> Column {
        let column = Column {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            task_ids: Vec::new(),
        };
        self.state.column_order.push(column.id.clone());
        self.state.columns.insert(column.id.clone(), column.clone());
        self.debug_check();
        column
    }

    /// Rename a column and optionally reorder its tasks.
    ///
    /// A supplied order must contain exactly the tasks the column already
    /// owns: ownership only changes through `move_task`.
    pub fn update_column(
        &mut self,
        column_id: &str,
        title: &str,
        task_ids: Option<Vec<String>>,
    ) -> Result<Column, BoardError> {
        let column = self
            .state
            .columns
            .get(column_id)
            .ok_or_else(|| column_not_found(column_id))?;
        if let Some(ref order) = task_ids {
            validate_reorder(column, order)?;
        }

        let column = self
            .state
            .columns
            .get_mut(column_id)
            .ok_or_else(|| column_not_found(column_id))?;
        column.title = title.to_string();
        if let Some(order) = task_ids {
            column.task_ids = order;
        }
        let updated = column.clone();
        self.debug_check();
        Ok(updated)
    }

    /// Remove a column together with every task it owns.
    pub fn delete_column(&mut self, column_id: &str) -> Result<Column, BoardError> {
        let column = self
            .state
            .columns
            .remove(column_id)
            .ok_or_else(|| column_not_found(column_id))?;
        for task_id in &column.task_ids {
            self.state.tasks.remove(task_id);
        }
        self.state.column_order.retain(|id| id != column_id);
        self.debug_check();
        Ok(column)
    }

    pub fn move_column(&mut self, source_index: usize, dest_index: usize) -> Result<(), BoardError> {
        let len = self.state.column_order.len();
        if source_index >= len {
            return Err(BoardError::IndexOutOfRange {
                index: source_index,
                len,
            });
        }
        let moved = self.state.column_order.remove(source_index);
        let index = dest_index.min(self.state.column_order.len());
        self.state.column_order.insert(index, moved);
        self.debug_check();
        Ok(())
    }

    /// Report a broken invariant in debug builds without panicking, so the
    /// store lock is never poisoned by the check itself.
    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.state.check_invariants() {
                tracing::error!(%violation, "Board invariant violated");
            }
        }
    }
}

fn task_not_found(id: &str) -> BoardError {
    BoardError::TaskNotFound { id: id.to_string() }
}

fn column_not_found(id: &str) -> BoardError {
    BoardError::ColumnNotFound { id: id.to_string() }
}

fn validate_reorder(column: &Column, order: &[String]) -> Result<(), BoardError> {
    let invalid = |reason: String| BoardError::InvalidTaskOrder {
        column_id: column.id.clone(),
        reason,
    };

    if order.len() != column.task_ids.len() {
        return Err(invalid(format!(
            "expected {} task ids, got {}",
            column.task_ids.len(),
            order.len()
        )));
    }
    for (i, id) in order.iter().enumerate() {
        if order[..i].contains(id) {
            return Err(invalid(format!("task {} listed twice", id)));
        }
        if !column.task_ids.contains(id) {
            return Err(invalid(format!("task {} is not owned by this column", id)));
        }
    }
    Ok(())
}
