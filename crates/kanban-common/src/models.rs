use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub title: String,
    /// Owned task ids in display order.
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// The whole board as broadcast to clients.
///
/// Maps are ordered so that two equal boards always serialize to the same
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default)]
    pub column_order: Vec<String>,
}

/// A broken board invariant, as found by [`BoardState::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Column {column_id} references unknown task {task_id}")]
    DanglingTask { column_id: String, task_id: String },

    #[error("Task {task_id} is listed more than once (columns {first} and {second})")]
    DuplicateTask {
        task_id: String,
        first: String,
        second: String,
    },

    #[error("Task {task_id} is not owned by any column")]
    OrphanTask { task_id: String },

    #[error("Column order lists unknown column {column_id}")]
    UnknownOrderedColumn { column_id: String },

    #[error("Column {column_id} is missing from the column order")]
    UnorderedColumn { column_id: String },

    #[error("Column {column_id} appears more than once in the column order")]
    DuplicateOrderedColumn { column_id: String },

    #[error("Column stored under key {key} carries id {id}")]
    MismatchedColumnKey { key: String, id: String },

    #[error("Task stored under key {key} carries id {id}")]
    MismatchedTaskKey { key: String, id: String },
}

impl BoardState {
    /// Id of the column whose order list contains `task_id`, if any.
    pub fn owner_of(&self, task_id: &str) -> Option<&str> {
        self.columns
            .values()
            .find(|c| c.task_ids.iter().any(|id| id == task_id))
            .map(|c| c.id.as_str())
    }

    /// Columns in display order.
    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
    }

    /// Verify the structural invariants of the board.
    ///
    /// - every listed task id exists, and is listed exactly once board-wide
    /// - every task is owned by some column
    /// - `column_order` is a permutation of the column keys
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (key, task) in &self.tasks {
            if key != &task.id {
                return Err(InvariantViolation::MismatchedTaskKey {
                    key: key.clone(),
                    id: task.id.clone(),
                });
            }
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (key, column) in &self.columns {
            if key != &column.id {
                return Err(InvariantViolation::MismatchedColumnKey {
                    key: key.clone(),
                    id: column.id.clone(),
                });
            }
            for task_id in &column.task_ids {
                if !self.tasks.contains_key(task_id) {
                    return Err(InvariantViolation::DanglingTask {
                        column_id: column.id.clone(),
                        task_id: task_id.clone(),
                    });
                }
                if let Some(first) = owners.insert(task_id.as_str(), column.id.as_str()) {
                    return Err(InvariantViolation::DuplicateTask {
                        task_id: task_id.clone(),
                        first: first.to_string(),
                        second: column.id.clone(),
                    });
                }
            }
        }

        if let Some(orphan) = self.tasks.keys().find(|id| !owners.contains_key(id.as_str())) {
            return Err(InvariantViolation::OrphanTask {
                task_id: orphan.clone(),
            });
        }

        let mut seen = Vec::with_capacity(self.column_order.len());
        for column_id in &self.column_order {
            if !self.columns.contains_key(column_id) {
                return Err(InvariantViolation::UnknownOrderedColumn {
                    column_id: column_id.clone(),
                });
            }
            if seen.contains(&column_id) {
                return Err(InvariantViolation::DuplicateOrderedColumn {
                    column_id: column_id.clone(),
                });
            }
            seen.push(column_id);
        }
        if let Some(missing) = self.columns.keys().find(|id| !seen.contains(id)) {
            return Err(InvariantViolation::UnorderedColumn {
                column_id: missing.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn column(id: &str, task_ids: &[&str]) -> Column {
        Column {
            id: id.to_string(),
            title: id.to_uppercase(),
            task_ids: task_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn board(columns: Vec<Column>, tasks: &[&str]) -> BoardState {
        BoardState {
            tasks: tasks.iter().map(|id| (id.to_string(), task(id))).collect(),
            column_order: columns.iter().map(|c| c.id.clone()).collect(),
            columns: columns.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    #[test]
    fn test_empty_board_is_valid() {
        assert_eq!(BoardState::default().check_invariants(), Ok(()));
    }

    #[test]
    fn test_well_formed_board_is_valid() {
        let state = board(
            vec![column("a", &["t1", "t2"]), column("b", &["t3"])],
            &["t1", "t2", "t3"],
        );
        assert_eq!(state.check_invariants(), Ok(()));
        assert_eq!(state.owner_of("t3"), Some("b"));
        assert_eq!(state.owner_of("nope"), None);
    }

    #[test]
    fn test_dangling_task_detected() {
        let state = board(vec![column("a", &["t1", "ghost"])], &["t1"]);
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::DanglingTask { ref task_id, .. }) if task_id == "ghost"
        ));
    }

    #[test]
    fn test_task_in_two_columns_detected() {
        let state = board(vec![column("a", &["t1"]), column("b", &["t1"])], &["t1"]);
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::DuplicateTask { .. })
        ));
    }

    #[test]
    fn test_orphan_task_detected() {
        let state = board(vec![column("a", &[])], &["t1"]);
        assert_eq!(
            state.check_invariants(),
            Err(InvariantViolation::OrphanTask {
                task_id: "t1".to_string()
            })
        );
    }

    #[test]
    fn test_column_order_must_match_keys() {
        let mut state = board(vec![column("a", &[]), column("b", &[])], &[]);
        state.column_order.pop();
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::UnorderedColumn { .. })
        ));

        state.column_order = vec!["a".into(), "b".into(), "a".into()];
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::DuplicateOrderedColumn { .. })
        ));

        state.column_order = vec!["a".into(), "b".into(), "c".into()];
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::UnknownOrderedColumn { .. })
        ));
    }

    #[test]
    fn test_board_state_serializes_camel_case() {
        let state = board(vec![column("a", &["t1"])], &["t1"]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["columnOrder"][0], "a");
        assert_eq!(json["columns"]["a"]["taskIds"][0], "t1");
        assert!(json["tasks"]["t1"]["createdAt"].is_string());
        assert!(json["tasks"]["t1"].get("description").is_none());
    }

    #[test]
    fn test_ordered_columns_follow_column_order() {
        let mut state = board(vec![column("a", &[]), column("b", &[])], &[]);
        state.column_order = vec!["b".into(), "a".into()];
        let ids: Vec<_> = state.ordered_columns().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
