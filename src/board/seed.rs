//! Demo board loaded at startup unless seeding is disabled.

use chrono::Utc;
use kanban_common::{BoardState, Column, Task};

const SEED_COLUMNS: &[(&str, &str, &[&str])] = &[
    ("column-1", "To Do", &["task-1", "task-2"]),
    ("column-2", "In Progress", &["task-3"]),
    ("column-3", "Done", &[]),
];

const SEED_TASKS: &[(&str, &str, &str)] = &[
    (
        "task-1",
        "Create project structure",
        "Set up initial folder structure and dependencies",
    ),
    (
        "task-2",
        "Implement drag and drop",
        "Support dragging tasks between columns",
    ),
    (
        "task-3",
        "Set up real-time sync",
        "Broadcast board changes to every connected client",
    ),
];

pub fn demo_board() -> BoardState {
    let now = Utc::now();
    let tasks = SEED_TASKS
        .iter()
        .map(|(id, title, description)| {
            let task = Task {
                id: id.to_string(),
                title: title.to_string(),
                description: Some(description.to_string()),
                created_at: now,
                updated_at: now,
            };
            (task.id.clone(), task)
        })
        .collect();
    let columns = SEED_COLUMNS
        .iter()
        .map(|(id, title, task_ids)| {
            let column = Column {
                id: id.to_string(),
                title: title.to_string(),
                task_ids: task_ids.iter().map(|t| t.to_string()).collect(),
            };
            (column.id.clone(), column)
        })
        .collect();

    BoardState {
        tasks,
        columns,
        column_order: SEED_COLUMNS.iter().map(|(id, _, _)| id.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_board_is_consistent() {
        let board = demo_board();
        board.check_invariants().unwrap();
        assert_eq!(board.column_order, vec!["column-1", "column-2", "column-3"]);
        assert_eq!(board.columns["column-1"].task_ids, vec!["task-1", "task-2"]);
        assert!(board.columns["column-3"].task_ids.is_empty());
        assert_eq!(board.tasks.len(), 3);
    }
}
