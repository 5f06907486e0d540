//! Wire protocol for the board socket.
//!
//! Every frame is a JSON object `{"type": "<event>", "data": <payload>}`.
//! Client frames that do not parse into [`ClientMessage`] are rejected
//! before they reach the store.

use kanban_common::{BoardState, PresenceAction, PresenceMap};
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;

// ── Client → server ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateTask(CreateTask),
    UpdateTask(UpdateTask),
    DeleteTask(DeleteTask),
    /// Payload is the new column's title.
    CreateColumn(String),
    UpdateColumn(UpdateColumn),
    /// Payload is the id of the column to delete.
    DeleteColumn(String),
    MoveTask(MoveTask),
    MoveColumn(MoveColumn),
    UserPresenceUpdate(PresenceUpdate),
}

/// Accepts both the flat `{columnId, title, description}` payload and the
/// nested `{columnId, task: {title, description}}` one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CreateTaskWire")]
pub struct CreateTask {
    pub column_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreateTaskWire {
    #[serde(rename_all = "camelCase")]
    Flat {
        column_id: String,
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Nested { column_id: String, task: NewTask },
}

#[derive(Deserialize)]
struct NewTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<CreateTaskWire> for CreateTask {
    fn from(wire: CreateTaskWire) -> Self {
        match wire {
            CreateTaskWire::Flat {
                column_id,
                title,
                description,
            } => Self {
                column_id,
                title,
                description,
            },
            CreateTaskWire::Nested { column_id, task } => Self {
                column_id,
                title: task.title,
                description: task.description,
            },
        }
    }
}

/// A task as sent by the client; timestamps, if present, are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTask {
    pub task_id: String,
    pub column_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColumn {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub task_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTask {
    pub task_id: String,
    pub source_column_id: String,
    #[serde(alias = "destinationColumnId")]
    pub dest_column_id: String,
    pub source_index: usize,
    #[serde(alias = "destinationIndex")]
    pub dest_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveColumn {
    pub source_index: usize,
    #[serde(alias = "destinationIndex")]
    pub dest_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    #[serde(default)]
    pub action: Option<PresenceAction>,
}

impl ClientMessage {
    /// Parse and validate one client text frame.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let msg: Self = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    /// Shape checks serde cannot express.
    pub fn validate(&self) -> Result<(), RelayError> {
        let title = match self {
            Self::CreateTask(req) => Some(&req.title),
            Self::UpdateTask(req) => Some(&req.title),
            _ => None,
        };
        match title {
            Some(t) if t.trim().is_empty() => Err(RelayError::MalformedMessage(
                "task title must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Event name as it appears in the `type` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::CreateTask(_) => "create-task",
            Self::UpdateTask(_) => "update-task",
            Self::DeleteTask(_) => "delete-task",
            Self::CreateColumn(_) => "create-column",
            Self::UpdateColumn(_) => "update-column",
            Self::DeleteColumn(_) => "delete-column",
            Self::MoveTask(_) => "move-task",
            Self::MoveColumn(_) => "move-column",
            Self::UserPresenceUpdate(_) => "user-presence-update",
        }
    }
}

// ── Server → client ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    InitialState(BoardState),
    BoardUpdate(BoardState),
    UserPresenceUpdate(PresenceMap),
    UserConnected(Membership),
    UserDisconnected(Membership),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: String,
    pub connected_users: PresenceMap,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_common::ActionKind;

    #[test]
    fn test_create_task_frame_parses() {
        let msg = ClientMessage::parse(
            r#"{"type":"create-task","data":{"columnId":"c1","title":"Write docs"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateTask(CreateTask {
                column_id: "c1".into(),
                title: "Write docs".into(),
                description: None,
            })
        );
        assert_eq!(msg.event_name(), "create-task");
    }

    #[test]
    fn test_create_task_accepts_nested_task_payload() {
        let nested = ClientMessage::parse(
            r#"{"type":"create-task","data":{"columnId":"c1",
                "task":{"title":"Write docs","description":"README"}}}"#,
        )
        .unwrap();
        let flat = ClientMessage::parse(
            r#"{"type":"create-task","data":{"columnId":"c1","title":"Write docs","description":"README"}}"#,
        )
        .unwrap();
        assert_eq!(nested, flat);

        let err = ClientMessage::parse(
            r#"{"type":"create-task","data":{"columnId":"c1","task":{"title":""}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));

        // Outgoing frames always use the flat shape.
        let frame = serde_json::to_value(&flat).unwrap();
        assert_eq!(frame["data"]["title"], "Write docs");
        assert!(frame["data"].get("task").is_none());
    }

    #[test]
    fn test_update_task_ignores_timestamps() {
        let msg = ClientMessage::parse(
            r#"{"type":"update-task","data":{"id":"t1","title":"New","description":"d",
                "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::UpdateTask(req) => {
                assert_eq!(req.id, "t1");
                assert_eq!(req.description.as_deref(), Some("d"));
            }
            other => panic!("Expected UpdateTask, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_string_payloads() {
        let msg = ClientMessage::parse(r#"{"type":"create-column","data":"Backlog"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CreateColumn("Backlog".into()));

        let msg = ClientMessage::parse(r#"{"type":"delete-column","data":"c9"}"#).unwrap();
        assert_eq!(msg, ClientMessage::DeleteColumn("c9".into()));
    }

    #[test]
    fn test_move_task_accepts_both_field_spellings() {
        let short = ClientMessage::parse(
            r#"{"type":"move-task","data":{"taskId":"t1","sourceColumnId":"a",
                "destColumnId":"b","sourceIndex":0,"destIndex":1}}"#,
        )
        .unwrap();
        let long = ClientMessage::parse(
            r#"{"type":"move-task","data":{"taskId":"t1","sourceColumnId":"a",
                "destinationColumnId":"b","sourceIndex":0,"destinationIndex":1}}"#,
        )
        .unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_presence_update_with_and_without_action() {
        let msg = ClientMessage::parse(
            r#"{"type":"user-presence-update","data":{"action":{"type":"editing","elementId":"t1"}}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::UserPresenceUpdate(PresenceUpdate { action: Some(action) }) => {
                assert_eq!(action.kind, ActionKind::Editing);
                assert_eq!(action.element_id, "t1");
            }
            other => panic!("Expected presence update, got {:?}", other),
        }

        let msg = ClientMessage::parse(r#"{"type":"user-presence-update","data":{}}"#).unwrap();
        assert_eq!(msg, ClientMessage::UserPresenceUpdate(PresenceUpdate::default()));
    }

    #[test]
    fn test_malformed_frames_rejected() {
        let cases = [
            "not json",
            r#"{"type":"explode-board","data":{}}"#,
            r#"{"type":"delete-task","data":{"taskId":"t1"}}"#,
            r#"{"type":"move-column","data":{"sourceIndex":-1,"destIndex":0}}"#,
            r#"{"type":"create-task","data":{"columnId":"c1","title":"   "}}"#,
        ];
        for case in cases {
            let err = ClientMessage::parse(case).unwrap_err();
            assert!(
                matches!(err, RelayError::MalformedMessage(_)),
                "expected malformed for {}",
                case
            );
        }
    }

    #[test]
    fn test_server_frames_use_kebab_case_events() {
        let frame = ServerMessage::BoardUpdate(BoardState::default()).to_frame().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "board-update");
        assert_eq!(parsed["data"]["columnOrder"], serde_json::json!([]));

        let frame = ServerMessage::error("Column c1 not found").to_frame().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "error");
        assert_eq!(parsed["data"]["message"], "Column c1 not found");
    }

    #[test]
    fn test_membership_frame_shape() {
        let msg = ServerMessage::UserConnected(Membership {
            user_id: "u1".into(),
            connected_users: PresenceMap::new(),
            count: 0,
        });
        let parsed: serde_json::Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();
        assert_eq!(parsed["type"], "user-connected");
        assert_eq!(parsed["data"]["userId"], "u1");
        assert_eq!(parsed["data"]["count"], 0);
        assert!(parsed["data"]["connectedUsers"].is_object());
    }
}
