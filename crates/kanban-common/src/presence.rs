use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Editing,
    Moving,
}

/// What a connected user is doing right now, and to which element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Id of the task or column being acted upon.
    pub element_id: String,
}

impl PresenceAction {
    pub fn editing(element_id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Editing,
            element_id: element_id.into(),
        }
    }

    pub fn moving(element_id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Moving,
            element_id: element_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    pub id: String,
    pub last_active: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<PresenceAction>,
}

/// Connected users keyed by client id.
pub type PresenceMap = BTreeMap<String, UserPresence>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_action_wire_shape() {
        let action = PresenceAction::moving("task-1");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"type": "moving", "elementId": "task-1"}));

        let parsed: PresenceAction =
            serde_json::from_str(r#"{"type":"editing","elementId":"column-2"}"#).unwrap();
        assert_eq!(parsed, PresenceAction::editing("column-2"));
    }

    #[test]
    fn test_idle_presence_omits_action() {
        let presence = UserPresence {
            id: "u1".to_string(),
            last_active: Utc::now(),
            current_action: None,
        };
        let json = serde_json::to_value(&presence).unwrap();
        assert!(json.get("currentAction").is_none());
        assert!(json["lastActive"].is_string());
    }

    #[test]
    fn test_unknown_action_kind_rejected() {
        let result: Result<PresenceAction, _> =
            serde_json::from_str(r#"{"type":"dancing","elementId":"x"}"#);
        assert!(result.is_err());
    }
}
