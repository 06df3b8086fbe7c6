//! Wire protocol envelopes
//!
//! One request envelope per incoming frame, exactly one response envelope
//! back. Requests form a closed set; anything that fails to parse is
//! answered with an `error` envelope rather than closing the connection.
//! An optional client-chosen `request_id` is echoed in the response for
//! correlation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::aggregates::{Collection, Encounter, EntityPayload, ResponseKind};
use crate::domain::entities::Player;
use crate::domain::value_objects::{ActionId, PlayerId};

/// Requests from client to engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Insert a new entity into the document
    CreateEntity {
        #[serde(default)]
        request_id: Option<String>,
        entity: EntityPayload,
    },
    /// Partially update an entity; only the supplied fields change
    UpdateEntity {
        #[serde(default)]
        request_id: Option<String>,
        entity_id: String,
        fields: serde_json::Map<String, Value>,
    },
    /// Delete an entity (rejected while bridges still target it)
    DeleteEntity {
        #[serde(default)]
        request_id: Option<String>,
        entity_id: String,
    },
    /// Ask for a full state snapshot
    GetState {
        #[serde(default)]
        request_id: Option<String>,
    },
    /// Roll initiative for every player and start combat
    BuildTurnOrder {
        #[serde(default)]
        request_id: Option<String>,
    },
    /// Advance the turn order to the next combatant
    EndTurn {
        #[serde(default)]
        request_id: Option<String>,
    },
    /// Tear combat down from any state
    DestroyTurnOrder {
        #[serde(default)]
        request_id: Option<String>,
    },
    /// Declare an action; may open a reaction window
    PerformAction {
        #[serde(default)]
        request_id: Option<String>,
        actor_id: PlayerId,
        action_id: ActionId,
        #[serde(default)]
        victim_id: Option<PlayerId>,
    },
    /// Answer the open reaction window
    RespondToAttack {
        #[serde(default)]
        request_id: Option<String>,
        responder_id: PlayerId,
        response_type: ResponseKind,
        /// Required when responding with a counter action
        #[serde(default)]
        action_id: Option<ActionId>,
    },
}

impl ClientRequest {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientRequest::CreateEntity { request_id, .. }
            | ClientRequest::UpdateEntity { request_id, .. }
            | ClientRequest::DeleteEntity { request_id, .. }
            | ClientRequest::GetState { request_id }
            | ClientRequest::BuildTurnOrder { request_id }
            | ClientRequest::EndTurn { request_id }
            | ClientRequest::DestroyTurnOrder { request_id }
            | ClientRequest::PerformAction { request_id, .. }
            | ClientRequest::RespondToAttack { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// The mutation kinds a patch can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchVerb {
    Set,
    Inc,
    Add,
    Remove,
}

/// One path-scoped mutation in a state patch.
///
/// Clients apply ops strictly in list order; ops are not guaranteed to
/// commute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchVerb,
    /// Dotted path into the client's copy of the document
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchVerb::Set,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn inc(path: impl Into<String>, delta: f64) -> Self {
        Self {
            op: PatchVerb::Inc,
            path: path.into(),
            value: Some(Value::from(delta)),
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchVerb::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchVerb::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Responses from engine to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    /// Full projection of the live arena and any running combat
    StateSnapshot {
        #[serde(default)]
        request_id: Option<String>,
        players: Collection<Player>,
        #[serde(default)]
        combat: Option<Encounter>,
    },
    /// Incremental update; ops apply in order
    StatePatch {
        #[serde(default)]
        request_id: Option<String>,
        ops: Vec<PatchOp>,
    },
    /// The request failed; the document is unchanged unless stated
    Error {
        #[serde(default)]
        request_id: Option<String>,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_tags_are_snake_case() {
        let json = r#"{"type": "end_turn", "request_id": "r1"}"#;
        let request: ClientRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(request, ClientRequest::EndTurn { .. }));
        assert_eq!(request.request_id(), Some("r1"));
    }

    #[test]
    fn test_request_id_is_optional() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"type": "build_turn_order"}"#).unwrap();
        assert_eq!(request.request_id(), None);
    }

    #[test]
    fn test_perform_action_shape() {
        let json = r#"{
            "type": "perform_action",
            "actor_id": "p1",
            "action_id": "strike",
            "victim_id": "p2"
        }"#;
        let request: ClientRequest = serde_json::from_str(json).unwrap();
        match request {
            ClientRequest::PerformAction {
                actor_id,
                action_id,
                victim_id,
                ..
            } => {
                assert_eq!(actor_id, PlayerId::new("p1"));
                assert_eq!(action_id, ActionId::new("strike"));
                assert_eq!(victim_id, Some(PlayerId::new("p2")));
            }
            other => panic!("expected perform_action, got {other:?}"),
        }
    }

    #[test]
    fn test_counter_response_parses_from_action_tag() {
        let json = r#"{
            "type": "respond_to_attack",
            "responder_id": "p2",
            "response_type": "action",
            "action_id": "riposte"
        }"#;
        let request: ClientRequest = serde_json::from_str(json).unwrap();
        match request {
            ClientRequest::RespondToAttack { response_type, .. } => {
                assert_eq!(response_type, ResponseKind::CounterAction);
            }
            other => panic!("expected respond_to_attack, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_request_kind_fails_to_parse() {
        let result: Result<ClientRequest, _> =
            serde_json::from_str(r#"{"type": "fly_to_moon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_op_omits_missing_value() {
        let op = PatchOp::remove("combat");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json, json!({"op": "remove", "path": "combat"}));
    }

    #[test]
    fn test_set_op_wire_shape() {
        let op = PatchOp::set("players.p1.health", json!("42"));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            json!({"op": "set", "path": "players.p1.health", "value": "42"})
        );
    }

    #[test]
    fn test_error_response_echoes_request_id() {
        let response = ServerResponse::Error {
            request_id: Some("r7".to_string()),
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["request_id"], "r7");
        assert_eq!(json["message"], "boom");
    }
}
