//! Relationship bridges - weak references between entities
//!
//! A bridge links one entity to another by identifier plus relationship
//! attributes (count, active flag, ...). Bridges never own their target:
//! the target may be deleted out from under them, in which case resolving
//! the bridge reports a dangling reference instead of panicking.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ids::RelationshipId;

/// A plain weak reference to another entity, with no extra attributes.
///
/// Specialized bridges (items, proficiencies, slain records) carry their
/// own attributes and live next to the entity they point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bridge<Id> {
    /// Identifier of this relationship, unique per link; generated when a
    /// client payload omits it
    #[serde(default)]
    pub relationship_id: RelationshipId,
    /// Identifier of the entity being bridged to
    pub target: Id,
}

impl<Id> Bridge<Id> {
    pub fn new(target: Id) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
        }
    }
}

/// Error raised when a bridge's target no longer resolves in its collection
#[derive(Debug, Clone, thiserror::Error)]
#[error("bridge {relationship_id} points at missing {kind} '{target}'")]
pub struct DanglingBridge {
    pub relationship_id: RelationshipId,
    /// Collection the target was expected in
    pub kind: &'static str,
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ids::ItemId;

    #[test]
    fn test_bridges_get_distinct_relationship_ids() {
        let a = Bridge::new(ItemId::new("sword"));
        let b = Bridge::new(ItemId::new("sword"));
        assert_ne!(a.relationship_id, b.relationship_id);
        assert_eq!(a.target, b.target);
    }

    #[test]
    fn test_bridge_serializes_target_as_plain_string() {
        let bridge = Bridge::new(ItemId::new("sword"));
        let json = serde_json::to_value(&bridge).unwrap();
        assert_eq!(json["target"], "sword");
    }
}
