//! Enemy - catalog entry for creatures without a full sheet

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EnemyId, RelationshipId};

/// A simple enemy template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EnemyId,
    pub name: String,
    pub description: String,
    /// Experience awarded when this enemy is defeated
    pub xp_given: i64,
}

/// Records how many of an enemy a player has slain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyBridge {
    #[serde(default)]
    pub relationship_id: RelationshipId,
    pub target: EnemyId,
    pub count: u32,
}

impl EnemyBridge {
    pub fn new(target: EnemyId) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
            count: 0,
        }
    }
}
