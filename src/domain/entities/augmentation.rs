//! Augmentation - a named modifier that can be attached to stats

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AugmentationId, RelationshipId};

/// A reusable stat modifier ("+2 strength while raging", a curse, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Augmentation {
    pub id: AugmentationId,
    pub name: String,
    /// Free-text effect description shown on the sheet
    pub augmentation: String,
}

/// Links an augmentation to the stat it modifies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatAugmentationBridge {
    #[serde(default)]
    pub relationship_id: RelationshipId,
    pub target: AugmentationId,
    /// Name of the stat being augmented
    pub stat: String,
}

impl StatAugmentationBridge {
    pub fn new(target: AugmentationId, stat: impl Into<String>) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
            stat: stat.into(),
        }
    }
}
