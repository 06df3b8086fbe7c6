//! Item - catalog equipment and the bridges sheets use to carry it

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::augmentation::StatAugmentationBridge;
use crate::domain::value_objects::{ItemId, RelationshipId};

/// A catalog item shared by every sheet that carries it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub weight: String,
    /// Stat augmentations granted while the item is active
    #[serde(default)]
    pub stat_augmentations: BTreeMap<String, StatAugmentationBridge>,
}

/// A sheet's link to an item in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBridge {
    #[serde(default)]
    pub relationship_id: RelationshipId,
    pub target: ItemId,
    /// How many the sheet carries
    pub count: u32,
    /// Whether the item is currently equipped/active
    pub active: bool,
}

impl ItemBridge {
    pub fn new(target: ItemId) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
            count: 1,
            active: false,
        }
    }
}
