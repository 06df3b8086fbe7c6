//! Value objects - Immutable objects defined by their attributes

mod bridge;
mod ids;

pub use bridge::{Bridge, DanglingBridge};
pub use ids::{
    ActionId, AugmentationId, EnemyId, ItemId, PlayerId, ProficiencyId, RelationshipId, SheetId,
};
