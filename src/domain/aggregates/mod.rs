//! Aggregates - consistency boundaries over the domain entities

mod document;
mod turn_order;

pub use document::{
    Catalog, Collection, Document, DocumentError, Entity, EntityKind, EntityPayload,
    IntegrityViolation,
};
pub use turn_order::{
    CombatError, Encounter, PendingReaction, ResponseKind, TurnOrder, BASE_ACTION_POINTS,
};

/// Everything a session mutates: the document plus the combat machine.
///
/// One of these sits behind the application's write lock; every request
/// runs against it to completion before the next one starts.
#[derive(Debug, Default)]
pub struct GameState {
    pub document: Document,
    pub combat: TurnOrder,
}

impl GameState {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            combat: TurnOrder::new(),
        }
    }
}
