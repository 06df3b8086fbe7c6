//! Game document - the canonical entity store
//!
//! One collection per entity kind, split into two arenas: the catalog
//! (shared templates: sheets, actions, items, proficiencies, enemies,
//! augmentations) and the live arena (players spawned into the session).
//! The arenas are connected by identifier only, never by ownership.
//!
//! All mutating operations are atomic per request: an update builds the
//! fully merged entity before it replaces the old one, and a delete is
//! rejected outright while live bridges still target the entity.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Action, Augmentation, Enemy, Item, Player, Proficiency, Sheet,
};
use crate::domain::value_objects::{DanglingBridge, RelationshipId};

/// Error types for entity store operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error("cannot delete '{id}': still referenced by {}", referrers.join(", "))]
    ReferentialIntegrityViolation { id: String, referrers: Vec<String> },

    #[error("invalid fields for {kind} '{id}': {reason}")]
    InvalidFields {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("cannot accept '{id}': {violation}")]
    DanglingTarget {
        id: String,
        violation: IntegrityViolation,
    },
}

/// The entity kinds a document holds, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sheet,
    Action,
    Item,
    Proficiency,
    Enemy,
    Augmentation,
    Player,
}

impl EntityKind {
    /// Name of the collection, doubling as the top-level patch path segment.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Sheet => "sheets",
            EntityKind::Action => "actions",
            EntityKind::Item => "items",
            EntityKind::Proficiency => "proficiencies",
            EntityKind::Enemy => "enemies",
            EntityKind::Augmentation => "augmentations",
            EntityKind::Player => "players",
        }
    }
}

/// An entity that can live in a [`Collection`]
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: &'static str;

    fn entity_id(&self) -> &str;
}

macro_rules! impl_entity {
    ($type:ty, $kind:literal) => {
        impl Entity for $type {
            const KIND: &'static str = $kind;

            fn entity_id(&self) -> &str {
                self.id.as_str()
            }
        }
    };
}

impl_entity!(Sheet, "sheet");
impl_entity!(Action, "action");
impl_entity!(Item, "item");
impl_entity!(Proficiency, "proficiency");
impl_entity!(Enemy, "enemy");
impl_entity!(Augmentation, "augmentation");
impl_entity!(Player, "player");

/// A keyed collection of one entity kind.
///
/// BTreeMap keeps iteration (and therefore snapshots, patches and the
/// persisted file) deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Insert a new entity, rejecting identifier reuse.
    pub fn create(&mut self, entity: T) -> Result<(), DocumentError> {
        let id = entity.entity_id().to_string();
        if self.entries.contains_key(&id) {
            return Err(DocumentError::DuplicateId { kind: T::KIND, id });
        }
        self.entries.insert(id, entity);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&T, DocumentError> {
        self.entries.get(id).ok_or_else(|| DocumentError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut T, DocumentError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| DocumentError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    /// Resolve a bridge target, reporting a dangling reference when the
    /// target entity is gone. Business-logic errors only; never panics.
    pub fn resolve(
        &self,
        relationship_id: RelationshipId,
        target: &str,
    ) -> Result<&T, DanglingBridge> {
        self.entries.get(target).ok_or_else(|| DanglingBridge {
            relationship_id,
            kind: T::KIND,
            target: target.to_string(),
        })
    }

    /// Build the fully merged entity for a partial update without
    /// applying it: only the supplied top-level fields change, everything
    /// else is carried over. The merged entity is validated in full, so a
    /// bad payload never reaches the collection.
    fn merge(
        &self,
        id: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<T, DocumentError> {
        let current = self.get(id)?;

        let invalid = |reason: String| DocumentError::InvalidFields {
            kind: T::KIND,
            id: id.to_string(),
            reason,
        };

        let mut merged = serde_json::to_value(current)
            .map_err(|e| invalid(e.to_string()))?;
        let object = merged
            .as_object_mut()
            .expect("entities serialize as JSON objects");
        for (key, value) in fields {
            if key == "id" && value.as_str() != Some(id) {
                return Err(invalid("id is immutable".to_string()));
            }
            object.insert(key.clone(), value.clone());
        }

        serde_json::from_value(merged).map_err(|e| invalid(e.to_string()))
    }

    /// Overwrite an existing entity with its merged replacement.
    fn replace(&mut self, entity: T) {
        self.entries.insert(entity.entity_id().to_string(), entity);
    }

    /// Apply a partial update. See [`Collection::merge`] for the merge
    /// semantics.
    pub fn update(
        &mut self,
        id: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DocumentError> {
        let updated = self.merge(id, fields)?;
        self.entries.insert(id.to_string(), updated);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<T, DocumentError> {
        self.entries.remove(id).ok_or_else(|| DocumentError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared templates: everything content authors maintain between sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sheets: Collection<Sheet>,
    #[serde(default)]
    pub actions: Collection<Action>,
    #[serde(default)]
    pub items: Collection<Item>,
    #[serde(default)]
    pub proficiencies: Collection<Proficiency>,
    #[serde(default)]
    pub enemies: Collection<Enemy>,
    #[serde(default)]
    pub augmentations: Collection<Augmentation>,
}

/// The canonical session document: catalog plus live arena
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub catalog: Catalog,
    #[serde(default)]
    pub players: Collection<Player>,
}

/// An entity as carried inside a `create_entity` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    Sheet(Sheet),
    Action(Action),
    Item(Item),
    Proficiency(Proficiency),
    Enemy(Enemy),
    Augmentation(Augmentation),
    Player(Player),
}

impl EntityPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Sheet(_) => EntityKind::Sheet,
            EntityPayload::Action(_) => EntityKind::Action,
            EntityPayload::Item(_) => EntityKind::Item,
            EntityPayload::Proficiency(_) => EntityKind::Proficiency,
            EntityPayload::Enemy(_) => EntityKind::Enemy,
            EntityPayload::Augmentation(_) => EntityKind::Augmentation,
            EntityPayload::Player(_) => EntityKind::Player,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            EntityPayload::Sheet(e) => e.entity_id(),
            EntityPayload::Action(e) => e.entity_id(),
            EntityPayload::Item(e) => e.entity_id(),
            EntityPayload::Proficiency(e) => e.entity_id(),
            EntityPayload::Enemy(e) => e.entity_id(),
            EntityPayload::Augmentation(e) => e.entity_id(),
            EntityPayload::Player(e) => e.entity_id(),
        }
    }
}

/// A dangling bridge found by a whole-document integrity sweep
#[derive(Debug, Clone)]
pub struct IntegrityViolation {
    /// Where the broken link lives, e.g. `sheets.hero.items.sword1`
    pub location: String,
    /// Collection the target was expected in
    pub kind: &'static str,
    pub target: String,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} points at missing {} '{}'",
            self.location, self.kind, self.target
        )
    }
}

impl Document {
    /// Which collection holds `id`, searching catalog first, then players.
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        if self.catalog.sheets.contains(id) {
            Some(EntityKind::Sheet)
        } else if self.catalog.actions.contains(id) {
            Some(EntityKind::Action)
        } else if self.catalog.items.contains(id) {
            Some(EntityKind::Item)
        } else if self.catalog.proficiencies.contains(id) {
            Some(EntityKind::Proficiency)
        } else if self.catalog.enemies.contains(id) {
            Some(EntityKind::Enemy)
        } else if self.catalog.augmentations.contains(id) {
            Some(EntityKind::Augmentation)
        } else if self.players.contains(id) {
            Some(EntityKind::Player)
        } else {
            None
        }
    }

    /// Insert a new entity into the collection matching its payload kind.
    /// Entities carrying bridges are checked against the current document
    /// first, so a dangling target never gets in.
    pub fn create(&mut self, entity: EntityPayload) -> Result<EntityKind, DocumentError> {
        match &entity {
            EntityPayload::Sheet(e) => self.check_sheet(e)?,
            EntityPayload::Item(e) => self.check_item(e)?,
            EntityPayload::Player(e) => self.check_player(e)?,
            _ => {}
        }
        let kind = entity.kind();
        match entity {
            EntityPayload::Sheet(e) => self.catalog.sheets.create(e)?,
            EntityPayload::Action(e) => self.catalog.actions.create(e)?,
            EntityPayload::Item(e) => self.catalog.items.create(e)?,
            EntityPayload::Proficiency(e) => self.catalog.proficiencies.create(e)?,
            EntityPayload::Enemy(e) => self.catalog.enemies.create(e)?,
            EntityPayload::Augmentation(e) => self.catalog.augmentations.create(e)?,
            EntityPayload::Player(e) => self.players.create(e)?,
        }
        Ok(kind)
    }

    /// Partially update whichever entity carries `id`.
    pub fn update(
        &mut self,
        id: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<EntityKind, DocumentError> {
        let kind = self.kind_of(id).ok_or_else(|| DocumentError::NotFound {
            kind: "entity",
            id: id.to_string(),
        })?;
        match kind {
            // bridge-carrying kinds: merge, check targets, then replace
            EntityKind::Sheet => {
                let merged = self.catalog.sheets.merge(id, fields)?;
                self.check_sheet(&merged)?;
                self.catalog.sheets.replace(merged);
            }
            EntityKind::Item => {
                let merged = self.catalog.items.merge(id, fields)?;
                self.check_item(&merged)?;
                self.catalog.items.replace(merged);
            }
            EntityKind::Player => {
                let merged = self.players.merge(id, fields)?;
                self.check_player(&merged)?;
                self.players.replace(merged);
            }
            EntityKind::Action => self.catalog.actions.update(id, fields)?,
            EntityKind::Proficiency => self.catalog.proficiencies.update(id, fields)?,
            EntityKind::Enemy => self.catalog.enemies.update(id, fields)?,
            EntityKind::Augmentation => self.catalog.augmentations.update(id, fields)?,
        }
        Ok(kind)
    }

    /// Reject a sheet whose bridges point outside the catalog. Create and
    /// update run this before anything enters the store; the delete side
    /// is guarded by [`Document::referrers`].
    fn check_sheet(&self, sheet: &Sheet) -> Result<(), DocumentError> {
        let id = sheet.id.as_str();
        for (key, bridge) in &sheet.proficiencies {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("sheets.{id}.proficiencies.{key}"),
                "proficiency",
                self.catalog.proficiencies.contains(target),
                target,
            )?;
        }
        for (key, bridge) in &sheet.items {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("sheets.{id}.items.{key}"),
                "item",
                self.catalog.items.contains(target),
                target,
            )?;
        }
        for (key, bridge) in &sheet.actions {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("sheets.{id}.actions.{key}"),
                "action",
                self.catalog.actions.contains(target),
                target,
            )?;
        }
        for (key, bridge) in &sheet.slain_record {
            let target = bridge.target.as_str();
            // a template may record kills against itself (two players
            // spawned from one sheet)
            let exists = target == id || self.catalog.sheets.contains(target);
            ensure_target(
                id,
                format!("sheets.{id}.slain_record.{key}"),
                "sheet",
                exists,
                target,
            )?;
        }
        Ok(())
    }

    fn check_item(&self, item: &Item) -> Result<(), DocumentError> {
        let id = item.id.as_str();
        for (key, bridge) in &item.stat_augmentations {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("items.{id}.stat_augmentations.{key}"),
                "augmentation",
                self.catalog.augmentations.contains(target),
                target,
            )?;
        }
        Ok(())
    }

    fn check_player(&self, player: &Player) -> Result<(), DocumentError> {
        let id = player.id.as_str();
        ensure_target(
            id,
            format!("players.{id}.sheet_id"),
            "sheet",
            self.catalog.sheets.contains(player.sheet_id.as_str()),
            player.sheet_id.as_str(),
        )?;
        for (key, bridge) in &player.augments {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("players.{id}.augments.{key}"),
                "augmentation",
                self.catalog.augmentations.contains(target),
                target,
            )?;
        }
        for (key, bridge) in &player.enemies_slain {
            let target = bridge.target.as_str();
            ensure_target(
                id,
                format!("players.{id}.enemies_slain.{key}"),
                "enemy",
                self.catalog.enemies.contains(target),
                target,
            )?;
        }
        Ok(())
    }

    /// Delete an entity, rejecting the request while anything still
    /// bridges to it. Callers must unlink dependents first; the store
    /// never cascades.
    pub fn delete(&mut self, id: &str) -> Result<EntityKind, DocumentError> {
        let kind = self.kind_of(id).ok_or_else(|| DocumentError::NotFound {
            kind: "entity",
            id: id.to_string(),
        })?;

        let referrers = self.referrers(kind, id);
        if !referrers.is_empty() {
            return Err(DocumentError::ReferentialIntegrityViolation {
                id: id.to_string(),
                referrers,
            });
        }

        match kind {
            EntityKind::Sheet => self.catalog.sheets.delete(id).map(|_| ())?,
            EntityKind::Action => self.catalog.actions.delete(id).map(|_| ())?,
            EntityKind::Item => self.catalog.items.delete(id).map(|_| ())?,
            EntityKind::Proficiency => self.catalog.proficiencies.delete(id).map(|_| ())?,
            EntityKind::Enemy => self.catalog.enemies.delete(id).map(|_| ())?,
            EntityKind::Augmentation => self.catalog.augmentations.delete(id).map(|_| ())?,
            EntityKind::Player => self.players.delete(id).map(|_| ())?,
        }
        Ok(kind)
    }

    /// Every place that still bridges to `id`, as human-readable locations.
    pub fn referrers(&self, kind: EntityKind, id: &str) -> Vec<String> {
        let mut found = Vec::new();

        for (sheet_id, sheet) in self.catalog.sheets.iter() {
            match kind {
                EntityKind::Proficiency => {
                    for (key, bridge) in &sheet.proficiencies {
                        if bridge.target.as_str() == id {
                            found.push(format!("sheets.{sheet_id}.proficiencies.{key}"));
                        }
                    }
                }
                EntityKind::Item => {
                    for (key, bridge) in &sheet.items {
                        if bridge.target.as_str() == id {
                            found.push(format!("sheets.{sheet_id}.items.{key}"));
                        }
                    }
                }
                EntityKind::Action => {
                    for (key, bridge) in &sheet.actions {
                        if bridge.target.as_str() == id {
                            found.push(format!("sheets.{sheet_id}.actions.{key}"));
                        }
                    }
                }
                EntityKind::Sheet => {
                    for (key, bridge) in &sheet.slain_record {
                        if bridge.target.as_str() == id {
                            found.push(format!("sheets.{sheet_id}.slain_record.{key}"));
                        }
                    }
                }
                _ => {}
            }
        }

        if kind == EntityKind::Augmentation {
            for (item_id, item) in self.catalog.items.iter() {
                for (key, bridge) in &item.stat_augmentations {
                    if bridge.target.as_str() == id {
                        found.push(format!("items.{item_id}.stat_augmentations.{key}"));
                    }
                }
            }
        }

        for (player_id, player) in self.players.iter() {
            match kind {
                EntityKind::Sheet if player.sheet_id.as_str() == id => {
                    found.push(format!("players.{player_id}.sheet_id"));
                }
                EntityKind::Augmentation => {
                    for (key, bridge) in &player.augments {
                        if bridge.target.as_str() == id {
                            found.push(format!("players.{player_id}.augments.{key}"));
                        }
                    }
                }
                EntityKind::Enemy => {
                    for (key, bridge) in &player.enemies_slain {
                        if bridge.target.as_str() == id {
                            found.push(format!("players.{player_id}.enemies_slain.{key}"));
                        }
                    }
                }
                _ => {}
            }
        }

        found
    }

    /// Sweep every bridge in the document and report the dangling ones.
    /// Run after loading a persisted document; violations are reported,
    /// not fatal.
    pub fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();
        let mut check = |location: String, kind: &'static str, exists: bool, target: &str| {
            if !exists {
                violations.push(IntegrityViolation {
                    location,
                    kind,
                    target: target.to_string(),
                });
            }
        };

        for (sheet_id, sheet) in self.catalog.sheets.iter() {
            for (key, bridge) in &sheet.proficiencies {
                let target = bridge.target.as_str();
                check(
                    format!("sheets.{sheet_id}.proficiencies.{key}"),
                    "proficiency",
                    self.catalog.proficiencies.contains(target),
                    target,
                );
            }
            for (key, bridge) in &sheet.items {
                let target = bridge.target.as_str();
                check(
                    format!("sheets.{sheet_id}.items.{key}"),
                    "item",
                    self.catalog.items.contains(target),
                    target,
                );
            }
            for (key, bridge) in &sheet.actions {
                let target = bridge.target.as_str();
                check(
                    format!("sheets.{sheet_id}.actions.{key}"),
                    "action",
                    self.catalog.actions.contains(target),
                    target,
                );
            }
            for (key, bridge) in &sheet.slain_record {
                let target = bridge.target.as_str();
                check(
                    format!("sheets.{sheet_id}.slain_record.{key}"),
                    "sheet",
                    self.catalog.sheets.contains(target),
                    target,
                );
            }
        }

        for (item_id, item) in self.catalog.items.iter() {
            for (key, bridge) in &item.stat_augmentations {
                let target = bridge.target.as_str();
                check(
                    format!("items.{item_id}.stat_augmentations.{key}"),
                    "augmentation",
                    self.catalog.augmentations.contains(target),
                    target,
                );
            }
        }

        for (player_id, player) in self.players.iter() {
            check(
                format!("players.{player_id}.sheet_id"),
                "sheet",
                self.catalog.sheets.contains(player.sheet_id.as_str()),
                player.sheet_id.as_str(),
            );
            for (key, bridge) in &player.augments {
                let target = bridge.target.as_str();
                check(
                    format!("players.{player_id}.augments.{key}"),
                    "augmentation",
                    self.catalog.augmentations.contains(target),
                    target,
                );
            }
            for (key, bridge) in &player.enemies_slain {
                let target = bridge.target.as_str();
                check(
                    format!("players.{player_id}.enemies_slain.{key}"),
                    "enemy",
                    self.catalog.enemies.contains(target),
                    target,
                );
            }
        }

        violations
    }
}

fn ensure_target(
    id: &str,
    location: String,
    kind: &'static str,
    exists: bool,
    target: &str,
) -> Result<(), DocumentError> {
    if exists {
        Ok(())
    } else {
        Err(DocumentError::DanglingTarget {
            id: id.to_string(),
            violation: IntegrityViolation {
                location,
                kind,
                target: target.to_string(),
            },
        })
    }
}
