//! Sheet, Player and CombatSheet - the three lifetimes of a character
//!
//! A `Sheet` is the static template in the catalog. A `Player` is a durable
//! live instantiation of a sheet (current health, mana, earned xp) that
//! survives across combats and sessions. A `CombatSheet` is the ephemeral
//! per-combat state (initiative, action points) that only exists while a
//! turn order is active. The three are connected by identifier only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::enemy::EnemyBridge;
use crate::domain::entities::item::ItemBridge;
use crate::domain::entities::proficiency::ProficiencyBridge;
use crate::domain::entities::stats::Stats;
use crate::domain::value_objects::{
    ActionId, AugmentationId, Bridge, PlayerId, RelationshipId, SheetId,
};

/// Records kills of one sheet template by another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlainBridge {
    #[serde(default)]
    pub relationship_id: RelationshipId,
    pub target: SheetId,
    pub count: u32,
}

impl SlainBridge {
    pub fn new(target: SheetId) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
            count: 0,
        }
    }
}

/// Static template for a character or creature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    /// Hidden from non-DM users (goblins in the bush, off-screen NPCs)
    #[serde(default)]
    pub dm_only: bool,
    /// Experience awarded to whoever defeats an instance of this sheet
    #[serde(default)]
    pub xp_given_when_slain: i64,
    /// Upper bound on experience an instance of this sheet can earn
    pub xp_cap: i64,
    pub stats: Stats,
    /// Local key -> trained proficiency
    #[serde(default)]
    pub proficiencies: BTreeMap<String, ProficiencyBridge>,
    /// Local key -> carried item
    #[serde(default)]
    pub items: BTreeMap<String, ItemBridge>,
    /// Local key -> known action
    #[serde(default)]
    pub actions: BTreeMap<String, Bridge<ActionId>>,
    /// Sheet id -> kill record against that template
    #[serde(default)]
    pub slain_record: BTreeMap<String, SlainBridge>,
}

impl Sheet {
    /// Bump the kill count against `victim`, creating the record on first kill.
    pub fn record_slain(&mut self, victim: SheetId) {
        self.slain_record
            .entry(victim.as_str().to_string())
            .or_insert_with(|| SlainBridge::new(victim))
            .count += 1;
    }
}

/// A durable live instantiation of a sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Template this player was spawned from
    pub sheet_id: SheetId,
    pub name: String,
    pub health: f64,
    pub mana: i64,
    /// Experience earned so far, capped by the sheet's xp_cap
    #[serde(default)]
    pub xp: i64,
    /// Local key -> augmentation currently applied to this player
    #[serde(default)]
    pub augments: BTreeMap<String, Bridge<AugmentationId>>,
    /// Enemy id -> kill record
    #[serde(default)]
    pub enemies_slain: BTreeMap<String, EnemyBridge>,
}

impl Player {
    /// Award experience, clamped to the sheet's cap.
    pub fn award_xp(&mut self, amount: i64, cap: i64) {
        self.xp = (self.xp + amount).min(cap);
    }

    pub fn is_downed(&self) -> bool {
        self.health <= 0.0
    }
}

/// Ephemeral combat-scoped state for a player.
///
/// Created when a turn order is built and destroyed with it; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSheet {
    pub player_id: PlayerId,
    /// Whether the combatant still takes turns
    pub active: bool,
    /// Hidden from non-DM users while in combat
    pub hidden: bool,
    /// Action points remaining this round
    pub action_points: u32,
    /// Rolled initiative that fixed this combatant's queue position
    pub initiative: i64,
}
