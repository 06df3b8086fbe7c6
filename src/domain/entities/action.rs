//! Action - an ability a combatant can perform

use serde::{Deserialize, Serialize};

use crate::domain::entities::formula::Formula;
use crate::domain::value_objects::ActionId;

/// Power tier of an action, lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Rank {
    #[default]
    F,
    E,
    D,
    C,
    B,
    A,
    S,
}

/// The element or physical kind of a damage roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageType {
    Arcane,
    Slashing,
    Bludgeoning,
    Piercing,
    Fire,
    Water,
    Earth,
    Wind,
    Light,
    Dark,
    Lightning,
    Ice,
    Time,
    Gravity,
    Psychic,
}

/// One damage (or healing) roll of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    pub formula: Formula,
    pub damage_type: DamageType,
}

/// All rolls of one kind an action deals, split by damage type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DamageTotal {
    #[serde(default)]
    pub damages: Vec<Damage>,
}

impl DamageTotal {
    pub fn is_empty(&self) -> bool {
        self.damages.is_empty()
    }
}

/// An ability definition shared by every sheet that knows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub action_point_cost: u32,
    #[serde(default)]
    pub rank: Rank,
    /// Modifier added to the hit roll
    pub hit_mod: Formula,
    #[serde(default)]
    pub damage: DamageTotal,
    #[serde(default)]
    pub healing: DamageTotal,
    pub range: Formula,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Action {
    /// Whether declaring this action opens a reaction window. Anything
    /// that deals damage can be contested by its victim.
    pub fn is_contestable(&self) -> bool {
        !self.damage.is_empty()
    }
}
