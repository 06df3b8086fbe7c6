//! Domain entities - Canonical game objects with identity

mod action;
mod augmentation;
mod enemy;
mod formula;
mod item;
mod proficiency;
mod sheet;
mod stats;

pub use action::{Action, Damage, DamageTotal, DamageType, Rank};
pub use augmentation::{Augmentation, StatAugmentationBridge};
pub use enemy::{Enemy, EnemyBridge};
pub use formula::Formula;
pub use item::{Item, ItemBridge};
pub use proficiency::{Proficiency, ProficiencyBridge};
pub use sheet::{CombatSheet, Player, Sheet, SlainBridge};
pub use stats::Stats;
