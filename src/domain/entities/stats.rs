//! Stats block - base attributes plus formula-defined sub-stats

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::formula::Formula;

/// The six base attributes and the derived sub-stats of a sheet.
///
/// Base attributes are plain integers; sub-stats (attack bonus, carry
/// capacity, ...) are formulas evaluated on demand against the owning
/// combatant, so they can reference base stats, other sub-stats, or
/// proficiencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub strength: i64,
    pub dexterity: i64,
    pub constitution: i64,
    pub perception: i64,
    pub arcane: i64,
    pub will: i64,
    /// Derived stats by name, each a formula over the rest of the block
    #[serde(default)]
    pub sub_stats: BTreeMap<String, Formula>,
}

impl Stats {
    /// Look up a base attribute by name. Sub-stats are not covered here;
    /// the formula engine handles those separately since they expand
    /// recursively.
    pub fn base(&self, name: &str) -> Option<i64> {
        match name {
            "strength" => Some(self.strength),
            "dexterity" => Some(self.dexterity),
            "constitution" => Some(self.constitution),
            "perception" => Some(self.perception),
            "arcane" => Some(self.arcane),
            "will" => Some(self.will),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_lookup_covers_all_six() {
        let stats = Stats {
            strength: 1,
            dexterity: 2,
            constitution: 3,
            perception: 4,
            arcane: 5,
            will: 6,
            sub_stats: BTreeMap::new(),
        };
        for (name, expected) in [
            ("strength", 1),
            ("dexterity", 2),
            ("constitution", 3),
            ("perception", 4),
            ("arcane", 5),
            ("will", 6),
        ] {
            assert_eq!(stats.base(name), Some(expected));
        }
        assert_eq!(stats.base("charisma"), None);
    }
}
