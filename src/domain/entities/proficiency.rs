//! Proficiency - a learned skill with use-tracked growth

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ProficiencyId, RelationshipId};

/// A skill a sheet can be proficient in.
///
/// Growth is tracked by use: every time a formula consults the proficiency
/// as part of a committed action, its use count goes up, and the effective
/// multiplier climbs towards 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proficiency {
    pub id: ProficiencyId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub use_count: u32,
    pub growth_rate: f64,
}

impl Proficiency {
    /// Effective skill multiplier: `min(growth_rate * use_count, 1)`.
    /// Saturates at 1 so a well-practiced skill never over-scales.
    pub fn effective_value(&self) -> f64 {
        (self.growth_rate * f64::from(self.use_count)).min(1.0)
    }
}

/// A sheet's link to a proficiency it has trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProficiencyBridge {
    #[serde(default)]
    pub relationship_id: RelationshipId,
    pub target: ProficiencyId,
}

impl ProficiencyBridge {
    pub fn new(target: ProficiencyId) -> Self {
        Self {
            relationship_id: RelationshipId::generate(),
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proficiency(use_count: u32, growth_rate: f64) -> Proficiency {
        Proficiency {
            id: ProficiencyId::new("swords"),
            name: "Swords".to_string(),
            description: String::new(),
            use_count,
            growth_rate,
        }
    }

    #[test]
    fn test_effective_value_scales_with_use() {
        assert_eq!(proficiency(3, 0.2).effective_value(), 0.6);
    }

    #[test]
    fn test_effective_value_saturates_at_one() {
        assert_eq!(proficiency(50, 0.2).effective_value(), 1.0);
    }

    #[test]
    fn test_unused_proficiency_is_zero() {
        assert_eq!(proficiency(0, 0.5).effective_value(), 0.0);
    }
}
