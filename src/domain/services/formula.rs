//! Formula engine - alias resolution and safe expansion
//!
//! Evaluation walks each alias's navigation path from the casting entity
//! (and optionally a target), classifies the terminal value, and splices
//! the result into the formula text. The engine guarantees referential
//! safety: a missing step fails with `UnresolvedAlias`, a wrong-typed
//! terminal with `TypeMismatch`, and a formula that re-enters itself with
//! `CyclicReference` - expansion never recurses unboundedly.
//!
//! The returned text is substituted but not arithmetically reduced; see
//! [`crate::domain::services::reduce`] for the separate reduction step.
//!
//! Evaluation is side-effect free. Proficiencies consulted along the way
//! are reported back so the caller can increment their use counts once
//! the surrounding transaction commits.

use crate::domain::aggregates::Catalog;
use crate::domain::entities::{Formula, Player, ProficiencyBridge, Sheet, Stats};
use crate::domain::value_objects::{DanglingBridge, ProficiencyId};

/// Error types for formula evaluation
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("alias '{alias}': step {step} ('{segment}') does not resolve")]
    UnresolvedAlias {
        alias: String,
        /// Zero-based index of the failing path segment
        step: usize,
        segment: String,
    },

    #[error("alias '{alias}': value at '{path}' is not a number, formula or proficiency")]
    TypeMismatch { alias: String, path: String },

    #[error("cyclic formula reference through '{path}'")]
    CyclicReference { path: String },

    #[error(transparent)]
    DanglingReference(#[from] DanglingBridge),
}

/// A live entity paired with the sheet it was spawned from
#[derive(Clone, Copy)]
pub struct Combatant<'a> {
    pub player: &'a Player,
    pub sheet: &'a Sheet,
}

/// Everything alias paths can navigate from
pub struct EvalContext<'a> {
    pub catalog: &'a Catalog,
    pub caster: Combatant<'a>,
    /// Present only for two-sided formulas (attacks, contested checks)
    pub target: Option<Combatant<'a>>,
}

/// The outcome of a successful evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The formula text with every `@name` replaced by its parenthesized
    /// expansion
    pub text: String,
    /// Proficiencies consulted during expansion, in consultation order.
    /// The caller bumps their use counts when the transaction commits.
    pub consulted: Vec<ProficiencyId>,
}

/// Evaluate a formula against a context.
pub fn evaluate(formula: &Formula, ctx: &EvalContext) -> Result<Evaluation, FormulaError> {
    let mut consulted = Vec::new();
    let mut stack = Vec::new();
    let text = expand(formula, ctx, &mut stack, &mut consulted)?;
    Ok(Evaluation { text, consulted })
}

/// What an alias path can land on while walking
enum Cursor<'a> {
    Combatant(Combatant<'a>),
    Stats(&'a Stats),
    Number(f64),
    Nested(&'a Formula),
    Proficiency(&'a ProficiencyBridge),
}

fn expand(
    formula: &Formula,
    ctx: &EvalContext,
    stack: &mut Vec<String>,
    consulted: &mut Vec<ProficiencyId>,
) -> Result<String, FormulaError> {
    let mut text = formula.text.clone();

    // Longest names first so `@str` never clobbers part of `@strength`.
    let mut names: Vec<&String> = formula.aliases.keys().collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    for name in names {
        let path = &formula.aliases[name];
        let canonical = path.join(".");
        let value = match walk(name, path, ctx)? {
            Cursor::Number(n) => format_number(n),
            Cursor::Nested(nested) => {
                if stack.iter().any(|entry| entry == &canonical) {
                    return Err(FormulaError::CyclicReference { path: canonical });
                }
                stack.push(canonical);
                let expanded = expand(nested, ctx, stack, consulted)?;
                stack.pop();
                expanded
            }
            Cursor::Proficiency(bridge) => {
                let proficiency = ctx
                    .catalog
                    .proficiencies
                    .resolve(bridge.relationship_id, bridge.target.as_str())?;
                consulted.push(proficiency.id.clone());
                format_number(proficiency.effective_value())
            }
            Cursor::Combatant(_) | Cursor::Stats(_) => {
                return Err(FormulaError::TypeMismatch {
                    alias: name.clone(),
                    path: canonical,
                });
            }
        };
        text = text.replace(&format!("@{name}"), &format!("({value})"));
    }

    Ok(text)
}

/// Walk one alias path. Every step is a closed match on the current
/// cursor; a segment with no match fails with its index.
fn walk<'a>(
    alias: &str,
    path: &[String],
    ctx: &EvalContext<'a>,
) -> Result<Cursor<'a>, FormulaError> {
    let unresolved = |step: usize| FormulaError::UnresolvedAlias {
        alias: alias.to_string(),
        step,
        segment: path.get(step).cloned().unwrap_or_default(),
    };

    let root = path.first().ok_or_else(|| unresolved(0))?;
    let mut cursor = match root.as_str() {
        "caster" => Cursor::Combatant(ctx.caster),
        "target" => Cursor::Combatant(ctx.target.ok_or_else(|| unresolved(0))?),
        _ => return Err(unresolved(0)),
    };

    for (offset, segment) in path[1..].iter().enumerate() {
        let step = offset + 1;
        cursor = match cursor {
            Cursor::Combatant(combatant) => match segment.as_str() {
                "health" => Cursor::Number(combatant.player.health),
                "mana" => Cursor::Number(combatant.player.mana as f64),
                "xp" => Cursor::Number(combatant.player.xp as f64),
                "stats" => Cursor::Stats(&combatant.sheet.stats),
                key => combatant
                    .sheet
                    .proficiencies
                    .get(key)
                    .map(Cursor::Proficiency)
                    .ok_or_else(|| unresolved(step))?,
            },
            Cursor::Stats(stats) => {
                if let Some(base) = stats.base(segment) {
                    Cursor::Number(base as f64)
                } else if let Some(sub) = stats.sub_stats.get(segment) {
                    Cursor::Nested(sub)
                } else {
                    return Err(unresolved(step));
                }
            }
            // walked past a terminal value
            Cursor::Number(_) | Cursor::Nested(_) | Cursor::Proficiency(_) => {
                return Err(unresolved(step));
            }
        };
    }

    Ok(cursor)
}

/// Render whole values without a trailing `.0` so expanded formulas stay
/// readable.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Document, EntityPayload};
    use crate::domain::entities::{Proficiency, ProficiencyBridge};
    use crate::domain::value_objects::{PlayerId, SheetId};
    use std::collections::BTreeMap;

    fn base_document() -> Document {
        let mut doc = Document::default();
        doc.create(EntityPayload::Proficiency(Proficiency {
            id: ProficiencyId::new("swords"),
            name: "Swords".to_string(),
            description: String::new(),
            use_count: 3,
            growth_rate: 0.2,
        }))
        .unwrap();

        let mut sheet = crate::domain::entities::Sheet {
            id: SheetId::new("hero"),
            name: "Hero".to_string(),
            dm_only: false,
            xp_given_when_slain: 10,
            xp_cap: 100,
            stats: Stats {
                strength: 4,
                dexterity: 2,
                constitution: 3,
                perception: 1,
                arcane: 0,
                will: 2,
                sub_stats: BTreeMap::new(),
            },
            proficiencies: BTreeMap::new(),
            items: BTreeMap::new(),
            actions: BTreeMap::new(),
            slain_record: BTreeMap::new(),
        };
        sheet.proficiencies.insert(
            "swordplay".to_string(),
            ProficiencyBridge::new(ProficiencyId::new("swords")),
        );
        doc.create(EntityPayload::Sheet(sheet)).unwrap();

        doc.create(EntityPayload::Player(Player {
            id: PlayerId::new("p1"),
            sheet_id: SheetId::new("hero"),
            name: "P1".to_string(),
            health: 20.0,
            mana: 10,
            xp: 0,
            augments: BTreeMap::new(),
            enemies_slain: BTreeMap::new(),
        }))
        .unwrap();
        doc
    }

    fn context(doc: &Document) -> EvalContext<'_> {
        EvalContext {
            catalog: &doc.catalog,
            caster: Combatant {
                player: doc.players.get("p1").unwrap(),
                sheet: doc.catalog.sheets.get("hero").unwrap(),
            },
            target: None,
        }
    }

    #[test]
    fn test_base_stat_substitution() {
        let doc = base_document();
        let formula =
            Formula::literal("1 + @str * 5").with_alias("str", &["caster", "stats", "strength"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        assert_eq!(result.text, "1 + (4) * 5");
        assert!(result.consulted.is_empty());
    }

    #[test]
    fn test_player_fields_are_navigable() {
        let doc = base_document();
        let formula = Formula::literal("@hp / @mp")
            .with_alias("hp", &["caster", "health"])
            .with_alias("mp", &["caster", "mana"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        assert_eq!(result.text, "(20) / (10)");
    }

    #[test]
    fn test_proficiency_effective_value_and_consultation() {
        let doc = base_document();
        let formula =
            Formula::literal("@skill * 10").with_alias("skill", &["caster", "swordplay"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        // min(0.2 * 3, 1) = 0.6
        assert_eq!(result.text, "(0.6) * 10");
        assert_eq!(result.consulted, vec![ProficiencyId::new("swords")]);
    }

    #[test]
    fn test_saturated_proficiency_caps_at_one() {
        let mut doc = base_document();
        doc.catalog
            .proficiencies
            .get_mut("swords")
            .unwrap()
            .use_count = 50;
        let formula = Formula::literal("@skill").with_alias("skill", &["caster", "swordplay"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        assert_eq!(result.text, "(1)");
    }

    #[test]
    fn test_nested_sub_stat_expansion() {
        let mut doc = base_document();
        doc.catalog
            .sheets
            .get_mut("hero")
            .unwrap()
            .stats
            .sub_stats
            .insert(
                "attack".to_string(),
                Formula::literal("@str + 2").with_alias("str", &["caster", "stats", "strength"]),
            );
        let formula =
            Formula::literal("@atk * 2").with_alias("atk", &["caster", "stats", "attack"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        assert_eq!(result.text, "((4) + 2) * 2");
    }

    #[test]
    fn test_two_formula_cycle_fails_fast() {
        let mut doc = base_document();
        let subs = &mut doc.catalog.sheets.get_mut("hero").unwrap().stats.sub_stats;
        subs.insert(
            "a".to_string(),
            Formula::literal("@b").with_alias("b", &["caster", "stats", "b"]),
        );
        subs.insert(
            "b".to_string(),
            Formula::literal("@a").with_alias("a", &["caster", "stats", "a"]),
        );

        let formula = Formula::literal("@a").with_alias("a", &["caster", "stats", "a"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        assert!(matches!(err, FormulaError::CyclicReference { .. }));
    }

    #[test]
    fn test_self_referencing_formula_fails_fast() {
        let mut doc = base_document();
        doc.catalog
            .sheets
            .get_mut("hero")
            .unwrap()
            .stats
            .sub_stats
            .insert(
                "a".to_string(),
                Formula::literal("1 + @a").with_alias("a", &["caster", "stats", "a"]),
            );
        let formula = Formula::literal("@a").with_alias("a", &["caster", "stats", "a"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::CyclicReference { path } if path == "caster.stats.a"
        ));
    }

    #[test]
    fn test_unresolved_alias_names_failing_step() {
        let doc = base_document();
        let formula =
            Formula::literal("@x").with_alias("x", &["caster", "stats", "charisma"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        match err {
            FormulaError::UnresolvedAlias { alias, step, segment } => {
                assert_eq!(alias, "x");
                assert_eq!(step, 2);
                assert_eq!(segment, "charisma");
            }
            other => panic!("expected UnresolvedAlias, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_target_is_unresolved_at_root() {
        let doc = base_document();
        let formula = Formula::literal("@th").with_alias("th", &["target", "health"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::UnresolvedAlias { step: 0, .. }
        ));
    }

    #[test]
    fn test_target_side_navigation() {
        let doc = base_document();
        let mut ctx = context(&doc);
        ctx.target = Some(ctx.caster);
        let formula = Formula::literal("@th").with_alias("th", &["target", "health"]);
        let result = evaluate(&formula, &ctx).unwrap();
        assert_eq!(result.text, "(20)");
    }

    #[test]
    fn test_non_terminal_landing_is_type_mismatch() {
        let doc = base_document();
        let formula = Formula::literal("@s").with_alias("s", &["caster", "stats"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        assert!(matches!(err, FormulaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_dangling_proficiency_bridge_reported() {
        let mut doc = base_document();
        // break the bridge behind the store's back
        doc.catalog
            .sheets
            .get_mut("hero")
            .unwrap()
            .proficiencies
            .insert(
                "ghost".to_string(),
                ProficiencyBridge::new(ProficiencyId::new("missing")),
            );
        let formula = Formula::literal("@g").with_alias("g", &["caster", "ghost"]);
        let err = evaluate(&formula, &context(&doc)).unwrap_err();
        assert!(matches!(err, FormulaError::DanglingReference(_)));
    }

    #[test]
    fn test_longer_alias_names_substitute_first() {
        let doc = base_document();
        let formula = Formula::literal("@str + @strength")
            .with_alias("str", &["caster", "stats", "dexterity"])
            .with_alias("strength", &["caster", "stats", "strength"]);
        let result = evaluate(&formula, &context(&doc)).unwrap();
        assert_eq!(result.text, "(2) + (4)");
    }
}
