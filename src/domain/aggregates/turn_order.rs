//! Turn order - the combat state machine
//!
//! Combat moves through three phases: `Idle` (no turn order), `Active`
//! (a queue of combatants, one on turn) and `AwaitingReaction` (an action
//! was declared and exactly one reaction window is open). `destroy` is
//! legal from any phase and returns to `Idle`, dropping every combat
//! sheet. A rejected transition never changes the current phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::entities::CombatSheet;
use crate::domain::value_objects::{ActionId, PlayerId};

/// Action points every combatant starts a round with
pub const BASE_ACTION_POINTS: u32 = 3;

/// Error types for turn order transitions.
///
/// All of these are reported to the requesting client; none of them
/// disturb the state machine.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("no active turn order")]
    NoActiveTurnOrder,

    #[error("turn order already active")]
    TurnOrderAlreadyActive,

    #[error("cannot build a turn order with no combatants")]
    EmptyTurnOrder,

    #[error("player '{0}' appears twice in the turn order")]
    DuplicateCombatant(PlayerId),

    #[error("player '{0}' is not in the turn order")]
    NotACombatant(PlayerId),

    #[error("it is not player '{0}''s turn")]
    NotYourTurn(PlayerId),

    #[error("player '{id}' has {remaining} action points, needs {cost}")]
    InsufficientActionPoints {
        id: PlayerId,
        remaining: u32,
        cost: u32,
    },

    #[error("no pending reaction to respond to")]
    NoPendingReaction,

    #[error("player '{0}' is not an eligible respondent")]
    NotEligibleRespondent(PlayerId),

    #[error("a reaction is still pending; it must resolve first")]
    ReactionUnresolved,
}

/// How a respondent answers an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Parry,
    Block,
    Dodge,
    /// Answer with an action of the respondent's own
    #[serde(rename = "action")]
    CounterAction,
}

/// An action frozen mid-flight while its reaction window is open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReaction {
    pub actor: PlayerId,
    pub action: ActionId,
    pub victim: Option<PlayerId>,
    /// The only players allowed to answer
    pub respondents: Vec<PlayerId>,
}

/// Queue and per-combatant state while combat is running
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    /// Player ids in initiative order; each appears exactly once
    pub queue: Vec<PlayerId>,
    /// Index into `queue` of the combatant on turn
    pub turn: usize,
    /// 1-based round counter; bumps when the queue wraps
    pub round: u32,
    pub combatants: BTreeMap<PlayerId, CombatSheet>,
}

impl Encounter {
    pub fn on_turn(&self) -> &PlayerId {
        &self.queue[self.turn]
    }
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Active(Encounter),
    AwaitingReaction {
        encounter: Encounter,
        pending: PendingReaction,
    },
}

/// The combat turn order state machine
#[derive(Debug, Default)]
pub struct TurnOrder {
    phase: Phase,
}

impl TurnOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// The running encounter, in either combat phase.
    pub fn encounter(&self) -> Option<&Encounter> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Active(encounter) => Some(encounter),
            Phase::AwaitingReaction { encounter, .. } => Some(encounter),
        }
    }

    pub fn pending_reaction(&self) -> Option<&PendingReaction> {
        match &self.phase {
            Phase::AwaitingReaction { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// Build the queue from rolled initiatives. Sorted by initiative
    /// descending; ties broken by ascending player id so the result is
    /// deterministic regardless of input order.
    pub fn build(&mut self, mut entries: Vec<(PlayerId, i64)>) -> Result<&Encounter, CombatError> {
        if !self.is_idle() {
            return Err(CombatError::TurnOrderAlreadyActive);
        }
        if entries.is_empty() {
            return Err(CombatError::EmptyTurnOrder);
        }
        for window in {
            let mut ids: Vec<_> = entries.iter().map(|(id, _)| id.clone()).collect();
            ids.sort();
            ids
        }
        .windows(2)
        {
            if window[0] == window[1] {
                return Err(CombatError::DuplicateCombatant(window[0].clone()));
            }
        }

        entries.sort_by(|(a_id, a_init), (b_id, b_init)| {
            b_init.cmp(a_init).then_with(|| a_id.cmp(b_id))
        });

        let combatants = entries
            .iter()
            .map(|(id, initiative)| {
                (
                    id.clone(),
                    CombatSheet {
                        player_id: id.clone(),
                        active: true,
                        hidden: false,
                        action_points: BASE_ACTION_POINTS,
                        initiative: *initiative,
                    },
                )
            })
            .collect();

        self.phase = Phase::Active(Encounter {
            queue: entries.into_iter().map(|(id, _)| id).collect(),
            turn: 0,
            round: 1,
            combatants,
        });
        Ok(self.encounter().expect("just entered Active"))
    }

    /// Advance to the next queue position, wrapping to the front (and
    /// bumping the round) after the last entrant. The incoming combatant's
    /// action points are replenished.
    pub fn end_turn(&mut self) -> Result<&Encounter, CombatError> {
        match &mut self.phase {
            Phase::Idle => Err(CombatError::NoActiveTurnOrder),
            Phase::AwaitingReaction { .. } => Err(CombatError::ReactionUnresolved),
            Phase::Active(encounter) => {
                encounter.turn += 1;
                if encounter.turn >= encounter.queue.len() {
                    encounter.turn = 0;
                    encounter.round += 1;
                }
                let next = encounter.queue[encounter.turn].clone();
                if let Some(sheet) = encounter.combatants.get_mut(&next) {
                    sheet.action_points = BASE_ACTION_POINTS;
                }
                Ok(&*encounter)
            }
        }
    }

    /// Declare an action by the combatant on turn, spending its action
    /// point cost. With a non-empty respondent set the reaction window
    /// opens; otherwise the action resolves immediately and combat stays
    /// `Active`.
    pub fn declare_action(
        &mut self,
        actor: PlayerId,
        action: ActionId,
        cost: u32,
        victim: Option<PlayerId>,
        respondents: Vec<PlayerId>,
    ) -> Result<Option<&PendingReaction>, CombatError> {
        let encounter = match &mut self.phase {
            Phase::Idle => return Err(CombatError::NoActiveTurnOrder),
            Phase::AwaitingReaction { .. } => return Err(CombatError::ReactionUnresolved),
            Phase::Active(encounter) => encounter,
        };

        if !encounter.combatants.contains_key(&actor) {
            return Err(CombatError::NotACombatant(actor));
        }
        if encounter.on_turn() != &actor {
            return Err(CombatError::NotYourTurn(actor));
        }
        for respondent in victim.iter().chain(respondents.iter()) {
            if !encounter.combatants.contains_key(respondent) {
                return Err(CombatError::NotACombatant(respondent.clone()));
            }
        }

        let sheet = encounter
            .combatants
            .get_mut(&actor)
            .expect("actor presence checked above");
        if sheet.action_points < cost {
            return Err(CombatError::InsufficientActionPoints {
                id: actor,
                remaining: sheet.action_points,
                cost,
            });
        }
        sheet.action_points -= cost;

        if respondents.is_empty() {
            return Ok(None);
        }

        let encounter = match std::mem::take(&mut self.phase) {
            Phase::Active(encounter) => encounter,
            _ => unreachable!("phase checked above"),
        };
        self.phase = Phase::AwaitingReaction {
            encounter,
            pending: PendingReaction {
                actor,
                action,
                victim,
                respondents,
            },
        };
        Ok(self.pending_reaction())
    }

    /// Answer the open reaction window. Only legal while a reaction is
    /// pending and only for a recorded respondent; everyone else gets a
    /// typed rejection and the window stays open.
    pub fn respond(
        &mut self,
        responder: &PlayerId,
    ) -> Result<PendingReaction, CombatError> {
        match &self.phase {
            Phase::AwaitingReaction { pending, .. } => {
                if !pending.respondents.contains(responder) {
                    return Err(CombatError::NotEligibleRespondent(responder.clone()));
                }
            }
            _ => return Err(CombatError::NoPendingReaction),
        }

        match std::mem::take(&mut self.phase) {
            Phase::AwaitingReaction { encounter, pending } => {
                self.phase = Phase::Active(encounter);
                Ok(pending)
            }
            _ => unreachable!("phase checked above"),
        }
    }

    /// Mark a combatant inactive (downed). Returns whether anything
    /// changed; a no-op outside combat or for non-combatants.
    pub fn deactivate(&mut self, id: &PlayerId) -> bool {
        let encounter = match &mut self.phase {
            Phase::Idle => return false,
            Phase::Active(encounter) => encounter,
            Phase::AwaitingReaction { encounter, .. } => encounter,
        };
        match encounter.combatants.get_mut(id) {
            Some(sheet) => {
                sheet.active = false;
                true
            }
            None => false,
        }
    }

    /// Tear down combat from any phase. All combat sheets and any pending
    /// reaction are dropped.
    pub fn destroy(&mut self) {
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn three_combatants() -> Vec<(PlayerId, i64)> {
        // deliberate tie between a and c
        vec![(id("b"), 10), (id("a"), 15), (id("c"), 15)]
    }

    #[test]
    fn test_build_sorts_by_initiative_then_id() {
        let mut order = TurnOrder::new();
        let encounter = order.build(three_combatants()).unwrap();
        assert_eq!(encounter.queue, vec![id("a"), id("c"), id("b")]);
        assert_eq!(encounter.on_turn(), &id("a"));
        assert_eq!(encounter.round, 1);
    }

    #[test]
    fn test_build_is_deterministic_under_input_order() {
        let mut first = TurnOrder::new();
        let mut shuffled = TurnOrder::new();
        first.build(three_combatants()).unwrap();
        shuffled
            .build(vec![(id("c"), 15), (id("b"), 10), (id("a"), 15)])
            .unwrap();
        assert_eq!(
            first.encounter().unwrap().queue,
            shuffled.encounter().unwrap().queue
        );
    }

    #[test]
    fn test_second_build_rejected_and_queue_preserved() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        let err = order.build(vec![(id("z"), 1)]).unwrap_err();
        assert!(matches!(err, CombatError::TurnOrderAlreadyActive));
        assert_eq!(
            order.encounter().unwrap().queue,
            vec![id("a"), id("c"), id("b")]
        );
    }

    #[test]
    fn test_build_rejects_duplicates_and_empty() {
        let mut order = TurnOrder::new();
        assert!(matches!(
            order.build(vec![]).unwrap_err(),
            CombatError::EmptyTurnOrder
        ));
        assert!(matches!(
            order.build(vec![(id("a"), 1), (id("a"), 2)]).unwrap_err(),
            CombatError::DuplicateCombatant(_)
        ));
        assert!(order.is_idle());
    }

    #[test]
    fn test_initiative_carries_large_stat_sums() {
        let mut order = TurnOrder::new();
        let big = i64::from(i32::MAX) + 20;
        order.build(vec![(id("a"), big), (id("b"), 1)]).unwrap();
        let encounter = order.encounter().unwrap();
        assert_eq!(encounter.combatants[&id("a")].initiative, big);
        assert_eq!(encounter.on_turn(), &id("a"));
    }

    #[test]
    fn test_end_turn_wraps_and_bumps_round() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();

        order.end_turn().unwrap();
        assert_eq!(order.encounter().unwrap().on_turn(), &id("c"));
        order.end_turn().unwrap();
        assert_eq!(order.encounter().unwrap().on_turn(), &id("b"));

        let encounter = order.end_turn().unwrap();
        assert_eq!(encounter.on_turn(), &id("a"));
        assert_eq!(encounter.round, 2);
    }

    #[test]
    fn test_end_turn_replenishes_action_points() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        order
            .declare_action(id("a"), ActionId::new("strike"), 2, None, vec![])
            .unwrap();

        // a's points are spent...
        assert_eq!(
            order.encounter().unwrap().combatants[&id("a")].action_points,
            BASE_ACTION_POINTS - 2
        );

        // ...and restored when their turn comes around again
        order.end_turn().unwrap();
        order.end_turn().unwrap();
        order.end_turn().unwrap();
        assert_eq!(
            order.encounter().unwrap().combatants[&id("a")].action_points,
            BASE_ACTION_POINTS
        );
    }

    #[test]
    fn test_end_turn_from_idle_fails() {
        let mut order = TurnOrder::new();
        assert!(matches!(
            order.end_turn().unwrap_err(),
            CombatError::NoActiveTurnOrder
        ));
    }

    #[test]
    fn test_declare_out_of_turn_rejected() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        let err = order
            .declare_action(id("b"), ActionId::new("strike"), 1, None, vec![])
            .unwrap_err();
        assert!(matches!(err, CombatError::NotYourTurn(_)));
    }

    #[test]
    fn test_declare_with_insufficient_points_rejected() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        let err = order
            .declare_action(
                id("a"),
                ActionId::new("ultimate"),
                BASE_ACTION_POINTS + 1,
                None,
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, CombatError::InsufficientActionPoints { .. }));
        // nothing was spent
        assert_eq!(
            order.encounter().unwrap().combatants[&id("a")].action_points,
            BASE_ACTION_POINTS
        );
    }

    #[test]
    fn test_contested_action_opens_reaction_window() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        let pending = order
            .declare_action(
                id("a"),
                ActionId::new("strike"),
                1,
                Some(id("b")),
                vec![id("b")],
            )
            .unwrap()
            .expect("reaction window should open");
        assert_eq!(pending.actor, id("a"));
        assert_eq!(pending.respondents, vec![id("b")]);
    }

    #[test]
    fn test_uncontested_action_stays_active() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        let pending = order
            .declare_action(id("a"), ActionId::new("dash"), 1, None, vec![])
            .unwrap();
        assert!(pending.is_none());
        assert!(order.pending_reaction().is_none());
    }

    #[test]
    fn test_no_second_action_while_reaction_pending() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        order
            .declare_action(
                id("a"),
                ActionId::new("strike"),
                1,
                Some(id("b")),
                vec![id("b")],
            )
            .unwrap();
        let err = order
            .declare_action(id("a"), ActionId::new("strike"), 1, None, vec![])
            .unwrap_err();
        assert!(matches!(err, CombatError::ReactionUnresolved));
    }

    #[test]
    fn test_ineligible_respondent_rejected_and_window_kept() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        order
            .declare_action(
                id("a"),
                ActionId::new("strike"),
                1,
                Some(id("b")),
                vec![id("b")],
            )
            .unwrap();

        let err = order.respond(&id("c")).unwrap_err();
        assert!(matches!(err, CombatError::NotEligibleRespondent(_)));
        // the pending reaction is unchanged
        let pending = order.pending_reaction().expect("window still open");
        assert_eq!(pending.respondents, vec![id("b")]);
    }

    #[test]
    fn test_eligible_respondent_resolves_to_active() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        order
            .declare_action(
                id("a"),
                ActionId::new("strike"),
                1,
                Some(id("b")),
                vec![id("b")],
            )
            .unwrap();

        let pending = order.respond(&id("b")).unwrap();
        assert_eq!(pending.action, ActionId::new("strike"));
        assert!(order.pending_reaction().is_none());
        assert!(order.encounter().is_some());
    }

    #[test]
    fn test_respond_outside_window_fails() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        assert!(matches!(
            order.respond(&id("b")).unwrap_err(),
            CombatError::NoPendingReaction
        ));
    }

    #[test]
    fn test_deactivate_marks_combatant_downed() {
        let mut order = TurnOrder::new();
        order.build(three_combatants()).unwrap();
        assert!(order.deactivate(&id("b")));
        assert!(!order.encounter().unwrap().combatants[&id("b")].active);
        // unknown combatant and idle phase are no-ops
        assert!(!order.deactivate(&id("z")));
        order.destroy();
        assert!(!order.deactivate(&id("b")));
    }

    #[test]
    fn test_destroy_from_every_phase_returns_to_idle() {
        // from Idle
        let mut order = TurnOrder::new();
        order.destroy();
        assert!(order.is_idle());

        // from Active
        order.build(three_combatants()).unwrap();
        order.destroy();
        assert!(order.is_idle());
        assert!(order.encounter().is_none());

        // from AwaitingReaction
        order.build(three_combatants()).unwrap();
        order
            .declare_action(
                id("a"),
                ActionId::new("strike"),
                1,
                Some(id("b")),
                vec![id("b")],
            )
            .unwrap();
        order.destroy();
        assert!(order.is_idle());
        assert!(order.pending_reaction().is_none());
    }
}
