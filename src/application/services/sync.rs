//! Sync service - turns client requests into state mutations and patches
//!
//! Requests are processed one at a time under the application's write
//! lock. Every mutating request either succeeds and yields a `state_patch`
//! describing exactly what changed, or fails with an `error` response and
//! (for rejected transitions) leaves the state untouched. Patch ops are
//! emitted in the order the mutations happened and must be applied in
//! that order.

use rand::Rng;
use serde_json::json;

use crate::application::dto::{ClientRequest, PatchOp, ServerResponse};
use crate::domain::aggregates::{
    CombatError, Document, DocumentError, GameState, ResponseKind,
};
use crate::domain::entities::{Action, DamageTotal};
use crate::domain::services::{
    evaluate, reduce, Combatant, EvalContext, FormulaError, ReduceError,
};
use crate::domain::value_objects::{PlayerId, ProficiencyId, SheetId};

/// Everything a request can fail with, funneled into one `error` response
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("expanded formula did not reduce: {0}")]
    Reduce(#[from] ReduceError),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Who may answer a contested action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionPolicy {
    /// Only the declared victim
    #[default]
    VictimOnly,
    /// Every combatant except the actor
    AnyOpponent,
}

impl std::str::FromStr for ReactionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "victim_only" => Ok(ReactionPolicy::VictimOnly),
            "any_opponent" => Ok(ReactionPolicy::AnyOpponent),
            other => Err(format!("unknown reaction policy '{other}'")),
        }
    }
}

/// The numbers one action resolves to, before any mitigation
struct Resolution {
    hit: f64,
    damage: f64,
    healing: f64,
    consulted: Vec<ProficiencyId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncService {
    policy: ReactionPolicy,
}

impl SyncService {
    pub fn new(policy: ReactionPolicy) -> Self {
        Self { policy }
    }

    /// Process one request against the game state. Never panics on bad
    /// input; every failure becomes an `error` response carrying the
    /// request's correlation id.
    pub fn handle_request(
        &self,
        state: &mut GameState,
        request: ClientRequest,
    ) -> ServerResponse {
        let request_id = request.request_id().map(str::to_string);
        match self.dispatch(state, request_id.clone(), request) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "request rejected");
                ServerResponse::Error {
                    request_id,
                    message: err.to_string(),
                }
            }
        }
    }

    fn dispatch(
        &self,
        state: &mut GameState,
        request_id: Option<String>,
        request: ClientRequest,
    ) -> Result<ServerResponse, EngineError> {
        match request {
            ClientRequest::GetState { .. } => Ok(ServerResponse::StateSnapshot {
                request_id,
                players: state.document.players.clone(),
                combat: state.combat.encounter().cloned(),
            }),

            ClientRequest::CreateEntity { entity, .. } => {
                let id = entity.entity_id().to_string();
                let mut value = serde_json::to_value(&entity)?;
                if let Some(object) = value.as_object_mut() {
                    object.remove("kind");
                }
                let kind = state.document.create(entity)?;
                tracing::debug!(kind = kind.collection(), %id, "entity created");
                Ok(ServerResponse::StatePatch {
                    request_id,
                    ops: vec![PatchOp::add(format!("{}.{id}", kind.collection()), value)],
                })
            }

            ClientRequest::UpdateEntity {
                entity_id, fields, ..
            } => {
                let kind = state.document.update(&entity_id, &fields)?;
                let prefix = format!("{}.{entity_id}", kind.collection());
                let ops = fields
                    .iter()
                    .map(|(field, value)| {
                        PatchOp::set(format!("{prefix}.{field}"), value.clone())
                    })
                    .collect();
                Ok(ServerResponse::StatePatch { request_id, ops })
            }

            ClientRequest::DeleteEntity { entity_id, .. } => {
                let kind = state.document.delete(&entity_id)?;
                tracing::debug!(kind = kind.collection(), id = %entity_id, "entity deleted");
                Ok(ServerResponse::StatePatch {
                    request_id,
                    ops: vec![PatchOp::remove(format!(
                        "{}.{entity_id}",
                        kind.collection()
                    ))],
                })
            }

            ClientRequest::BuildTurnOrder { .. } => {
                let mut entries = Vec::new();
                for (_, player) in state.document.players.iter() {
                    let sheet = state.document.catalog.sheets.get(player.sheet_id.as_str())?;
                    let roll = rand::thread_rng().gen_range(1..=20_i64);
                    entries.push((player.id.clone(), roll + sheet.stats.dexterity));
                }
                let encounter = state.combat.build(entries)?;
                tracing::info!(combatants = encounter.queue.len(), "turn order built");
                Ok(ServerResponse::StatePatch {
                    request_id,
                    ops: vec![PatchOp::set("combat", serde_json::to_value(encounter)?)],
                })
            }

            ClientRequest::EndTurn { .. } => {
                let encounter = state.combat.end_turn()?;
                let next = encounter.on_turn().clone();
                Ok(ServerResponse::StatePatch {
                    request_id,
                    ops: vec![
                        PatchOp::set("combat.turn", json!(encounter.turn)),
                        PatchOp::set("combat.round", json!(encounter.round)),
                        PatchOp::set(
                            format!("combat.combatants.{next}.action_points"),
                            json!(encounter.combatants[&next].action_points),
                        ),
                    ],
                })
            }

            ClientRequest::DestroyTurnOrder { .. } => {
                state.combat.destroy();
                tracing::info!("turn order destroyed");
                Ok(ServerResponse::StatePatch {
                    request_id,
                    ops: vec![PatchOp::remove("combat")],
                })
            }

            ClientRequest::PerformAction {
                actor_id,
                action_id,
                victim_id,
                ..
            } => {
                let action = state.document.catalog.actions.get(action_id.as_str())?.clone();
                // both sides must resolve before the state machine moves
                combatant(&state.document, &actor_id)?;
                if let Some(victim) = &victim_id {
                    combatant(&state.document, victim)?;
                }

                let contested = action.is_contestable() && victim_id.is_some();
                let respondents = if contested {
                    let encounter = state
                        .combat
                        .encounter()
                        .ok_or(CombatError::NoActiveTurnOrder)?;
                    match self.policy {
                        ReactionPolicy::VictimOnly => {
                            vec![victim_id.clone().expect("contested implies a victim")]
                        }
                        ReactionPolicy::AnyOpponent => encounter
                            .queue
                            .iter()
                            .filter(|id| **id != actor_id)
                            .cloned()
                            .collect(),
                    }
                } else {
                    Vec::new()
                };

                let ap_op = PatchOp::inc(
                    format!("combat.combatants.{actor_id}.action_points"),
                    -f64::from(action.action_point_cost),
                );

                if respondents.is_empty() {
                    // resolves immediately: every formula must evaluate
                    // before a single point is spent, so a bad formula
                    // rejects the whole request
                    let resolution =
                        evaluate_action(&state.document, &actor_id, victim_id.as_ref(), &action)?;
                    state.combat.declare_action(
                        actor_id.clone(),
                        action_id,
                        action.action_point_cost,
                        victim_id.clone(),
                        Vec::new(),
                    )?;
                    let mut ops = vec![ap_op];
                    ops.extend(self.commit_resolution(
                        state,
                        &actor_id,
                        victim_id.as_ref(),
                        &action,
                        resolution,
                        1.0,
                    )?);
                    Ok(ServerResponse::StatePatch { request_id, ops })
                } else {
                    let pending = state
                        .combat
                        .declare_action(
                            actor_id.clone(),
                            action_id,
                            action.action_point_cost,
                            victim_id.clone(),
                            respondents,
                        )?
                        .cloned();
                    let mut ops = vec![ap_op];
                    if let Some(pending) = pending {
                        tracing::debug!(actor = %pending.actor, "reaction window opened");
                        ops.push(PatchOp::set(
                            "combat.pending",
                            serde_json::to_value(&pending)?,
                        ));
                    }
                    Ok(ServerResponse::StatePatch { request_id, ops })
                }
            }

            ClientRequest::RespondToAttack {
                responder_id,
                response_type,
                action_id,
                ..
            } => {
                let pending = state
                    .combat
                    .pending_reaction()
                    .cloned()
                    .ok_or(CombatError::NoPendingReaction)?;
                let action = state
                    .document
                    .catalog
                    .actions
                    .get(pending.action.as_str())?
                    .clone();
                // resolve the counter before the window closes so a bad id
                // leaves the window open
                let counter = match response_type {
                    ResponseKind::CounterAction => {
                        let id = action_id.ok_or_else(|| {
                            EngineError::BadRequest(
                                "responding with an action requires action_id".to_string(),
                            )
                        })?;
                        Some(state.document.catalog.actions.get(id.as_str())?.clone())
                    }
                    _ => None,
                };

                // every formula on both sides must evaluate before the
                // window closes; a failure leaves the reaction pending
                let resolution = evaluate_action(
                    &state.document,
                    &pending.actor,
                    pending.victim.as_ref(),
                    &action,
                )?;
                let counter_resolution = match &counter {
                    Some(counter) => Some(evaluate_action(
                        &state.document,
                        &responder_id,
                        Some(&pending.actor),
                        counter,
                    )?),
                    None => None,
                };

                state.combat.respond(&responder_id)?;

                let scale = match response_type {
                    ResponseKind::Dodge => 0.0,
                    ResponseKind::Parry | ResponseKind::Block => 0.5,
                    ResponseKind::CounterAction => 1.0,
                };

                let mut ops = vec![PatchOp::remove("combat.pending")];
                ops.extend(self.commit_resolution(
                    state,
                    &pending.actor,
                    pending.victim.as_ref(),
                    &action,
                    resolution,
                    scale,
                )?);
                if let (Some(counter), Some(counter_resolution)) =
                    (counter, counter_resolution)
                {
                    ops.extend(self.commit_resolution(
                        state,
                        &responder_id,
                        Some(&pending.actor),
                        &counter,
                        counter_resolution,
                        1.0,
                    )?);
                }
                Ok(ServerResponse::StatePatch { request_id, ops })
            }
        }
    }

    /// Commit an already-evaluated action: damage (scaled by the reaction
    /// outcome), healing, kill bookkeeping and proficiency growth. Callers
    /// evaluate first, so a formula failure never leaves a half-applied
    /// request.
    fn commit_resolution(
        &self,
        state: &mut GameState,
        actor_id: &PlayerId,
        victim_id: Option<&PlayerId>,
        action: &Action,
        resolution: Resolution,
        damage_scale: f64,
    ) -> Result<Vec<PatchOp>, EngineError> {
        let damage = resolution.damage * damage_scale;
        let mut ops = Vec::new();

        // roll feed; clients append, nothing is stored server-side
        ops.push(PatchOp::add(
            "rolls",
            json!({
                "actor": actor_id,
                "action": action.id,
                "hit": resolution.hit,
                "damage": damage,
                "healing": resolution.healing,
            }),
        ));

        if let Some(victim_id) = victim_id {
            if damage != 0.0 {
                let victim = state.document.players.get_mut(victim_id.as_str())?;
                victim.health -= damage;
                let downed = victim.is_downed();
                let victim_sheet_id = victim.sheet_id.clone();
                ops.push(PatchOp::inc(format!("players.{victim_id}.health"), -damage));
                if downed {
                    tracing::info!(victim = %victim_id, "combatant downed");
                    ops.extend(self.record_kill(state, actor_id, victim_id, &victim_sheet_id)?);
                }
            }
        }

        if resolution.healing != 0.0 {
            let recipient_id = victim_id.unwrap_or(actor_id);
            let recipient = state.document.players.get_mut(recipient_id.as_str())?;
            recipient.health += resolution.healing;
            ops.push(PatchOp::inc(
                format!("players.{recipient_id}.health"),
                resolution.healing,
            ));
        }

        for proficiency_id in &resolution.consulted {
            let proficiency = state
                .document
                .catalog
                .proficiencies
                .get_mut(proficiency_id.as_str())?;
            proficiency.use_count += 1;
            ops.push(PatchOp::inc(
                format!("proficiencies.{proficiency_id}.use_count"),
                1.0,
            ));
        }

        Ok(ops)
    }

    /// A victim went down: award the actor the victim sheet's bounty
    /// (capped), bump the actor sheet's kill record and retire the victim
    /// from the running combat.
    fn record_kill(
        &self,
        state: &mut GameState,
        actor_id: &PlayerId,
        victim_id: &PlayerId,
        victim_sheet_id: &SheetId,
    ) -> Result<Vec<PatchOp>, EngineError> {
        let mut ops = Vec::new();

        let bounty = state
            .document
            .catalog
            .sheets
            .get(victim_sheet_id.as_str())?
            .xp_given_when_slain;
        let actor_sheet_id = state.document.players.get(actor_id.as_str())?.sheet_id.clone();
        let cap = state
            .document
            .catalog
            .sheets
            .get(actor_sheet_id.as_str())?
            .xp_cap;

        let actor = state.document.players.get_mut(actor_id.as_str())?;
        actor.award_xp(bounty, cap);
        ops.push(PatchOp::set(format!("players.{actor_id}.xp"), json!(actor.xp)));

        let actor_sheet = state.document.catalog.sheets.get_mut(actor_sheet_id.as_str())?;
        actor_sheet.record_slain(victim_sheet_id.clone());
        let record = &actor_sheet.slain_record[victim_sheet_id.as_str()];
        ops.push(PatchOp::set(
            format!("sheets.{actor_sheet_id}.slain_record.{victim_sheet_id}"),
            serde_json::to_value(record)?,
        ));

        if state.combat.deactivate(victim_id) {
            ops.push(PatchOp::set(
                format!("combat.combatants.{victim_id}.active"),
                json!(false),
            ));
        }

        Ok(ops)
    }
}

fn combatant<'a>(
    document: &'a Document,
    id: &PlayerId,
) -> Result<Combatant<'a>, EngineError> {
    let player = document.players.get(id.as_str())?;
    let sheet = document.catalog.sheets.get(player.sheet_id.as_str())?;
    Ok(Combatant { player, sheet })
}

fn evaluate_action(
    document: &Document,
    actor_id: &PlayerId,
    victim_id: Option<&PlayerId>,
    action: &Action,
) -> Result<Resolution, EngineError> {
    let caster = combatant(document, actor_id)?;
    let target = victim_id.map(|id| combatant(document, id)).transpose()?;
    let ctx = EvalContext {
        catalog: &document.catalog,
        caster,
        target,
    };

    let mut consulted = Vec::new();
    let hit_eval = evaluate(&action.hit_mod, &ctx)?;
    let hit = reduce(&hit_eval.text)?;
    consulted.extend(hit_eval.consulted);

    let damage = total(&action.damage, &ctx, &mut consulted)?;
    let healing = total(&action.healing, &ctx, &mut consulted)?;

    Ok(Resolution {
        hit,
        damage,
        healing,
        consulted,
    })
}

fn total(
    rolls: &DamageTotal,
    ctx: &EvalContext,
    consulted: &mut Vec<ProficiencyId>,
) -> Result<f64, EngineError> {
    let mut sum = 0.0;
    for roll in &rolls.damages {
        let eval = evaluate(&roll.formula, ctx)?;
        sum += reduce(&eval.text)?;
        consulted.extend(eval.consulted);
    }
    Ok(sum)
}
