//! AI systems for bot participants.
//!
//! Bots run in three stages every tick:
//!
//! 1. **Perception** (every `detection_interval`) - reads the spatial grid and
//!    records visible targets, items, the crown and incoming fire.
//! 2. **Decision** (every `decision_interval`) - picks the top-level state from
//!    the last perception, top priority first:
//!    Flee, SeekCrown, Combat, SeekItem, Patrol.
//! 3. **Behaviour** (every tick) - executes the current state: moving,
//!    aiming, firing, skills and dodges. A combat target that dies, leaves
//!    detection range or breaks line of sight drops the bot back to Patrol
//!    immediately, without waiting for the next decision.
//!
//! ## Parallel Feature
//!
//! With `--features parallel` the perception gather runs on rayon. It only
//! reads the grid, the obstacle field and a snapshot of bounties, so each
//! bot's perception is independent; results are written back sequentially.

use crate::components::*;
use crate::config::{BotProfile, MatchConfig};
use crate::geometry::Vec2;
use crate::ledger::{CrownState, ScoreLedger};
use crate::rng::GameRng;
use crate::services::Navigation;
use crate::spatial::SpatialGrid;
use crate::systems::actions::{ActionRequest, ActionRequests};
use crate::systems::clock::MatchClock;
use crate::targeting::{select_combat_target, Candidate, CandidateClass, ObstacleField, TargetWeights};
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Health above `threshold * FLEE_RECOVERY` ends a flight.
pub const FLEE_RECOVERY: f32 = 1.5;

/// Skills a bot may roll for in combat.
const COMBAT_SKILLS: [ActionKind; 3] = [ActionKind::Skill1, ActionKind::Skill2, ActionKind::Ultimate];

// ============================================================================
// PERCEPTION
// ============================================================================

/// Read-only data one bot needs to perceive.
#[derive(Debug, Clone, Copy)]
struct Observer {
    entity: Entity,
    position: Vec2,
    detection_radius: f32,
    threat_radius: f32,
    knows_crown: bool,
}

/// Shared read-only view of the arena for one perception pass.
struct ArenaView<'a> {
    grid: &'a SpatialGrid,
    obstacles: &'a ObstacleField,
    bounties: &'a HashMap<Entity, i32>,
    /// Position and owner of every projectile in flight.
    projectiles: &'a [(Vec2, Option<Entity>)],
    crown: Option<Vec2>,
}

/// Compute what `observer` sees. Pure; safe to call in parallel.
fn perceive(observer: &Observer, view: &ArenaView) -> Perception {
    let eye = observer.position;
    let mut perception = Perception::default();

    for entry in view.grid.query_radius(eye.x, eye.y, observer.detection_radius) {
        if entry.entity == observer.entity {
            continue;
        }
        let at = entry.position();
        if !view.obstacles.line_of_sight(eye, at) {
            continue;
        }
        match entry.kind {
            BodyKind::Participant => perception.targets.push(Candidate {
                id: entry.entity,
                class: CandidateClass::Participant,
                position: at,
                alive: true,
                bounty: view.bounties.get(&entry.entity).copied().unwrap_or(0),
            }),
            BodyKind::Monster => perception.targets.push(Candidate {
                id: entry.entity,
                class: CandidateClass::Monster,
                position: at,
                alive: true,
                bounty: 0,
            }),
            BodyKind::Item => perception.items.push((entry.entity, at)),
            BodyKind::Destructible => {}
        }
    }
    let by_distance = |a: Vec2, b: Vec2| {
        a.distance(eye)
            .partial_cmp(&b.distance(eye))
            .unwrap_or(std::cmp::Ordering::Equal)
    };
    perception.targets.sort_by(|a, b| by_distance(a.position, b.position));
    perception.items.sort_by(|a, b| by_distance(a.1, b.1));

    // Once seen, the crown stays known and is tracked wherever it goes
    perception.crown = view
        .crown
        .filter(|c| observer.knows_crown || c.distance(eye) <= observer.detection_radius);

    perception.threatened = view
        .projectiles
        .iter()
        .any(|(at, owner)| *owner != Some(observer.entity) && at.distance(eye) <= observer.threat_radius);

    perception
}

/// Refreshes perception for bots whose detection interval has elapsed.
///
/// ## Data Access
/// - Reads: MatchClock, SpatialGrid, ObstacleField, ScoreLedger, ActorIndex,
///   Position, ActorId, Projectile
/// - Writes: BotBrain
#[allow(clippy::too_many_arguments)]
pub fn bot_perception_system(
    clock: Res<MatchClock>,
    grid: Res<SpatialGrid>,
    obstacles: Res<ObstacleField>,
    ledger: Res<ScoreLedger>,
    index: Res<ActorIndex>,
    mut bots: Query<(Entity, &Position, &Health, &mut BotBrain)>,
    participants: Query<(Entity, &ActorId, &Position), With<Participant>>,
    projectiles: Query<(&Position, &Projectile)>,
) {
    let now = clock.now();

    // GATHER: bots that are due
    let observers: Vec<Observer> = bots
        .iter()
        .filter(|(_, _, health, brain)| health.is_alive() && now >= brain.next_perception_at)
        .map(|(entity, pos, _, brain)| Observer {
            entity,
            position: pos.as_vec(),
            detection_radius: brain.profile.detection_radius,
            threat_radius: brain.profile.threat_radius,
            knows_crown: brain.perception.crown.is_some(),
        })
        .collect();
    if observers.is_empty() {
        return;
    }

    let bounties: HashMap<Entity, i32> = participants
        .iter()
        .map(|(e, id, _)| (e, ledger.bounty_of(*id)))
        .collect();
    let shots: Vec<(Vec2, Option<Entity>)> = projectiles
        .iter()
        .map(|(p, shot)| (p.as_vec(), shot.owner))
        .collect();
    let crown = match ledger.crown() {
        CrownState::Unspawned => None,
        CrownState::Dropped(at) => Some(at),
        CrownState::Held(holder) => index
            .entity(holder)
            .and_then(|e| participants.get(e).ok())
            .map(|(_, _, p)| p.as_vec()),
    };
    let view = ArenaView {
        grid: &grid,
        obstacles: &obstacles,
        bounties: &bounties,
        projectiles: &shots,
        crown,
    };

    // COMPUTE
    #[cfg(feature = "parallel")]
    let results: Vec<(Entity, Perception)> = observers
        .par_iter()
        .map(|o| (o.entity, perceive(o, &view)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<(Entity, Perception)> = observers
        .iter()
        .map(|o| (o.entity, perceive(o, &view)))
        .collect();

    // APPLY
    for (entity, perception) in results {
        if let Ok((_, _, _, mut brain)) = bots.get_mut(entity) {
            brain.perception = perception;
            brain.next_perception_at = now + brain.profile.detection_interval;
            brain.tactics_due = true;
        }
    }
}

// ============================================================================
// DECISION
// ============================================================================

/// Inputs of one top-level state evaluation.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub current: BotState,
    pub health: f32,
    pub position: Vec2,
    pub holds_crown: bool,
    /// Uniform draw in `0..1` for the item pursuit roll.
    pub item_roll: f32,
    pub profile: &'a BotProfile,
    pub perception: &'a Perception,
}

/// Pick the bot state and combat target. First matching rule wins:
/// flee when hurt, chase a known crown (crown seekers only), fight a visible
/// target, pursue a visible item on a successful roll, otherwise patrol.
/// A fleeing bot only leaves Flee for Patrol, once it has recovered.
pub fn decide_state(input: &DecisionInput) -> (BotState, Option<Entity>) {
    let profile = input.profile;
    let threshold = profile.flee_health_threshold;
    if input.current == BotState::Flee {
        if input.health > threshold * FLEE_RECOVERY {
            return (BotState::Patrol, None);
        }
        return (BotState::Flee, None);
    }
    if input.health < threshold {
        return (BotState::Flee, None);
    }

    if profile.behavior == BotBehavior::CrownSeeker && input.perception.crown.is_some() && !input.holds_crown {
        return (BotState::SeekCrown, None);
    }

    let weights = TargetWeights::new(profile, profile.behavior);
    if let Some(target) = select_combat_target(
        input.position,
        profile.detection_radius,
        &weights,
        &input.perception.targets,
    ) {
        return (BotState::Combat, Some(target));
    }

    if !input.perception.items.is_empty() && input.item_roll < profile.item_priority {
        return (BotState::SeekItem, None);
    }

    (BotState::Patrol, None)
}

/// Re-evaluates the top-level state of bots whose decision interval elapsed.
///
/// ## Data Access
/// - Reads: MatchClock, ScoreLedger, ActorId, Position, Health
/// - Writes: GameRng, Navigation, BotBrain
pub fn bot_decision_system(
    clock: Res<MatchClock>,
    ledger: Res<ScoreLedger>,
    mut rng: ResMut<GameRng>,
    mut nav: ResMut<Navigation>,
    mut bots: Query<(Entity, &ActorId, &Position, &Health, &mut BotBrain)>,
) {
    let now = clock.now();
    let holder = ledger.crown_holder();

    for (entity, id, position, health, mut brain) in bots.iter_mut() {
        if !health.is_alive() || now < brain.next_decision_at {
            continue;
        }
        brain.next_decision_at = now + brain.profile.decision_interval;

        let input = DecisionInput {
            current: brain.state,
            health: health.current,
            position: position.as_vec(),
            holds_crown: holder == Some(*id),
            item_roll: rng.random_f32(),
            profile: &brain.profile,
            perception: &brain.perception,
        };
        let (state, target) = decide_state(&input);

        if target != brain.target {
            brain.engaged_at = now;
            brain.target = target;
        }
        if state != brain.state {
            log::debug!("bot {:?}: {:?} -> {:?}", id, brain.state, state);
            brain.state = state;
            nav.0.clear_destination(entity);
        }
    }
}

// ============================================================================
// BEHAVIOUR
// ============================================================================

/// Executes each bot's current state for one tick.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, ObstacleField, Position, Health, Weapon,
///   ActionState, Pickup
/// - Writes: GameRng, Navigation, ActionRequests, Facing, BotBrain
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn bot_behavior_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    obstacles: Res<ObstacleField>,
    mut rng: ResMut<GameRng>,
    mut nav: ResMut<Navigation>,
    mut requests: ResMut<ActionRequests>,
    mut bots: Query<(Entity, &Position, &mut Facing, &Health, &Weapon, &ActionState, &mut BotBrain)>,
    bodies: Query<(&Position, &Health)>,
    items: Query<&Position, With<Pickup>>,
) {
    let now = clock.now();
    let arena_radius = config.arena.arena_radius;

    for (entity, position, mut facing, health, weapon, actions, mut brain) in bots.iter_mut() {
        if !health.is_alive() {
            continue;
        }
        let here = position.as_vec();
        let profile = brain.profile.clone();

        match brain.state {
            BotState::Idle => {
                brain.state = BotState::Patrol;
            }
            BotState::Patrol => {
                if nav.0.has_arrived(entity) {
                    let wander = here + rng.point_in_disc(profile.patrol_radius);
                    if let Some(point) = nav.0.sample_valid_point(wander, profile.patrol_radius) {
                        nav.0.set_destination(entity, point);
                    }
                }
            }
            BotState::Flee if health.current > profile.flee_health_threshold * FLEE_RECOVERY => {
                brain.disengage();
                nav.0.clear_destination(entity);
            }
            BotState::Flee => {
                let threat = brain.perception.targets.first().map(|c| c.position);
                if nav.0.has_arrived(entity) || nav.0.destination(entity).is_none() {
                    let away = match threat {
                        Some(t) if t != here => (here - t).normalize_or_zero(),
                        _ => rng.point_in_disc(1.0).normalize_or_zero(),
                    };
                    let wanted = here + away * profile.flee_distance;
                    let point = nav
                        .0
                        .sample_valid_point(wanted, profile.flee_distance)
                        .unwrap_or_else(|| crate::systems::movement::clamp_to_arena(wanted, arena_radius));
                    nav.0.set_destination(entity, point);
                }
            }
            BotState::SeekCrown => match brain.perception.crown {
                Some(at) => nav.0.set_destination(entity, at),
                None => brain.disengage(),
            },
            BotState::SeekItem => {
                let nearest = brain
                    .perception
                    .items
                    .iter()
                    .filter_map(|(e, _)| items.get(*e).ok().map(|p| p.as_vec()))
                    .min_by(|a, b| {
                        a.distance(here)
                            .partial_cmp(&b.distance(here))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                match nearest {
                    Some(at) => nav.0.set_destination(entity, at),
                    None => brain.disengage(),
                }
            }
            BotState::Combat | BotState::UseSkill => {
                if brain.state == BotState::UseSkill && actions.active_skill.is_none() {
                    brain.state = BotState::Combat;
                }

                let target = brain
                    .target
                    .and_then(|t| bodies.get(t).ok())
                    .map(|(p, h)| (p.as_vec(), h.is_alive()));
                let Some((target_pos, true)) = target else {
                    brain.disengage();
                    nav.0.clear_destination(entity);
                    continue;
                };
                let distance = here.distance(target_pos);
                if distance > profile.detection_radius || !obstacles.line_of_sight(here, target_pos) {
                    brain.disengage();
                    nav.0.clear_destination(entity);
                    continue;
                }

                let reach = profile.attack_radius.min(weapon.stats.range);
                if distance > reach {
                    nav.0.set_destination(entity, target_pos);
                    continue;
                }

                nav.0.clear_destination(entity);
                facing.turn_to(target_pos - here);

                if now - brain.engaged_at + crate::scheduler::TIME_EPSILON < profile.reaction_time {
                    continue;
                }

                if actions.is_ready(ActionKind::Attack, now) {
                    let jitter = rng.point_in_disc((1.0 - profile.aim_accuracy).max(0.0) * 2.0);
                    requests.0.push(ActionRequest {
                        entity,
                        kind: ActionKind::Attack,
                        aim_at: Some(target_pos + jitter),
                    });
                }

                if brain.tactics_due {
                    brain.tactics_due = false;

                    if actions.active_skill.is_none() && rng.chance(profile.skill_usage_chance) {
                        let pick = COMBAT_SKILLS[rng.inner().gen_range(0..COMBAT_SKILLS.len())];
                        if actions.is_ready(pick, now) {
                            requests.0.push(ActionRequest {
                                entity,
                                kind: pick,
                                aim_at: Some(target_pos),
                            });
                            brain.state = BotState::UseSkill;
                        }
                    }

                    if brain.perception.threatened
                        && !actions.is_dashing()
                        && actions.is_ready(ActionKind::Dash, now)
                        && rng.chance(profile.dodge_chance)
                    {
                        requests.0.push(ActionRequest {
                            entity,
                            kind: ActionKind::Dash,
                            aim_at: None,
                        });
                    }
                }
            }
        }
    }
}
