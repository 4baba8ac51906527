//! Damage funnel and death handling.
//!
//! Every hit in a tick is queued as a `DamageEvent`. `damage_apply_system`
//! applies them all in order, so simultaneous hits land before any death is
//! finalized, and records each alive to dead transition exactly once.
//! `death_system` then settles score, gold, crown and despawns.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::ledger::ScoreLedger;
use crate::rng::GameRng;
use crate::safe_zone::SafeZone;
use crate::scheduler::{TaskDomain, TaskKind, TaskScheduler};
use crate::services::{Currency, EffectKind, Effects, Navigation, SoundCue};
use crate::systems::clock::MatchClock;
use bevy_ecs::prelude::*;

/// Who dealt a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    Participant(Entity),
    Monster,
    SafeZone,
    /// Ownerless projectiles and other unattributed hits.
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub target: Entity,
    pub amount: f32,
    pub source: DamageSource,
}

#[derive(Resource, Debug, Default)]
pub struct DamageQueue(pub Vec<DamageEvent>);

impl DamageQueue {
    pub fn push(&mut self, target: Entity, amount: f32, source: DamageSource) {
        self.0.push(DamageEvent {
            target,
            amount,
            source,
        });
    }
}

/// A body that died this tick, with the participant credited for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathRecord {
    pub victim: Entity,
    pub killer: Option<Entity>,
}

#[derive(Resource, Debug, Default)]
pub struct PendingDeaths(pub Vec<DeathRecord>);

/// Update kill attribution for one hit. Monster blows clear it, zone and
/// environment hits leave it alone.
pub fn attribute_hit(last: &mut LastAttacker, target: Entity, source: DamageSource) {
    match source {
        DamageSource::Participant(attacker) if attacker != target => last.0 = Some(attacker),
        DamageSource::Participant(_) => {}
        DamageSource::Monster => last.0 = None,
        DamageSource::SafeZone | DamageSource::Environment => {}
    }
}

/// Applies queued damage.
///
/// ## Data Access
/// - Writes: DamageQueue, PendingDeaths, Health, LastAttacker
pub fn damage_apply_system(
    mut queue: ResMut<DamageQueue>,
    mut deaths: ResMut<PendingDeaths>,
    mut bodies: Query<(&mut Health, &mut LastAttacker)>,
) {
    for event in queue.0.drain(..) {
        let Ok((mut health, mut last)) = bodies.get_mut(event.target) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        attribute_hit(&mut last, event.target, event.source);
        if health.apply_damage(event.amount) == DamageOutcome::Killed {
            deaths.0.push(DeathRecord {
                victim: event.target,
                killer: last.0,
            });
        }
    }
}

/// Credit match gold to a participant, forwarding it to the persistent store
/// for player-controlled participants.
pub fn award_gold(
    ledger: &mut ScoreLedger,
    currency: &mut Currency,
    actor: ActorId,
    is_bot: bool,
    amount: i32,
) {
    if amount == 0 || !ledger.credit_gold(actor, amount) {
        return;
    }
    if !is_bot {
        currency.deposit(amount);
    }
}

/// Settles every death recorded this tick.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, DeathBehavior, Position, ActorId, Participant
/// - Writes: PendingDeaths, ScoreLedger, Currency, TaskScheduler, SafeZone,
///   Navigation, GameRng, Effects, Commands
#[allow(clippy::too_many_arguments)]
pub fn death_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    mut deaths: ResMut<PendingDeaths>,
    mut ledger: ResMut<ScoreLedger>,
    mut currency: ResMut<Currency>,
    mut scheduler: ResMut<TaskScheduler>,
    mut zone: ResMut<SafeZone>,
    mut nav: ResMut<Navigation>,
    mut rng: ResMut<GameRng>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    bodies: Query<(&DeathBehavior, &Position)>,
    participants: Query<(&ActorId, &Participant)>,
) {
    let now = clock.now();

    for DeathRecord { victim, killer } in deaths.0.drain(..) {
        let Ok((behavior, position)) = bodies.get(victim) else {
            continue;
        };
        let at = position.as_vec();

        scheduler.cancel_owner(victim);
        zone.release(victim);
        nav.0.clear_destination(victim);
        effects.spawn(EffectKind::DeathBurst, at, Vec2::FORWARD);
        effects.sound(SoundCue::Death, at);

        let killer = killer.and_then(|k| participants.get(k).ok().map(|(id, p)| (*id, p.is_bot)));

        match *behavior {
            DeathBehavior::Participant => {
                let Ok((victim_id, _)) = participants.get(victim) else {
                    continue;
                };
                match killer {
                    Some((killer_id, killer_is_bot)) => {
                        if let Some(outcome) = ledger.record_actor_kill(killer_id, *victim_id) {
                            log::info!("{:?} eliminated {:?}", killer_id, victim_id);
                            if outcome.bounty_paid > 0 && !killer_is_bot {
                                currency.deposit(outcome.bounty_paid);
                            }
                        }
                    }
                    None => {
                        if ledger.drop_crown(*victim_id, at) {
                            log::info!("{:?} died without a killer and dropped the crown", victim_id);
                        } else {
                            log::info!("{:?} died without a killer", victim_id);
                        }
                    }
                }
            }
            DeathBehavior::Monster { gold_bounty } => {
                if let Some((killer_id, killer_is_bot)) = killer {
                    ledger.record_monster_kill(killer_id);
                    award_gold(&mut ledger, &mut currency, killer_id, killer_is_bot, gold_bounty);
                }
                scheduler.schedule(
                    now + config.monsters.despawn_delay,
                    Some(victim),
                    TaskDomain::Lifecycle,
                    TaskKind::Despawn,
                );
            }
            DeathBehavior::Destructible {
                gold_reward,
                drop_chance,
            } => {
                if let Some((killer_id, killer_is_bot)) = killer {
                    award_gold(&mut ledger, &mut currency, killer_id, killer_is_bot, gold_reward);
                }
                if rng.chance(drop_chance) {
                    let kind = if rng.chance(0.5) {
                        PickupKind::Gold(config.destructibles.dropped_gold)
                    } else {
                        PickupKind::HealthRestore(config.destructibles.health_restore_amount)
                    };
                    commands.spawn(ItemBundle::new(at, kind, config.arena.item_pickup_radius));
                }
                if let Some(mut entity) = commands.get_entity(victim) {
                    entity.despawn();
                }
                nav.0.forget(victim);
            }
        }
    }
}
