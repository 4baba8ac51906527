//! Runs scheduler continuations that have come due.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::ledger::ScoreLedger;
use crate::safe_zone::SafeZone;
use crate::scheduler::{ScheduledTask, TaskDomain, TaskKind, TaskScheduler};
use crate::services::{EffectKind, Effects, Navigation, SoundCue, UpgradeBonuses};
use crate::systems::actions::{AreaStrike, AreaStrikes, AttackOrder, AttackQueue};
use crate::systems::clock::MatchClock;
use crate::systems::damage::{DamageQueue, DamageSource};
use bevy_ecs::prelude::*;

/// Pops every due task and runs its continuation. Tasks whose owner is gone
/// or dead are dropped without effect.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, UpgradeBonuses, Health, Participant
/// - Writes: TaskScheduler, ScoreLedger, SafeZone, Navigation, AttackQueue,
///   AreaStrikes, DamageQueue, Effects, Position, ActionState, Commands
#[allow(clippy::too_many_arguments)]
pub fn task_dispatch_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    bonuses: Res<UpgradeBonuses>,
    mut scheduler: ResMut<TaskScheduler>,
    mut ledger: ResMut<ScoreLedger>,
    mut zone: ResMut<SafeZone>,
    mut nav: ResMut<Navigation>,
    mut attacks: ResMut<AttackQueue>,
    mut strikes: ResMut<AreaStrikes>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    mut actors: Query<(&mut Position, &Facing, &Health, &mut ActionState, &Participant)>,
) {
    let now = clock.now();
    let skills = &config.skills;

    for ScheduledTask {
        owner, kind, ..
    } in scheduler.take_due(now)
    {
        match (kind, owner) {
            (TaskKind::CrownSpawn, _) => {
                let at = config.arena.crown_spawn_point;
                if ledger.spawn_crown(at) {
                    effects.spawn(EffectKind::CrownSpawn, at, Vec2::FORWARD);
                    effects.sound(SoundCue::Crown, at);
                }
            }
            (TaskKind::Despawn, Some(entity)) => {
                nav.0.forget(entity);
                if let Some(mut e) = commands.get_entity(entity) {
                    e.despawn();
                }
            }
            (TaskKind::ZoneDamageTick, Some(entity)) => {
                let alive = actors.get(entity).is_ok_and(|(_, _, h, _, _)| h.is_alive());
                if !alive || !zone.is_exposed(entity) {
                    zone.release(entity);
                    continue;
                }
                damage.push(entity, zone.tick_damage(), DamageSource::SafeZone);
                scheduler.schedule(
                    now + zone.tick_interval(),
                    Some(entity),
                    TaskDomain::Zone,
                    TaskKind::ZoneDamageTick,
                );
            }
            (TaskKind::SkillEnd, Some(entity)) => {
                if let Ok((_, _, _, mut actions, _)) = actors.get_mut(entity) {
                    actions.active_skill = None;
                }
            }
            (TaskKind::BurstShot { remaining }, Some(entity)) => {
                let Ok((_, _, health, mut actions, _)) = actors.get_mut(entity) else {
                    continue;
                };
                if !health.is_alive() {
                    actions.active_skill = None;
                    continue;
                }
                attacks.0.push(AttackOrder {
                    attacker: entity,
                    aim_at: None,
                });
                if remaining > 1 {
                    scheduler.schedule(
                        now + skills.skill2_shot_interval,
                        Some(entity),
                        TaskDomain::Skill,
                        TaskKind::BurstShot {
                            remaining: remaining - 1,
                        },
                    );
                } else {
                    actions.active_skill = None;
                }
            }
            (TaskKind::UltimateStrike, Some(entity)) => {
                let Ok((position, facing, health, mut actions, participant)) = actors.get_mut(entity) else {
                    continue;
                };
                if !health.is_alive() {
                    actions.active_skill = None;
                    continue;
                }
                let bonus = if participant.is_bot { 0.0 } else { bonuses.damage };
                let center = position.as_vec();
                strikes.0.push(AreaStrike {
                    owner: entity,
                    center,
                    radius: skills.ultimate_radius,
                    damage: skills.ultimate_damage + bonus,
                });
                effects.spawn(EffectKind::UltimateImpact, center, facing.0);
                effects.sound(SoundCue::Explosion, center);
                scheduler.schedule(
                    now + (skills.ultimate_duration - skills.ultimate_cast_delay).max(0.0),
                    Some(entity),
                    TaskDomain::Skill,
                    TaskKind::SkillEnd,
                );
            }
            (TaskKind::DashEnd, Some(entity)) => {
                if let Ok((mut position, _, _, mut actions, _)) = actors.get_mut(entity) {
                    if let Some(dash) = actions.dash.take() {
                        position.set(dash.to);
                    }
                }
            }
            (kind, None) => {
                log::warn!("task {:?} scheduled without an owner", kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SafeZoneConfig;
    use crate::services::OpenFieldNavigation;
    use crate::systems::clock::MatchPhase;

    fn dispatch_world(now: f32) -> World {
        let config = MatchConfig::default();
        let mut world = World::new();
        let mut clock = MatchClock::new(300.0);
        clock.phase = MatchPhase::Running;
        clock.elapsed = now;
        world.insert_resource(clock);
        world.insert_resource(SafeZone::new(SafeZoneConfig::default()));
        world.insert_resource(config);
        world.insert_resource(UpgradeBonuses {
            damage: 4.0,
            ..Default::default()
        });
        world.insert_resource(TaskScheduler::new());
        world.insert_resource(ScoreLedger::new(10));
        world.insert_resource(Navigation(Box::new(OpenFieldNavigation::new(60.0))));
        world.insert_resource(AttackQueue::default());
        world.insert_resource(AreaStrikes::default());
        world.insert_resource(DamageQueue::default());
        world.insert_resource(Effects::default());
        world
    }

    fn actor(world: &mut World, is_bot: bool) -> Entity {
        let skills = world.resource::<MatchConfig>().skills.clone();
        world
            .spawn((
                Position::new(2.0, 0.0),
                Facing::default(),
                Health::new(100.0),
                ActionState::new(0.2, &skills),
                Participant { is_bot },
            ))
            .id()
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(task_dispatch_system);
        schedule.run(world);
    }

    #[test]
    fn test_crown_spawn_task() {
        let mut world = dispatch_world(30.0);
        world
            .resource_mut::<TaskScheduler>()
            .schedule(30.0, None, TaskDomain::Match, TaskKind::CrownSpawn);
        run(&mut world);
        assert_eq!(
            world.resource::<ScoreLedger>().crown(),
            crate::ledger::CrownState::Dropped(Vec2::ZERO)
        );
        assert!(world.resource::<Effects>().contains(EffectKind::CrownSpawn));
    }

    #[test]
    fn test_ultimate_strike_adds_player_bonus_only() {
        let mut world = dispatch_world(1.0);
        let player = actor(&mut world, false);
        let bot = actor(&mut world, true);
        {
            let mut scheduler = world.resource_mut::<TaskScheduler>();
            scheduler.schedule(1.0, Some(player), TaskDomain::Skill, TaskKind::UltimateStrike);
            scheduler.schedule(1.0, Some(bot), TaskDomain::Skill, TaskKind::UltimateStrike);
        }
        run(&mut world);

        let strikes = &world.resource::<AreaStrikes>().0;
        assert_eq!(strikes.len(), 2);
        assert_eq!(strikes[0].damage, 54.0);
        assert_eq!(strikes[1].damage, 50.0);
        assert_eq!(strikes[0].center, Vec2::new(2.0, 0.0));
        // Skill end follows for the rest of the ultimate window
        assert!(world.resource::<TaskScheduler>().has_task(player, TaskDomain::Skill));
    }

    #[test]
    fn test_burst_counts_down_then_releases_skill() {
        let mut world = dispatch_world(1.0);
        let e = actor(&mut world, false);
        world.get_mut::<ActionState>(e).unwrap().active_skill = Some(SkillSlot::Skill2);
        world
            .resource_mut::<TaskScheduler>()
            .schedule(1.0, Some(e), TaskDomain::Skill, TaskKind::BurstShot { remaining: 1 });
        run(&mut world);

        assert_eq!(world.resource::<AttackQueue>().0.len(), 1);
        assert_eq!(world.get::<ActionState>(e).unwrap().active_skill, None);
        assert!(world.resource::<TaskScheduler>().is_empty());
    }

    #[test]
    fn test_zone_tick_stops_after_reentry() {
        let mut world = dispatch_world(5.0);
        let e = actor(&mut world, false);
        world.resource_mut::<SafeZone>().enroll(e);
        world
            .resource_mut::<TaskScheduler>()
            .schedule(5.0, Some(e), TaskDomain::Zone, TaskKind::ZoneDamageTick);
        run(&mut world);
        assert_eq!(world.resource::<DamageQueue>().0.len(), 1);
        assert!(world.resource::<TaskScheduler>().has_task(e, TaskDomain::Zone));

        // Back inside: the next tick finds the actor released and stops
        world.resource_mut::<SafeZone>().release(e);
        world.resource_mut::<MatchClock>().elapsed = 6.0;
        world.resource_mut::<DamageQueue>().0.clear();
        run(&mut world);
        assert!(world.resource::<DamageQueue>().0.is_empty());
        assert!(!world.resource::<TaskScheduler>().has_task(e, TaskDomain::Zone));
    }

    #[test]
    fn test_dash_end_snaps_to_target() {
        let mut world = dispatch_world(0.2);
        let e = actor(&mut world, false);
        world.get_mut::<ActionState>(e).unwrap().dash = Some(DashMotion {
            from: Vec2::new(2.0, 0.0),
            to: Vec2::new(2.0, -3.0),
            started_at: 0.0,
            duration: 0.2,
        });
        world
            .resource_mut::<TaskScheduler>()
            .schedule(0.2, Some(e), TaskDomain::Dash, TaskKind::DashEnd);
        run(&mut world);

        assert_eq!(world.get::<Position>(e).unwrap().as_vec(), Vec2::new(2.0, -3.0));
        assert!(!world.get::<ActionState>(e).unwrap().is_dashing());
    }
}
