//! Movement system - moves participants and monsters for one step.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::services::Navigation;
use crate::systems::clock::{DeltaTime, MatchClock};
use bevy_ecs::prelude::*;

/// Keep `p` inside the arena disc centred on the origin.
pub fn clamp_to_arena(p: Vec2, arena_radius: f32) -> Vec2 {
    let len = p.length();
    if len <= arena_radius || len == 0.0 {
        p
    } else {
        p * (arena_radius / len)
    }
}

/// System that moves every living body.
///
/// - A dashing participant follows its dash line and nothing else.
/// - Player-controlled participants walk along their `MoveIntent`.
/// - Bots and monsters step toward their navigation destination.
///
/// Facing follows the direction of travel, except for bots holding a combat
/// target, which keep aiming at it.
///
/// ## Data Access
/// - Reads: MatchClock, DeltaTime, MatchConfig, MoveSpeed, Health, ActionState,
///   MoveIntent, BotBrain
/// - Writes: Navigation, Position, Facing
#[allow(clippy::type_complexity)]
pub fn movement_system(
    clock: Res<MatchClock>,
    dt: Res<DeltaTime>,
    config: Res<MatchConfig>,
    mut nav: ResMut<Navigation>,
    mut movers: Query<(
        Entity,
        &mut Position,
        &mut Facing,
        &MoveSpeed,
        &Health,
        Option<&ActionState>,
        Option<&MoveIntent>,
        Option<&BotBrain>,
    )>,
) {
    let now = clock.now();
    let delta = dt.0;
    let arena_radius = config.arena.arena_radius;

    for (entity, mut pos, mut facing, speed, health, actions, intent, brain) in movers.iter_mut() {
        if !health.is_alive() {
            continue;
        }
        let from = pos.as_vec();

        if let Some(dash) = actions.and_then(|a| a.dash) {
            pos.set(clamp_to_arena(dash.position_at(now), arena_radius));
            continue;
        }

        let multiplier = actions.map_or(1.0, |a| a.speed_multiplier(&config.skills));
        let max_step = speed.0 * multiplier * delta;

        let next = match intent {
            Some(intent) => from + intent.0.normalize_or_zero() * max_step,
            None => nav.0.step_agent(entity, from, max_step),
        };
        let next = clamp_to_arena(next, arena_radius);
        pos.set(next);

        let aiming = brain.is_some_and(|b| matches!(b.state, BotState::Combat | BotState::UseSkill) && b.target.is_some());
        if !aiming {
            facing.turn_to(next - from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::OpenFieldNavigation;
    use crate::systems::clock::MatchPhase;

    fn movement_world() -> World {
        let mut world = World::new();
        let mut clock = MatchClock::new(300.0);
        clock.phase = MatchPhase::Running;
        world.insert_resource(clock);
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(MatchConfig::default());
        world.insert_resource(Navigation(Box::new(OpenFieldNavigation::new(60.0))));
        world
    }

    #[test]
    fn test_intent_moves_and_turns() {
        let mut world = movement_world();
        let e = world
            .spawn((
                Position::new(0.0, 0.0),
                Facing::default(),
                MoveSpeed(5.0),
                Health::new(100.0),
                MoveIntent(Vec2::new(2.0, 0.0)),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Position>(e).unwrap().as_vec(), Vec2::new(5.0, 0.0));
        assert_eq!(world.get::<Facing>(e).unwrap().0, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_speed_boost_and_arena_clamp() {
        let mut world = movement_world();
        let skills = world.resource::<MatchConfig>().skills.clone();
        let mut actions = ActionState::new(0.2, &skills);
        actions.active_skill = Some(SkillSlot::Skill1);
        let e = world
            .spawn((
                Position::new(0.0, 50.0),
                Facing::default(),
                MoveSpeed(5.0),
                Health::new(100.0),
                MoveIntent(Vec2::FORWARD),
                actions,
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);
        assert!((world.get::<Position>(e).unwrap().y - 57.5).abs() < 1e-4);

        schedule.run(&mut world);
        assert!((world.get::<Position>(e).unwrap().y - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_navigated_agent_steps_toward_destination() {
        let mut world = movement_world();
        let e = world
            .spawn((Position::new(0.0, 0.0), Facing::default(), MoveSpeed(3.0), Health::new(30.0)))
            .id();
        world
            .resource_mut::<Navigation>()
            .0
            .set_destination(e, Vec2::new(-10.0, 0.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Position>(e).unwrap().as_vec(), Vec2::new(-3.0, 0.0));
        assert_eq!(world.get::<Facing>(e).unwrap().0, Vec2::new(-1.0, 0.0));
    }
}
