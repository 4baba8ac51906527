//! Weapon, skill and dash activation.
//!
//! `begin_action` is the single entry point for every action a participant
//! can take, whether requested by the input layer or by a bot. It gates the
//! cooldown, records the use and turns the action into queued work: attack
//! orders resolved later this tick, and scheduler tasks for everything that
//! continues over time.

use crate::components::*;
use crate::config::{MatchConfig, SkillConfig};
use crate::geometry::Vec2;
use crate::scheduler::{TaskDomain, TaskKind, TaskScheduler};
use crate::services::{EffectKind, Effects, Navigation, NavigationService, SoundCue};
use crate::systems::clock::MatchClock;
use bevy_ecs::prelude::*;

// ============================================================================
// QUEUES
// ============================================================================

/// A bot's request for an action this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionRequest {
    pub entity: Entity,
    pub kind: ActionKind,
    /// Point to shoot at. `None` fires along facing, or auto-aims for
    /// player-controlled ranged weapons.
    pub aim_at: Option<Vec2>,
}

#[derive(Resource, Debug, Default)]
pub struct ActionRequests(pub Vec<ActionRequest>);

/// One basic attack waiting to be resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOrder {
    pub attacker: Entity,
    pub aim_at: Option<Vec2>,
}

#[derive(Resource, Debug, Default)]
pub struct AttackQueue(pub Vec<AttackOrder>);

/// Instant area damage from an ultimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaStrike {
    pub owner: Entity,
    pub center: Vec2,
    pub radius: f32,
    pub damage: f32,
}

#[derive(Resource, Debug, Default)]
pub struct AreaStrikes(pub Vec<AreaStrike>);

// ============================================================================
// ACTIVATION
// ============================================================================

/// Shared state needed to start an action.
pub struct ActionContext<'a> {
    pub now: f32,
    pub skills: &'a SkillConfig,
    pub nav: &'a dyn NavigationService,
    pub scheduler: &'a mut TaskScheduler,
    pub attacks: &'a mut AttackQueue,
    pub effects: &'a mut Effects,
}

/// Actor state read by `begin_action`.
#[derive(Debug, Clone, Copy)]
pub struct ActorPose {
    pub position: Vec2,
    pub facing: Vec2,
    pub alive: bool,
}

/// Start `kind` for `entity`. On rejection nothing changes.
pub fn begin_action(
    ctx: &mut ActionContext,
    entity: Entity,
    kind: ActionKind,
    pose: ActorPose,
    aim_at: Option<Vec2>,
    actions: &mut ActionState,
) -> Result<(), ActionRejected> {
    actions.try_begin(kind, ctx.now, pose.alive)?;
    let now = ctx.now;
    let skills = ctx.skills;

    if kind.skill_slot().is_some() {
        // Interrupt whatever skill was running; its cooldown stays.
        ctx.scheduler.cancel(entity, TaskDomain::Skill);
    }

    match kind {
        ActionKind::Attack => {
            ctx.attacks.0.push(AttackOrder {
                attacker: entity,
                aim_at,
            });
        }
        ActionKind::Skill1 => {
            ctx.scheduler.schedule(
                now + skills.skill1_duration,
                Some(entity),
                TaskDomain::Skill,
                TaskKind::SkillEnd,
            );
            ctx.effects.spawn(EffectKind::SpeedBoost, pose.position, pose.facing);
            ctx.effects.sound(SoundCue::Skill, pose.position);
        }
        ActionKind::Skill2 => {
            if skills.skill2_shot_count == 0 {
                actions.active_skill = None;
                return Ok(());
            }
            ctx.attacks.0.push(AttackOrder {
                attacker: entity,
                aim_at,
            });
            if skills.skill2_shot_count > 1 {
                ctx.scheduler.schedule(
                    now + skills.skill2_shot_interval,
                    Some(entity),
                    TaskDomain::Skill,
                    TaskKind::BurstShot {
                        remaining: skills.skill2_shot_count - 1,
                    },
                );
            } else {
                actions.active_skill = None;
            }
            ctx.effects.sound(SoundCue::Skill, pose.position);
        }
        ActionKind::Ultimate => {
            ctx.scheduler.schedule(
                now + skills.ultimate_cast_delay,
                Some(entity),
                TaskDomain::Skill,
                TaskKind::UltimateStrike,
            );
            ctx.effects.spawn(EffectKind::UltimateCast, pose.position, pose.facing);
            ctx.effects.sound(SoundCue::Skill, pose.position);
        }
        ActionKind::Dash => {
            let wanted = pose.position - pose.facing * skills.dash_distance;
            let to = ctx
                .nav
                .sample_valid_point(wanted, skills.dash_distance)
                .unwrap_or(pose.position);
            actions.dash = Some(DashMotion {
                from: pose.position,
                to,
                started_at: now,
                duration: skills.dash_duration,
            });
            ctx.scheduler.cancel(entity, TaskDomain::Dash);
            ctx.scheduler.schedule(
                now + skills.dash_duration,
                Some(entity),
                TaskDomain::Dash,
                TaskKind::DashEnd,
            );
            ctx.effects.spawn(EffectKind::DashTrail, pose.position, pose.facing);
        }
    }

    log::debug!("{:?} started {:?} at {:.2}s", entity, kind, now);
    Ok(())
}

/// Starts the actions bots requested this tick.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, Navigation, Position, Facing, Health
/// - Writes: ActionRequests, TaskScheduler, AttackQueue, Effects, ActionState
#[allow(clippy::too_many_arguments)]
pub fn action_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    nav: Res<Navigation>,
    mut requests: ResMut<ActionRequests>,
    mut scheduler: ResMut<TaskScheduler>,
    mut attacks: ResMut<AttackQueue>,
    mut effects: ResMut<Effects>,
    mut actors: Query<(&Position, &Facing, &Health, &mut ActionState)>,
) {
    if requests.0.is_empty() {
        return;
    }
    let mut ctx = ActionContext {
        now: clock.now(),
        skills: &config.skills,
        nav: nav.0.as_ref(),
        scheduler: &mut scheduler,
        attacks: &mut attacks,
        effects: &mut effects,
    };

    for request in requests.0.drain(..) {
        let Ok((position, facing, health, mut actions)) = actors.get_mut(request.entity) else {
            continue;
        };
        let pose = ActorPose {
            position: position.as_vec(),
            facing: facing.0,
            alive: health.is_alive(),
        };
        if let Err(reason) = begin_action(
            &mut ctx,
            request.entity,
            request.kind,
            pose,
            request.aim_at,
            &mut actions,
        ) {
            log::debug!("{:?} {:?} rejected: {:?}", request.entity, request.kind, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::OpenFieldNavigation;

    struct Harness {
        skills: SkillConfig,
        nav: OpenFieldNavigation,
        scheduler: TaskScheduler,
        attacks: AttackQueue,
        effects: Effects,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                skills: SkillConfig::default(),
                nav: OpenFieldNavigation::new(60.0),
                scheduler: TaskScheduler::new(),
                attacks: AttackQueue::default(),
                effects: Effects::default(),
            }
        }

        fn begin(&mut self, now: f32, kind: ActionKind, actions: &mut ActionState) -> Result<(), ActionRejected> {
            let mut ctx = ActionContext {
                now,
                skills: &self.skills,
                nav: &self.nav,
                scheduler: &mut self.scheduler,
                attacks: &mut self.attacks,
                effects: &mut self.effects,
            };
            let pose = ActorPose {
                position: Vec2::ZERO,
                facing: Vec2::FORWARD,
                alive: true,
            };
            begin_action(&mut ctx, Entity::from_raw(1), kind, pose, None, actions)
        }
    }

    #[test]
    fn test_new_skill_interrupts_running_skill() {
        let mut h = Harness::new();
        let mut actions = ActionState::new(0.2, &h.skills);
        let owner = Entity::from_raw(1);

        h.begin(0.0, ActionKind::Ultimate, &mut actions).unwrap();
        assert_eq!(actions.active_skill, Some(SkillSlot::Ultimate));
        assert_eq!(h.scheduler.len(), 1);

        h.begin(0.1, ActionKind::Skill1, &mut actions).unwrap();
        assert_eq!(actions.active_skill, Some(SkillSlot::Skill1));
        // The pending strike is gone, only the skill 1 end remains
        let due = h.scheduler.take_due(10.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, TaskKind::SkillEnd);
        assert_eq!(due[0].owner, Some(owner));

        // The interrupted ultimate keeps its cooldown
        assert!(h.begin(1.0, ActionKind::Ultimate, &mut actions).is_err());
    }

    #[test]
    fn test_burst_fires_first_shot_immediately() {
        let mut h = Harness::new();
        let mut actions = ActionState::new(0.2, &h.skills);
        h.begin(0.0, ActionKind::Skill2, &mut actions).unwrap();

        assert_eq!(h.attacks.0.len(), 1);
        let due = h.scheduler.take_due(0.1);
        assert_eq!(due[0].kind, TaskKind::BurstShot { remaining: 4 });
    }

    #[test]
    fn test_dash_does_not_touch_skills() {
        let mut h = Harness::new();
        let mut actions = ActionState::new(0.2, &h.skills);
        h.begin(0.0, ActionKind::Skill1, &mut actions).unwrap();
        h.begin(0.0, ActionKind::Dash, &mut actions).unwrap();

        assert_eq!(actions.active_skill, Some(SkillSlot::Skill1));
        let dash = actions.dash.unwrap();
        assert!((dash.to.y + 3.0).abs() < 1e-4);
        assert!(h.scheduler.has_task(Entity::from_raw(1), TaskDomain::Skill));
        assert!(h.scheduler.has_task(Entity::from_raw(1), TaskDomain::Dash));
        assert_eq!(
            h.begin(0.1, ActionKind::Dash, &mut actions),
            Err(ActionRejected::AlreadyDashing)
        );
    }

    #[test]
    fn test_rejected_attack_emits_nothing() {
        let mut h = Harness::new();
        let mut actions = ActionState::new(0.5, &h.skills);
        h.begin(0.0, ActionKind::Attack, &mut actions).unwrap();
        assert!(h.begin(0.3, ActionKind::Attack, &mut actions).is_err());
        assert_eq!(h.attacks.0.len(), 1);
        assert!(h.begin(0.5, ActionKind::Attack, &mut actions).is_ok());
        assert_eq!(h.attacks.0.len(), 2);
    }

    #[test]
    fn test_action_system_drains_requests() {
        let config = MatchConfig::default();
        let mut world = World::new();
        world.insert_resource(MatchClock::new(300.0));
        world.insert_resource(Navigation(Box::new(OpenFieldNavigation::new(60.0))));
        world.insert_resource(ActionRequests::default());
        world.insert_resource(TaskScheduler::new());
        world.insert_resource(AttackQueue::default());
        world.insert_resource(Effects::default());
        let actions = ActionState::new(0.2, &config.skills);
        world.insert_resource(config);

        let bot = world
            .spawn((Position::new(0.0, 0.0), Facing::default(), Health::new(100.0), actions))
            .id();
        world.resource_mut::<ActionRequests>().0.extend([
            ActionRequest { entity: bot, kind: ActionKind::Attack, aim_at: Some(Vec2::new(0.0, 5.0)) },
            ActionRequest { entity: bot, kind: ActionKind::Attack, aim_at: None },
        ]);

        let mut schedule = Schedule::default();
        schedule.add_systems(action_system);
        schedule.run(&mut world);

        assert!(world.resource::<ActionRequests>().0.is_empty());
        let attacks = &world.resource::<AttackQueue>().0;
        assert_eq!(attacks.len(), 1);
        assert_eq!(attacks[0].aim_at, Some(Vec2::new(0.0, 5.0)));
    }
}
