//! Monster chase-and-strike behaviour.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::services::{EffectKind, Effects, Navigation, SoundCue};
use crate::systems::attacks::ProjectileBundle;
use crate::systems::clock::MatchClock;
use crate::systems::damage::{DamageQueue, DamageSource};
use bevy_ecs::prelude::*;

/// Nearest living participant; equal distances go to the lower entity.
fn nearest_participant(from: Vec2, participants: &[(Entity, Vec2)]) -> Option<(Entity, Vec2)> {
    participants.iter().copied().min_by(|(ea, pa), (eb, pb)| {
        from.distance(*pa)
            .partial_cmp(&from.distance(*pb))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ea.cmp(eb))
    })
}

/// Monsters chase the nearest living participant and attack on cooldown once
/// in reach. Melee monsters hit directly, ranged monsters fire ownerless
/// projectiles.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, Position, Health, Participant
/// - Writes: Navigation, DamageQueue, Effects, Facing, MonsterBrain, Commands
#[allow(clippy::too_many_arguments)]
pub fn monster_behavior_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    mut nav: ResMut<Navigation>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    mut monsters: Query<(Entity, &Position, &mut Facing, &Health, &mut MonsterBrain)>,
    participants: Query<(Entity, &Position, &Health), With<Participant>>,
) {
    let now = clock.now();
    let living: Vec<(Entity, Vec2)> = participants
        .iter()
        .filter(|(_, _, h)| h.is_alive())
        .map(|(e, p, _)| (e, p.as_vec()))
        .collect();

    for (entity, position, mut facing, health, mut brain) in monsters.iter_mut() {
        if !health.is_alive() {
            continue;
        }
        let here = position.as_vec();
        let Some((target, target_pos)) = nearest_participant(here, &living) else {
            brain.target = None;
            nav.0.clear_destination(entity);
            continue;
        };
        brain.target = Some(target);

        if here.distance(target_pos) > brain.profile.attack_range {
            nav.0.set_destination(entity, target_pos);
            continue;
        }

        nav.0.clear_destination(entity);
        facing.turn_to(target_pos - here);
        if !brain.can_attack(now) {
            continue;
        }
        brain.last_attack_at = Some(now);

        match brain.kind {
            MonsterKind::Melee => {
                damage.push(target, brain.profile.damage, DamageSource::Monster);
            }
            MonsterKind::Ranged => {
                commands.spawn(ProjectileBundle::new(
                    here,
                    Projectile {
                        owner: None,
                        user: ProjectileUser::Monster,
                        damage: brain.profile.damage,
                        direction: facing.0,
                        speed: config.weapons.projectile_speed,
                        remaining: config.weapons.projectile_lifetime,
                        explosion_radius: 0.0,
                    },
                ));
                effects.spawn(EffectKind::MuzzleFlash, here, facing.0);
            }
        }
        effects.sound(SoundCue::Attack, here);
    }
}
