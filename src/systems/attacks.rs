//! Basic attack and ultimate strike resolution.
//!
//! Attack orders queued by `begin_action` and burst shots are turned into
//! melee damage events or projectiles here. Swords hit everything hostile in
//! the forward half-space within reach. Shotguns fire independent pellets and
//! bazookas fire a single explosive shell.
//!
//! Player-controlled ranged attacks without an explicit aim point snap to the
//! auto-aim target, if any.

use crate::combat_math::{area_damage, base_damage, melee_hit, shotgun_spread, AreaCandidate};
use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::rng::GameRng;
use crate::services::{Camera, EffectKind, Effects, SoundCue, UpgradeBonuses};
use crate::spatial::SpatialGrid;
use crate::systems::actions::{AreaStrikes, AttackQueue};
use crate::systems::damage::{DamageQueue, DamageSource};
use crate::targeting::{select_auto_aim_target, AimQuery, Candidate, CandidateClass, ObstacleField};
use bevy_ecs::prelude::*;

/// Bundle for a projectile in flight.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub position: Position,
    pub projectile: Projectile,
}

impl ProjectileBundle {
    pub fn new(at: Vec2, projectile: Projectile) -> Self {
        Self {
            position: at.into(),
            projectile,
        }
    }
}

/// Auto-aim target for a player-controlled ranged attacker.
#[allow(clippy::too_many_arguments)]
fn auto_aim(
    grid: &SpatialGrid,
    obstacles: &ObstacleField,
    camera: &Camera,
    attacker: Entity,
    eye: Vec2,
    forward: Vec2,
    radius: f32,
    cone_deg: f32,
) -> Option<Vec2> {
    let candidates: Vec<Candidate<Vec2>> = grid
        .query_radius(eye.x, eye.y, radius)
        .into_iter()
        .filter(|e| e.entity != attacker)
        .filter_map(|e| {
            let class = match e.kind {
                BodyKind::Participant => CandidateClass::Participant,
                BodyKind::Monster => CandidateClass::Monster,
                BodyKind::Destructible | BodyKind::Item => return None,
            };
            Some(Candidate {
                id: e.position(),
                class,
                position: e.position(),
                alive: true,
                bounty: 0,
            })
        })
        .filter(|c| obstacles.line_of_sight(eye, c.position))
        .collect();

    let query = AimQuery {
        eye,
        forward,
        radius,
        cone_deg,
    };
    select_auto_aim_target(&query, &candidates, camera.0.as_ref())
}

/// Resolves every queued basic attack.
///
/// ## Data Access
/// - Reads: MatchConfig, UpgradeBonuses, Camera, SpatialGrid, ObstacleField,
///   Position, Weapon, Health, Participant
/// - Writes: AttackQueue, GameRng, DamageQueue, Effects, Facing, Commands
#[allow(clippy::too_many_arguments)]
pub fn attack_resolution_system(
    config: Res<MatchConfig>,
    bonuses: Res<UpgradeBonuses>,
    camera: Res<Camera>,
    grid: Res<SpatialGrid>,
    obstacles: Res<ObstacleField>,
    mut attacks: ResMut<AttackQueue>,
    mut rng: ResMut<GameRng>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    mut attackers: Query<(&Position, &mut Facing, &Weapon, &Health, &Participant)>,
    bodies: Query<(&Position, &Health)>,
) {
    let weapons = &config.weapons;

    for order in std::mem::take(&mut attacks.0) {
        let Ok((position, mut facing, weapon, health, participant)) = attackers.get_mut(order.attacker) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        let eye = position.as_vec();
        let stats = weapon.stats;
        let bonus = if participant.is_bot { 0.0 } else { bonuses.damage };
        let hit = base_damage(weapons, weapon.archetype, bonus) as f32;

        let aim_point = match order.aim_at {
            Some(point) => Some(point),
            None if !participant.is_bot && !weapon.archetype.is_melee() => auto_aim(
                &grid,
                &obstacles,
                &camera,
                order.attacker,
                eye,
                facing.0,
                stats.range,
                weapons.auto_aim_angle_deg,
            ),
            None => None,
        };
        if let Some(point) = aim_point {
            facing.turn_to(point - eye);
        }
        let forward = facing.0;

        match weapon.archetype {
            Archetype::Sword => {
                for entry in grid.query_radius(eye.x, eye.y, stats.range) {
                    if entry.entity == order.attacker || entry.kind == BodyKind::Item {
                        continue;
                    }
                    let Ok((target_pos, target_health)) = bodies.get(entry.entity) else {
                        continue;
                    };
                    if target_health.is_alive() && melee_hit(eye, forward, target_pos.as_vec(), stats.range) {
                        damage.push(entry.entity, hit, DamageSource::Participant(order.attacker));
                    }
                }
                effects.spawn(EffectKind::SwordSlash, eye, forward);
            }
            Archetype::Shotgun | Archetype::Bazooka => {
                let pellets: Vec<Vec2> = if weapon.archetype == Archetype::Shotgun {
                    shotgun_spread(rng.inner(), stats.pellet_count, stats.spread_angle_deg)
                        .into_iter()
                        .map(|p| p.apply(forward))
                        .collect()
                } else {
                    vec![forward]
                };
                for direction in pellets {
                    commands.spawn(ProjectileBundle::new(
                        eye,
                        Projectile {
                            owner: Some(order.attacker),
                            user: ProjectileUser::Participant,
                            damage: hit,
                            direction,
                            speed: weapons.projectile_speed,
                            remaining: weapons.projectile_lifetime,
                            explosion_radius: stats.explosion_radius,
                        },
                    ));
                }
                effects.spawn(EffectKind::MuzzleFlash, eye, forward);
            }
        }
        effects.sound(SoundCue::Attack, eye);
    }
}

/// Applies ultimate strikes. They only hit monsters.
///
/// ## Data Access
/// - Reads: Position, Health, MonsterBrain
/// - Writes: AreaStrikes, DamageQueue, Effects
pub fn area_strike_system(
    mut strikes: ResMut<AreaStrikes>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    monsters: Query<(Entity, &Position, &Health), With<MonsterBrain>>,
) {
    if strikes.0.is_empty() {
        return;
    }
    let mut candidates: Vec<AreaCandidate<Entity>> = monsters
        .iter()
        .map(|(e, p, h)| AreaCandidate {
            id: e,
            position: p.as_vec(),
            alive: h.is_alive(),
        })
        .collect();
    candidates.sort_by_key(|c| c.id);

    for strike in strikes.0.drain(..) {
        for (target, amount) in area_damage(strike.center, strike.radius, strike.damage, &candidates) {
            damage.push(target, amount, DamageSource::Participant(strike.owner));
        }
        effects.spawn(EffectKind::Explosion, strike.center, Vec2::FORWARD);
    }
}
