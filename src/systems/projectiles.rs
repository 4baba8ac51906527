//! Projectile flight and collision.
//!
//! Each projectile sweeps the segment it travels this tick and stops at the
//! first collision that is not ignored. Collisions are single-use: whether the
//! hit delivers damage or not, the projectile is consumed.
//!
//! ## Hit rules
//! - Decorative geometry and items are passed through.
//! - A participant's projectile passes through its owner.
//! - Monster projectiles pass through monsters.
//! - Damage is dealt for participant to monster, monster to participant,
//!   participant to destructible, and participant to participant when the
//!   shot has a recorded owner.
//! - Anything else (solid geometry, ownerless PvP) consumes the shot without
//!   damage.

use crate::components::*;
use crate::geometry::{segment_circle_entry, Vec2};
use crate::services::{EffectKind, Effects, SoundCue};
use crate::spatial::SpatialGrid;
use crate::systems::clock::DeltaTime;
use crate::systems::damage::{DamageQueue, DamageSource};
use crate::targeting::ObstacleField;
use bevy_ecs::prelude::*;

/// Extra broadphase reach covering body radii and movement since the grid
/// was built.
const BROADPHASE_MARGIN: f32 = 3.0;

/// Outcome of a projectile touching a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResolution {
    /// Keep flying.
    Ignore,
    /// Destroy the projectile without damage.
    Consume,
    /// Deliver damage and destroy the projectile.
    Damage,
}

/// Decide what touching `target` does to a projectile.
pub fn resolve_hit(
    user: ProjectileUser,
    owner: Option<Entity>,
    target: Entity,
    kind: BodyKind,
) -> HitResolution {
    match (user, kind) {
        (_, BodyKind::Item) => HitResolution::Ignore,
        (ProjectileUser::Monster, BodyKind::Monster) => HitResolution::Ignore,
        (ProjectileUser::Monster, BodyKind::Participant) => HitResolution::Damage,
        (ProjectileUser::Monster, BodyKind::Destructible) => HitResolution::Consume,
        (ProjectileUser::Participant, _) if owner == Some(target) => HitResolution::Ignore,
        (ProjectileUser::Participant, BodyKind::Monster) => HitResolution::Damage,
        (ProjectileUser::Participant, BodyKind::Destructible) => HitResolution::Damage,
        (ProjectileUser::Participant, BodyKind::Participant) => {
            if owner.is_some() {
                HitResolution::Damage
            } else {
                HitResolution::Consume
            }
        }
    }
}

fn damage_source(projectile: &Projectile) -> DamageSource {
    match (projectile.user, projectile.owner) {
        (ProjectileUser::Monster, _) => DamageSource::Monster,
        (ProjectileUser::Participant, Some(owner)) => DamageSource::Participant(owner),
        (ProjectileUser::Participant, None) => DamageSource::Environment,
    }
}

/// Moves projectiles and resolves their collisions.
///
/// ## Data Access
/// - Reads: DeltaTime, SpatialGrid, ObstacleField, Position, Collider, Health
/// - Writes: DamageQueue, Effects, Projectile, Commands
#[allow(clippy::too_many_arguments)]
pub fn projectile_system(
    dt: Res<DeltaTime>,
    grid: Res<SpatialGrid>,
    obstacles: Res<ObstacleField>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Position, &mut Projectile)>,
    bodies: Query<(&Position, &Collider, &Health), Without<Projectile>>,
) {
    let delta = dt.0;

    for (entity, mut position, mut projectile) in projectiles.iter_mut() {
        let from = position.as_vec();
        let step = projectile.speed * delta;
        let to = from + projectile.direction * step;

        // Nearest non-ignored body along the segment
        let mid = from.lerp(to, 0.5);
        let mut body_hit: Option<(f32, Entity, BodyKind)> = None;
        for entry in grid.query_radius(mid.x, mid.y, step * 0.5 + BROADPHASE_MARGIN) {
            let Ok((body_pos, collider, health)) = bodies.get(entry.entity) else {
                continue;
            };
            if !health.is_alive() {
                continue;
            }
            if resolve_hit(projectile.user, projectile.owner, entry.entity, collider.kind) == HitResolution::Ignore {
                continue;
            }
            let Some(t) = segment_circle_entry(from, to, body_pos.as_vec(), collider.radius) else {
                continue;
            };
            if body_hit.map_or(true, |(best, ..)| t < best) {
                body_hit = Some((t, entry.entity, collider.kind));
            }
        }
        let wall_hit = obstacles.first_solid_hit(from, to);

        let impact = match (body_hit, wall_hit) {
            (Some((t, target, kind)), wall) if wall.map_or(true, |w| t <= w) => Some((t, Some((target, kind)))),
            (_, Some(w)) => Some((w, None)),
            (Some((t, target, kind)), None) => Some((t, Some((target, kind)))),
            (None, None) => None,
        };

        let Some((t, target)) = impact else {
            position.set(to);
            projectile.remaining -= delta;
            if projectile.remaining <= 0.0 {
                commands.entity(entity).despawn();
            }
            continue;
        };

        let point = from.lerp(to, t);
        position.set(point);
        let source = damage_source(&projectile);
        if let Some((target, kind)) = target {
            if resolve_hit(projectile.user, projectile.owner, target, kind) == HitResolution::Damage {
                damage.push(target, projectile.damage, source);
            }
        }

        if projectile.explosion_radius > 0.0 {
            let direct = target.map(|(e, _)| e);
            for entry in grid.query_radius(point.x, point.y, projectile.explosion_radius) {
                if Some(entry.entity) == direct {
                    continue;
                }
                let Ok((body_pos, collider, health)) = bodies.get(entry.entity) else {
                    continue;
                };
                if !health.is_alive() || body_pos.as_vec().distance(point) > projectile.explosion_radius {
                    continue;
                }
                if resolve_hit(projectile.user, projectile.owner, entry.entity, collider.kind) == HitResolution::Damage {
                    damage.push(entry.entity, projectile.damage, source);
                }
            }
            effects.spawn(EffectKind::Explosion, point, projectile.direction);
            effects.sound(SoundCue::Explosion, point);
        }

        commands.entity(entity).despawn();
    }
}
