//! Safe-zone phase advance and exposure tracking.

use crate::components::*;
use crate::geometry::Vec2;
use crate::rng::GameRng;
use crate::safe_zone::{SafeZone, ZoneSignal};
use crate::scheduler::{TaskDomain, TaskKind, TaskScheduler};
use crate::services::{EffectKind, Effects, SoundCue};
use crate::systems::clock::{DeltaTime, MatchClock};
use crate::systems::damage::{DamageQueue, DamageSource};
use bevy_ecs::prelude::*;

/// Advances the zone timeline, then enrolls participants who stepped outside
/// into periodic damage and releases those who came back in.
///
/// A newly exposed participant takes one tick of damage immediately and then
/// one per tick interval through `ZoneDamageTick` tasks. Re-entering cancels
/// the pending tick.
///
/// ## Data Access
/// - Reads: DeltaTime, MatchClock, Position, Health, Participant
/// - Writes: SafeZone, GameRng, TaskScheduler, DamageQueue, Effects
#[allow(clippy::too_many_arguments)]
pub fn safe_zone_system(
    dt: Res<DeltaTime>,
    clock: Res<MatchClock>,
    mut zone: ResMut<SafeZone>,
    mut rng: ResMut<GameRng>,
    mut scheduler: ResMut<TaskScheduler>,
    mut damage: ResMut<DamageQueue>,
    mut effects: ResMut<Effects>,
    participants: Query<(Entity, &Position, &Health), With<Participant>>,
) {
    let now = clock.now();

    for signal in zone.advance(dt.0, &mut rng) {
        match signal {
            ZoneSignal::WarningStarted {
                phase,
                next_center,
                next_radius,
            } => {
                log::info!(
                    "zone phase {} warning: next circle ({:.1}, {:.1}) r={:.1}",
                    phase,
                    next_center.x,
                    next_center.y,
                    next_radius
                );
                effects.spawn(EffectKind::ZoneWarning, next_center, Vec2::FORWARD);
                effects.sound(SoundCue::ZoneWarning, next_center);
            }
            ZoneSignal::ShrinkStarted { phase } => {
                log::info!("zone phase {} shrinking", phase);
            }
            ZoneSignal::ShrinkCompleted {
                phase,
                radius,
                damage_per_second,
                ..
            } => {
                log::info!(
                    "zone phase {} complete: r={:.1}, {:.1} dps",
                    phase,
                    radius,
                    damage_per_second
                );
            }
            ZoneSignal::FinalPhaseReached => {
                log::info!("zone reached its final size");
            }
        }
    }

    for (entity, position, health) in participants.iter() {
        if !health.is_alive() {
            if zone.release(entity) {
                scheduler.cancel(entity, TaskDomain::Zone);
            }
            continue;
        }

        if zone.contains(position.as_vec()) {
            if zone.release(entity) {
                scheduler.cancel(entity, TaskDomain::Zone);
            }
        } else if zone.enroll(entity) {
            damage.push(entity, zone.tick_damage(), DamageSource::SafeZone);
            scheduler.schedule(
                now + zone.tick_interval(),
                Some(entity),
                TaskDomain::Zone,
                TaskKind::ZoneDamageTick,
            );
        }
    }
}
