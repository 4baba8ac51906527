//! Crown and item pickups, and crown hold time.
//!
//! Contested pickups go to the living participant with the lowest id within
//! reach, so the outcome does not depend on query iteration order.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::ledger::{CrownState, ScoreLedger};
use crate::services::{Currency, EffectKind, Effects, SoundCue};
use crate::systems::clock::DeltaTime;
use crate::systems::damage::award_gold;
use bevy_ecs::prelude::*;

/// Collects the dropped crown and any items touched this tick.
///
/// ## Data Access
/// - Reads: MatchConfig, ActorId, Participant, Position, Pickup
/// - Writes: ScoreLedger, Currency, Effects, Health, Commands
#[allow(clippy::too_many_arguments)]
pub fn pickup_system(
    config: Res<MatchConfig>,
    mut ledger: ResMut<ScoreLedger>,
    mut currency: ResMut<Currency>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    mut participants: Query<(Entity, &ActorId, &Participant, &Position, &mut Health)>,
    items: Query<(Entity, &Position, &Pickup)>,
) {
    let mut living: Vec<(ActorId, Entity, bool, Vec2)> = participants
        .iter()
        .filter(|(.., h)| h.is_alive())
        .map(|(e, id, p, pos, _)| (*id, e, p.is_bot, pos.as_vec()))
        .collect();
    if living.is_empty() {
        return;
    }
    living.sort_by_key(|(id, ..)| *id);

    if let CrownState::Dropped(at) = ledger.crown() {
        let radius = config.arena.crown_pickup_radius;
        if let Some((id, ..)) = living.iter().find(|(.., pos)| pos.distance(at) <= radius) {
            if ledger.handle_crown_pickup(*id) {
                log::info!("{:?} picked up the crown", id);
                effects.spawn(EffectKind::CrownPickup, at, Vec2::FORWARD);
                effects.sound(SoundCue::Crown, at);
            }
        }
    }

    let mut floor: Vec<(Entity, Vec2, PickupKind)> = items
        .iter()
        .map(|(e, pos, pickup)| (e, pos.as_vec(), pickup.kind))
        .collect();
    floor.sort_by_key(|(e, ..)| *e);

    let radius = config.arena.item_pickup_radius;
    for (item, at, kind) in floor {
        let Some(&(id, entity, is_bot, _)) = living.iter().find(|(.., pos)| pos.distance(at) <= radius) else {
            continue;
        };
        match kind {
            PickupKind::Gold(amount) => award_gold(&mut ledger, &mut currency, id, is_bot, amount),
            PickupKind::HealthRestore(amount) => {
                if let Ok((.., mut health)) = participants.get_mut(entity) {
                    health.heal(amount);
                }
            }
        }
        effects.spawn(EffectKind::ItemPickup, at, Vec2::FORWARD);
        effects.sound(SoundCue::Pickup, at);
        if let Some(mut e) = commands.get_entity(item) {
            e.despawn();
        }
    }
}

/// Accrues crown hold time for the current holder.
///
/// ## Data Access
/// - Reads: DeltaTime
/// - Writes: ScoreLedger
pub fn crown_hold_system(dt: Res<DeltaTime>, mut ledger: ResMut<ScoreLedger>) {
    ledger.tick(dt.0);
}
