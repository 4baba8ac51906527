//! Engine Integration Bridge
//!
//! Converts match snapshots into a flat `f32` buffer that an engine binding
//! can copy into a packed array without per-field marshalling.
//!
//! # Stable FFI Contract
//!
//! This module defines a **stable binary format** for transferring match state to a
//! presentation layer. The format is designed for:
//! - **Efficiency**: Contiguous f32 array, no allocations on the engine side
//! - **Simplicity**: Fixed stride per record kind, predictable layout
//! - **Stability**: Field order and count are versioned and documented
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (HEADER_SIZE elements)                                   │
//! │   [0] actor_count                                               │
//! │   [1] monster_count                                             │
//! │   [2] projectile_count                                          │
//! │   [3] time         - Elapsed match time (seconds)               │
//! │   [4] remaining    - Seconds left on the match clock            │
//! │   [5] crown_state  - See CROWN_* constants                      │
//! │   [6] crown_x      - Dropped crown position, or holder id in x  │
//! │   [7] crown_y                                                   │
//! │   [8] zone_x       - Safe zone center                           │
//! │   [9] zone_y                                                    │
//! │   [10] zone_radius                                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ ACTORS (actor_count × ACTOR_STRIDE)                             │
//! │   id, x, y, facing_x, facing_y, health, health_max, is_alive,   │
//! │   is_bot, archetype, bounty, has_crown                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ MONSTERS (monster_count × MONSTER_STRIDE)                       │
//! │   kind, x, y, health, health_max, is_alive                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ PROJECTILES (projectile_count × PROJECTILE_STRIDE)              │
//! │   x, y, dir_x, dir_y, from_monster, explosive                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Determinism
//!
//! The buffer is deterministic: given the same `Snapshot`, the output is identical.
//! Records are written in snapshot order.

use crate::components::{Archetype, MonsterKind};
use crate::ledger::CrownState;
use crate::world::Snapshot;

// ============================================================================
// CONSTANTS - STABLE FFI CONTRACT
// ============================================================================

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 11;

/// Number of f32 values per actor.
///
/// **This is part of the stable FFI contract. Do not change without versioning.**
pub const ACTOR_STRIDE: usize = 12;

/// Number of f32 values per monster.
pub const MONSTER_STRIDE: usize = 6;

/// Number of f32 values per projectile.
pub const PROJECTILE_STRIDE: usize = 6;

pub const CROWN_UNSPAWNED: f32 = 0.0;
pub const CROWN_DROPPED: f32 = 1.0;
pub const CROWN_HELD: f32 = 2.0;

// Header offsets
pub const HEADER_ACTOR_COUNT: usize = 0;
pub const HEADER_MONSTER_COUNT: usize = 1;
pub const HEADER_PROJECTILE_COUNT: usize = 2;
pub const HEADER_TIME: usize = 3;
pub const HEADER_REMAINING: usize = 4;
pub const HEADER_CROWN_STATE: usize = 5;
pub const HEADER_CROWN_X: usize = 6;
pub const HEADER_CROWN_Y: usize = 7;
pub const HEADER_ZONE_X: usize = 8;
pub const HEADER_ZONE_Y: usize = 9;
pub const HEADER_ZONE_RADIUS: usize = 10;

// Actor field offsets
pub const ACTOR_ID: usize = 0;
pub const ACTOR_X: usize = 1;
pub const ACTOR_Y: usize = 2;
pub const ACTOR_FACING_X: usize = 3;
pub const ACTOR_FACING_Y: usize = 4;
pub const ACTOR_HEALTH: usize = 5;
pub const ACTOR_HEALTH_MAX: usize = 6;
pub const ACTOR_IS_ALIVE: usize = 7;
pub const ACTOR_IS_BOT: usize = 8;
pub const ACTOR_ARCHETYPE: usize = 9;
pub const ACTOR_BOUNTY: usize = 10;
pub const ACTOR_HAS_CROWN: usize = 11;

// Monster field offsets
pub const MONSTER_KIND: usize = 0;
pub const MONSTER_X: usize = 1;
pub const MONSTER_Y: usize = 2;
pub const MONSTER_HEALTH: usize = 3;
pub const MONSTER_HEALTH_MAX: usize = 4;
pub const MONSTER_IS_ALIVE: usize = 5;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

#[inline]
fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Archetype id: Shotgun 0, Bazooka 1, Sword 2.
#[inline]
pub fn archetype_to_id(archetype: Archetype) -> f32 {
    match archetype {
        Archetype::Shotgun => 0.0,
        Archetype::Bazooka => 1.0,
        Archetype::Sword => 2.0,
    }
}

/// Monster kind id: Melee 0, Ranged 1.
#[inline]
pub fn monster_kind_to_id(kind: MonsterKind) -> f32 {
    match kind {
        MonsterKind::Melee => 0.0,
        MonsterKind::Ranged => 1.0,
    }
}

// ============================================================================
// MAIN SERIALIZATION FUNCTION
// ============================================================================

/// Convert a match snapshot to a flat buffer for FFI transfer.
///
/// See module-level documentation for the complete buffer layout.
pub fn snapshot_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let buffer_size = calculate_buffer_size(
        snapshot.actors.len(),
        snapshot.monsters.len(),
        snapshot.projectiles.len(),
    );
    let mut buffer = Vec::with_capacity(buffer_size);

    let (crown_state, crown_x, crown_y) = match snapshot.crown {
        CrownState::Unspawned => (CROWN_UNSPAWNED, 0.0, 0.0),
        CrownState::Dropped(at) => (CROWN_DROPPED, at.x, at.y),
        CrownState::Held(holder) => (CROWN_HELD, holder.0 as f32, 0.0),
    };

    buffer.push(snapshot.actors.len() as f32);
    buffer.push(snapshot.monsters.len() as f32);
    buffer.push(snapshot.projectiles.len() as f32);
    buffer.push(snapshot.time);
    buffer.push(snapshot.remaining);
    buffer.push(crown_state);
    buffer.push(crown_x);
    buffer.push(crown_y);
    buffer.push(snapshot.zone.center.x);
    buffer.push(snapshot.zone.center.y);
    buffer.push(snapshot.zone.radius);

    for actor in &snapshot.actors {
        let record = snapshot.scores.iter().find(|s| s.id == actor.id).map(|s| &s.record);
        buffer.push(actor.id as f32);
        buffer.push(actor.x);
        buffer.push(actor.y);
        buffer.push(actor.facing_x);
        buffer.push(actor.facing_y);
        buffer.push(actor.health);
        buffer.push(actor.health_max);
        buffer.push(flag(actor.alive));
        buffer.push(flag(actor.is_bot));
        buffer.push(archetype_to_id(actor.archetype));
        buffer.push(record.map_or(0.0, |r| r.bounty as f32));
        buffer.push(flag(record.is_some_and(|r| r.has_crown)));
    }

    for monster in &snapshot.monsters {
        buffer.push(monster_kind_to_id(monster.kind));
        buffer.push(monster.x);
        buffer.push(monster.y);
        buffer.push(monster.health);
        buffer.push(monster.health_max);
        buffer.push(flag(monster.alive));
    }

    for shot in &snapshot.projectiles {
        buffer.push(shot.x);
        buffer.push(shot.y);
        buffer.push(shot.dir_x);
        buffer.push(shot.dir_y);
        buffer.push(flag(shot.from_monster));
        buffer.push(flag(shot.explosive));
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Buffer size mismatch");
    buffer
}

/// Required buffer size for the given record counts.
#[inline]
pub fn calculate_buffer_size(actors: usize, monsters: usize, projectiles: usize) -> usize {
    HEADER_SIZE + actors * ACTOR_STRIDE + monsters * MONSTER_STRIDE + projectiles * PROJECTILE_STRIDE
}

/// Offset of actor `index`.
#[inline]
pub const fn actor_offset(index: usize) -> usize {
    HEADER_SIZE + index * ACTOR_STRIDE
}

/// Offset of monster `index`, given how many actors precede the block.
#[inline]
pub const fn monster_offset(actor_count: usize, index: usize) -> usize {
    HEADER_SIZE + actor_count * ACTOR_STRIDE + index * MONSTER_STRIDE
}

/// Record counts from the header, `None` if the buffer is too short.
pub fn parse_counts(buffer: &[f32]) -> Option<(usize, usize, usize)> {
    if buffer.len() < HEADER_SIZE {
        return None;
    }
    Some((
        buffer[HEADER_ACTOR_COUNT] as usize,
        buffer[HEADER_MONSTER_COUNT] as usize,
        buffer[HEADER_PROJECTILE_COUNT] as usize,
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MatchWorld, ParticipantSpec};
    use crate::components::BotBehavior;
    use crate::geometry::Vec2;

    #[test]
    fn test_empty_match_is_header_only() {
        let mut sim = MatchWorld::with_defaults();
        let buffer = snapshot_to_flatbuffer(&sim.snapshot());
        assert_eq!(buffer.len(), HEADER_SIZE);
        assert_eq!(parse_counts(&buffer), Some((0, 0, 0)));
        assert_eq!(buffer[HEADER_CROWN_STATE], CROWN_UNSPAWNED);
        assert_eq!(buffer[HEADER_ZONE_RADIUS], 50.0);
    }

    #[test]
    fn test_records_land_at_their_offsets() {
        let mut sim = MatchWorld::with_defaults();
        sim.spawn_participant(ParticipantSpec::player("Ash", Archetype::Sword, Vec2::new(10.0, 20.0)));
        sim.spawn_participant(ParticipantSpec::bot(
            "Bolt",
            Archetype::Bazooka,
            Vec2::new(-5.0, 0.0),
            BotBehavior::Hunter,
        ));
        sim.spawn_monster(MonsterKind::Ranged, Vec2::new(3.0, 4.0));

        let buffer = snapshot_to_flatbuffer(&sim.snapshot());
        assert_eq!(buffer.len(), calculate_buffer_size(2, 1, 0));

        let a = actor_offset(0);
        assert_eq!(buffer[a + ACTOR_ID], 1.0);
        assert_eq!(buffer[a + ACTOR_X], 10.0);
        assert_eq!(buffer[a + ACTOR_Y], 20.0);
        assert_eq!(buffer[a + ACTOR_ARCHETYPE], 2.0);
        assert_eq!(buffer[a + ACTOR_IS_BOT], 0.0);
        assert_eq!(buffer[a + ACTOR_IS_ALIVE], 1.0);

        let b = actor_offset(1);
        assert_eq!(buffer[b + ACTOR_ID], 2.0);
        assert_eq!(buffer[b + ACTOR_IS_BOT], 1.0);

        let m = monster_offset(2, 0);
        assert_eq!(buffer[m + MONSTER_KIND], 1.0);
        assert_eq!(buffer[m + MONSTER_X], 3.0);
        assert_eq!(buffer[m + MONSTER_Y], 4.0);
    }

    #[test]
    fn test_buffer_is_deterministic() {
        let build = || {
            let mut sim = MatchWorld::with_defaults();
            sim.spawn_participant(ParticipantSpec::player("Ash", Archetype::Shotgun, Vec2::ZERO));
            sim.spawn_monster(MonsterKind::Melee, Vec2::new(6.0, 6.0));
            snapshot_to_flatbuffer(&sim.snapshot())
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_parse_counts_rejects_short_buffer() {
        assert_eq!(parse_counts(&[]), None);
        assert_eq!(parse_counts(&[1.0, 2.0]), None);
    }

    #[test]
    fn test_field_offsets_fit_strides() {
        assert_eq!(ACTOR_STRIDE, ACTOR_HAS_CROWN + 1);
        assert_eq!(MONSTER_STRIDE, MONSTER_IS_ALIVE + 1);
        assert_eq!(HEADER_SIZE, HEADER_ZONE_RADIUS + 1);
    }
}
