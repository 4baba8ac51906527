//! Periodic monster spawning around living participants.

use crate::components::*;
use crate::config::MatchConfig;
use crate::geometry::Vec2;
use crate::rng::GameRng;
use crate::scheduler::TIME_EPSILON;
use crate::services::{EffectKind, Effects, Navigation, UpgradeBonuses};
use crate::systems::clock::MatchClock;
use bevy_ecs::prelude::*;

#[derive(Resource, Debug, Clone)]
pub struct SpawnerState {
    pub enabled: bool,
    pub next_spawn_at: f32,
    /// Melee monsters spawned since the last ranged one.
    pub melee_streak: u32,
    pub spawned_total: u64,
}

impl SpawnerState {
    pub fn new(first_spawn_at: f32) -> Self {
        Self {
            enabled: true,
            next_spawn_at: first_spawn_at,
            melee_streak: 0,
            spawned_total: 0,
        }
    }

    /// Pick the next monster kind. Ranged monsters only become possible after
    /// enough melee spawns in a row, and reset the streak.
    pub fn next_kind(&mut self, config: &MatchConfig, rng: &mut GameRng) -> MonsterKind {
        let monsters = &config.monsters;
        if self.melee_streak >= monsters.melee_spawns_before_ranged
            && rng.chance(monsters.ranged_spawn_chance)
        {
            self.melee_streak = 0;
            MonsterKind::Ranged
        } else {
            self.melee_streak += 1;
            MonsterKind::Melee
        }
    }
}

impl Default for SpawnerState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Monsters per living participant for one spawn wave.
pub fn monsters_per_participant(spawn_count: u32, living_participants: usize) -> u32 {
    (spawn_count / living_participants.max(1) as u32).max(1)
}

/// Spawns a wave of monsters around every living participant each spawn
/// interval, up to the alive cap.
///
/// ## Data Access
/// - Reads: MatchClock, MatchConfig, UpgradeBonuses, Navigation, Position, Health
/// - Writes: SpawnerState, GameRng, Effects, Commands
pub fn monster_spawn_system(
    clock: Res<MatchClock>,
    config: Res<MatchConfig>,
    bonuses: Res<UpgradeBonuses>,
    nav: Res<Navigation>,
    mut spawner: ResMut<SpawnerState>,
    mut rng: ResMut<GameRng>,
    mut effects: ResMut<Effects>,
    mut commands: Commands,
    participants: Query<(Entity, &Position, &Health), With<Participant>>,
    monsters: Query<&Health, With<MonsterBrain>>,
) {
    let now = clock.now();
    if !spawner.enabled || now + TIME_EPSILON < spawner.next_spawn_at {
        return;
    }
    spawner.next_spawn_at += config.monsters.spawn_interval;

    let mut anchors: Vec<(Entity, Position)> = participants
        .iter()
        .filter(|(_, _, h)| h.is_alive())
        .map(|(e, p, _)| (e, *p))
        .collect();
    if anchors.is_empty() {
        return;
    }
    anchors.sort_by_key(|(e, _)| *e);

    let alive = monsters.iter().filter(|h| h.is_alive()).count();
    let mut capacity = config.monsters.max_alive.saturating_sub(alive);
    let per_participant = monsters_per_participant(config.monsters.spawn_count, anchors.len());
    let gold_bounty_bonus = bonuses.gold_gain as i32;
    let cfg = &config.monsters;
    let mut spawned = 0u32;

    'anchors: for (_, anchor) in &anchors {
        for _ in 0..per_participant {
            if capacity == 0 {
                break 'anchors;
            }
            let kind = spawner.next_kind(&config, &mut rng);
            let offset = rng.point_in_ring(cfg.min_spawn_radius, cfg.max_spawn_radius);
            let Some(at) = nav
                .0
                .sample_valid_point(anchor.as_vec() + offset, cfg.max_spawn_radius)
            else {
                continue;
            };

            let profile = match kind {
                MonsterKind::Melee => cfg.melee,
                MonsterKind::Ranged => cfg.ranged,
            };
            commands.spawn(MonsterBundle::new(
                kind,
                profile,
                at,
                profile.gold_bounty + gold_bounty_bonus,
            ));
            effects.spawn(EffectKind::MonsterSpawn, at, Vec2::FORWARD);
            capacity -= 1;
            spawned += 1;
        }
    }

    spawner.spawned_total += spawned as u64;
    if spawned > 0 {
        log::debug!("spawned {} monsters at {:.1}s", spawned, now);
    }
}
