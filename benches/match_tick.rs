//! Benchmark for a full fixed update with bots and monsters in play.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crown_arena_sim::{Archetype, BotBehavior, MatchConfig, MatchWorld, MonsterKind, ParticipantSpec, Vec2};
use crown_arena_sim::services::MatchServices;

const BEHAVIORS: [BotBehavior; 5] = [
    BotBehavior::Aggressive,
    BotBehavior::Defensive,
    BotBehavior::Balanced,
    BotBehavior::Hunter,
    BotBehavior::CrownSeeker,
];
const ARCHETYPES: [Archetype; 3] = [Archetype::Shotgun, Archetype::Bazooka, Archetype::Sword];

fn populated_match(bots: usize, monsters: usize) -> MatchWorld {
    let mut config = MatchConfig::default();
    config.arena.random_seed = Some(1234);
    config.arena.match_duration = 10_000.0;
    let services = MatchServices::headless(config.arena.arena_radius);
    let mut sim = match MatchWorld::new(config, services) {
        Ok(sim) => sim,
        Err(e) => panic!("default config rejected: {e}"),
    };

    for i in 0..bots {
        let angle = i as f32 * 360.0 / bots as f32;
        let at = Vec2::from_angle_deg(angle) * 25.0;
        sim.spawn_participant(ParticipantSpec::bot(
            format!("Bot{i}"),
            ARCHETYPES[i % ARCHETYPES.len()],
            at,
            BEHAVIORS[i % BEHAVIORS.len()],
        ));
    }
    for i in 0..monsters {
        let angle = i as f32 * 137.5;
        let radius = 5.0 + (i % 7) as f32 * 5.0;
        let kind = if i % 4 == 0 { MonsterKind::Ranged } else { MonsterKind::Melee };
        sim.spawn_monster(kind, Vec2::from_angle_deg(angle) * radius);
    }

    sim.on_match_start();
    // Warm up so bots have perceived and picked targets
    for _ in 0..30 {
        sim.step(1.0 / 30.0);
    }
    sim
}

fn benchmark_match_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("Match Tick");

    for (bots, monsters) in [(5, 10), (20, 40), (50, 100)] {
        let mut sim = populated_match(bots, monsters);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{bots}b_{monsters}m")),
            &(bots, monsters),
            |b, _| {
                b.iter(|| sim.step(1.0 / 30.0));
            },
        );
    }

    group.finish();
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut sim = populated_match(20, 40);
    c.bench_function("Snapshot JSON", |b| {
        b.iter(|| sim.snapshot_json());
    });
}

criterion_group!(benches, benchmark_match_tick, benchmark_snapshot);
criterion_main!(benches);
