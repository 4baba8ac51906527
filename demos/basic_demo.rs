//! Basic demonstration of a Crown Arena match.
//!
//! Run with: RUST_LOG=info cargo run --example basic_demo

use crown_arena_sim::{
    ActionKind, Archetype, BotBehavior, MatchConfig, MatchWorld, ParticipantSpec, Vec2,
};
use crown_arena_sim::services::MatchServices;

fn main() {
    env_logger::init();
    println!("=== Crown Arena - Match Demo ===\n");

    let mut config = MatchConfig::default();
    config.arena.random_seed = Some(2024);
    config.arena.match_duration = 60.0;
    config.arena.crown_spawn_delay = 5.0;
    config.safe_zone.initial_delay = 10.0;
    config.safe_zone.warning_duration = 3.0;
    config.safe_zone.shrink_duration = 8.0;
    config.safe_zone.pause_duration = 5.0;

    let services = MatchServices::headless(config.arena.arena_radius);
    let mut sim = match MatchWorld::new(config, services) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("invalid config: {e}");
            return;
        }
    };

    let player = sim.spawn_participant(ParticipantSpec::player("Player", Archetype::Sword, Vec2::ZERO));
    let roster = [
        ("Rook", Archetype::Shotgun, BotBehavior::Aggressive),
        ("Vale", Archetype::Bazooka, BotBehavior::Defensive),
        ("Moss", Archetype::Sword, BotBehavior::Hunter),
        ("Pike", Archetype::Shotgun, BotBehavior::CrownSeeker),
        ("Wren", Archetype::Bazooka, BotBehavior::Balanced),
    ];
    for (i, (name, archetype, behavior)) in roster.into_iter().enumerate() {
        let at = Vec2::from_angle_deg(i as f32 * 72.0) * 15.0;
        sim.spawn_participant(ParticipantSpec::bot(name, archetype, at, behavior).with_difficulty(0.6));
    }

    sim.on_match_start();
    println!("Initial state:");
    print_snapshot(&mut sim);

    // 30 ticks per second; the player circles and swings
    for tick in 0..(70 * 30) {
        let t = tick as f32 / 30.0;
        sim.set_move_direction(player, Vec2::from_angle_deg(t * 20.0));
        if tick % 10 == 0 {
            sim.request_action(player, ActionKind::Attack);
        }
        if tick % 150 == 0 {
            sim.request_action(player, ActionKind::Skill1);
        }
        sim.step(1.0 / 30.0);

        if (tick + 1) % 300 == 0 {
            println!("\n--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_snapshot(&mut sim);
        }
    }

    println!("\n=== Final Ranking ===\n");
    for entry in &sim.ranking().entries {
        println!(
            "  #{} {:<8} actor kills={} monster kills={} bounty={} crown={:.1}s gold={}",
            entry.rank,
            entry.record.name,
            entry.record.actor_kills,
            entry.record.monster_kills,
            entry.record.bounty,
            entry.record.crown_hold_time,
            entry.record.gold_earned,
        );
    }
    println!("\nPlayer gold balance: {}", sim.gold_balance());

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("snapshot failed: {e}"),
    }
}

fn print_snapshot(sim: &mut MatchWorld) {
    let snapshot = sim.snapshot();
    println!(
        "  crown={:?} zone r={:.1} ({:?}) monsters alive={}",
        snapshot.crown,
        snapshot.zone.radius,
        snapshot.zone.stage,
        snapshot.monsters.iter().filter(|m| m.alive).count()
    );
    for actor in &snapshot.actors {
        let state = actor
            .bot_state
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|| "player".to_string());
        println!(
            "    {:<8} pos=({:>6.1}, {:>6.1}) hp={:>5.1}/{:.0} [{}]{}",
            actor.name,
            actor.x,
            actor.y,
            actor.health,
            actor.health_max,
            state,
            if actor.alive { "" } else { " dead" }
        );
    }
}
