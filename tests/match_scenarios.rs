//! End-to-end match scenarios driven through `MatchWorld`.

use crown_arena_sim::services::{MatchServices, MemoryCurrencyStore};
use crown_arena_sim::*;

const DT: f32 = 1.0 / 30.0;

fn seeded_config() -> MatchConfig {
    let mut config = MatchConfig::default();
    config.arena.random_seed = Some(42);
    config
}

fn build(config: MatchConfig) -> MatchWorld {
    let services = MatchServices::headless(config.arena.arena_radius)
        .with_currency(Box::new(MemoryCurrencyStore::default()));
    MatchWorld::new(config, services).unwrap()
}

fn run_ticks(sim: &mut MatchWorld, ticks: usize) {
    for _ in 0..ticks {
        sim.step(DT);
    }
}

#[test]
fn scenario_a_sword_kills_monster_in_two_swings() {
    let mut config = seeded_config();
    config.monsters.melee.health = 15.0;
    let mut sim = build(config);

    let x = sim.spawn_participant(ParticipantSpec::player("X", Archetype::Sword, Vec2::ZERO));
    let monster = sim.spawn_monster(MonsterKind::Melee, Vec2::new(0.0, 2.0));
    sim.on_match_start();

    assert!(sim.request_action(x, ActionKind::Attack));
    run_ticks(&mut sim, 1);
    let health = sim.health_of(monster).unwrap();
    assert_eq!(health.current, 5.0);
    assert!(health.is_alive());

    // Attack interval is 0.2 s
    assert!(!sim.request_action(x, ActionKind::Attack));
    run_ticks(&mut sim, 6);
    assert!(sim.request_action(x, ActionKind::Attack));
    run_ticks(&mut sim, 1);

    let health = sim.health_of(monster).unwrap();
    assert!(health.current <= 0.0);
    assert!(!health.is_alive());
    let record = sim.score(x).unwrap();
    assert_eq!(record.monster_kills, 1);
    assert_eq!(record.gold_earned, 5);
    assert_eq!(sim.gold_balance(), 5);
}

#[test]
fn scenario_b_killing_crown_holder_steals_bounty_and_crown() {
    let mut sim = build(seeded_config());
    let a = sim.spawn_participant(ParticipantSpec::player("A", Archetype::Shotgun, Vec2::new(0.0, 2.0)));
    let b = sim.spawn_participant(ParticipantSpec::player("B", Archetype::Sword, Vec2::ZERO));
    let c = sim.spawn_participant(ParticipantSpec::player("C", Archetype::Sword, Vec2::new(40.0, 0.0)));
    let d = sim.spawn_participant(ParticipantSpec::player("D", Archetype::Sword, Vec2::new(-40.0, 0.0)));

    {
        let world = sim.world_mut();
        let mut ledger = world.resource_mut::<ScoreLedger>();
        ledger.record_actor_kill(a, c);
        ledger.record_actor_kill(a, d);
        ledger.spawn_crown(Vec2::new(0.0, 30.0));
        assert!(ledger.handle_crown_pickup(a));
    }
    assert_eq!(sim.ledger().bounty_of(a), 20);
    assert_eq!(sim.crown(), CrownState::Held(a));

    let a_entity = sim.entity_of(a).unwrap();
    sim.world_mut().get_mut::<Health>(a_entity).unwrap().current = 10.0;

    sim.on_match_start();
    assert!(sim.request_action(b, ActionKind::Attack));
    run_ticks(&mut sim, 1);

    assert!(!sim.actor_health(a).unwrap().is_alive());
    let ledger = sim.ledger();
    assert_eq!(ledger.bounty_of(b), 10);
    assert_eq!(ledger.bounty_of(a), 0);
    assert_eq!(ledger.crown_holder(), Some(b));
    assert_eq!(sim.score(b).unwrap().gold_earned, 20);
    assert_eq!(sim.score(b).unwrap().actor_kills, 2);
    assert_eq!(sim.score(a).unwrap().actor_kills, 1);
    assert!(!sim.score(a).unwrap().has_crown);
    assert_eq!(sim.gold_balance(), 20);
}

#[test]
fn scenario_c_zone_shrinks_without_early_floor() {
    let mut config = seeded_config();
    let zone = &mut config.safe_zone;
    zone.initial_delay = 1.0;
    zone.warning_duration = 1.0;
    zone.shrink_duration = 1.0;
    zone.pause_duration = 1.0;
    let mut sim = build(config);
    sim.on_match_start();

    let mut radii = vec![sim.safe_zone().radius()];
    let mut seen = 0;
    for _ in 0..(12 * 30) {
        sim.step(DT);
        let zone = sim.safe_zone();
        if zone.completed_phases() > seen {
            seen = zone.completed_phases();
            radii.push(zone.radius());
        }
    }

    let expected = [50.0, 30.0, 18.0, 10.8];
    assert_eq!(radii.len(), expected.len(), "radii {:?}", radii);
    for (got, want) in radii.iter().zip(expected) {
        assert!((got - want).abs() < 1e-3, "radii {:?}", radii);
    }
    assert_eq!(sim.safe_zone().stage(), ZoneStage::Final);
}

#[test]
fn zone_damages_exposed_participant_once_per_interval() {
    let mut config = seeded_config();
    config.monsters.max_alive = 0;
    let mut sim = build(config);
    let p = sim.spawn_participant(ParticipantSpec::player("P", Archetype::Sword, Vec2::new(55.0, 0.0)));
    sim.on_match_start();

    run_ticks(&mut sim, 1);
    assert_eq!(sim.actor_health(p).unwrap().current, 95.0);
    run_ticks(&mut sim, 31);
    assert_eq!(sim.actor_health(p).unwrap().current, 90.0);

    // Walk back inside; no further ticks land
    sim.set_move_direction(p, Vec2::new(-1.0, 0.0));
    run_ticks(&mut sim, 60);
    sim.set_move_direction(p, Vec2::ZERO);
    let after_return = sim.actor_health(p).unwrap().current;
    run_ticks(&mut sim, 90);
    assert_eq!(sim.actor_health(p).unwrap().current, after_return);
}

#[test]
fn crown_spawns_and_is_picked_up() {
    let mut config = seeded_config();
    config.arena.crown_spawn_delay = 0.5;
    let mut sim = build(config);
    let p = sim.spawn_participant(ParticipantSpec::player("P", Archetype::Bazooka, Vec2::new(0.5, 0.0)));
    sim.on_match_start();

    run_ticks(&mut sim, 10);
    assert_eq!(sim.crown(), CrownState::Unspawned);
    run_ticks(&mut sim, 10);
    assert_eq!(sim.crown(), CrownState::Held(p));

    run_ticks(&mut sim, 30);
    let held = sim.score(p).unwrap().crown_hold_time;
    assert!(held > 0.9 && held < 1.4, "held {held}");
}

#[test]
fn match_lifecycle_ends_on_clock_and_freezes_scores() {
    let mut config = seeded_config();
    config.arena.match_duration = 2.0;
    let mut sim = build(config);
    let bot = sim.spawn_participant(ParticipantSpec::bot(
        "Bot",
        Archetype::Shotgun,
        Vec2::new(5.0, 0.0),
        BotBehavior::Aggressive,
    ));
    let player = sim.spawn_participant(ParticipantSpec::player("P", Archetype::Sword, Vec2::ZERO));
    sim.on_match_start();

    run_ticks(&mut sim, 90);
    assert_eq!(sim.clock().phase, MatchPhase::Ended);
    assert_eq!(sim.current_tick(), 60);

    let ranking = sim.ranking().clone();
    assert_eq!(ranking.entries.len(), 2);
    assert!(ranking.placement_of(bot).is_some());
    assert!(ranking.placement_of(player).is_some());
    assert_eq!(sim.on_match_end(), ranking);

    assert!(!sim.request_action(player, ActionKind::Attack));
    assert!(sim.ledger().is_frozen());
}

#[test]
fn bot_match_runs_and_keeps_health_in_range() {
    let mut config = seeded_config();
    config.arena.crown_spawn_delay = 2.0;
    let mut sim = build(config);
    let behaviors = [
        BotBehavior::Aggressive,
        BotBehavior::Defensive,
        BotBehavior::Balanced,
        BotBehavior::Hunter,
        BotBehavior::CrownSeeker,
    ];
    let archetypes = [Archetype::Shotgun, Archetype::Bazooka, Archetype::Sword];
    let mut ids = Vec::new();
    for (i, behavior) in behaviors.iter().enumerate() {
        let angle = i as f32 * 72.0;
        let at = Vec2::from_angle_deg(angle) * 12.0;
        ids.push(sim.spawn_participant(ParticipantSpec::bot(
            format!("Bot{i}"),
            archetypes[i % archetypes.len()],
            at,
            *behavior,
        )));
    }
    sim.spawn_destructible(Vec2::new(3.0, 3.0));

    sim.on_match_start();
    run_ticks(&mut sim, 20 * 30);

    for id in &ids {
        let health = sim.actor_health(*id).unwrap();
        assert!(health.current >= 0.0 && health.current <= health.max);
    }
    let snapshot = sim.snapshot();
    assert_eq!(snapshot.actors.len(), behaviors.len());
    assert!(!snapshot.monsters.is_empty(), "spawner should have produced monsters");
    assert_ne!(sim.crown(), CrownState::Unspawned);
}

#[test]
fn same_seed_replays_identically() {
    let run = || {
        let mut sim = build(seeded_config());
        for i in 0..3 {
            sim.spawn_participant(ParticipantSpec::bot(
                format!("Bot{i}"),
                Archetype::Bazooka,
                Vec2::new(i as f32 * 6.0, 0.0),
                BotBehavior::Hunter,
            ));
        }
        sim.on_match_start();
        run_ticks(&mut sim, 10 * 30);
        sim.snapshot_json()
    };
    assert_eq!(run(), run());
}

#[test]
fn shipped_config_loads_and_runs() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default_match.ron");
    let mut config = MatchConfig::load(&path).unwrap();
    assert_eq!(config.safe_zone.total_phases, 3);
    assert_eq!(config.weapons.sword.range, 3.0);
    assert_eq!(config.scoring.bounty_per_kill, 10);

    config.arena.random_seed = Some(7);
    let mut sim = build(config);
    sim.spawn_participant(ParticipantSpec::player("P", Archetype::Shotgun, Vec2::ZERO));
    assert!(sim.on_match_start());
    run_ticks(&mut sim, 30);
    assert_eq!(sim.current_tick(), 30);
}

#[test]
fn healed_bot_leaves_flee_without_waiting_for_decision() {
    let mut config = seeded_config();
    config.monsters.max_alive = 0;
    let mut sim = build(config);
    let bot = sim.spawn_participant(ParticipantSpec::bot(
        "Runner",
        Archetype::Shotgun,
        Vec2::ZERO,
        BotBehavior::Balanced,
    ));
    sim.on_match_start();

    let entity = sim.entity_of(bot).unwrap();
    {
        let mut brain = sim.world_mut().get_mut::<BotBrain>(entity).unwrap();
        brain.state = BotState::Flee;
        brain.next_decision_at = 100.0;
    }
    run_ticks(&mut sim, 10);
    assert_eq!(sim.bot_state(bot), Some(BotState::Patrol));
}

#[test]
fn wounded_bot_keeps_fleeing_until_recovered() {
    let mut config = seeded_config();
    config.monsters.max_alive = 0;
    let mut sim = build(config);
    let bot = sim.spawn_participant(ParticipantSpec::bot(
        "Runner",
        Archetype::Shotgun,
        Vec2::ZERO,
        BotBehavior::Balanced,
    ));
    sim.on_match_start();

    let entity = sim.entity_of(bot).unwrap();
    sim.world_mut().get_mut::<Health>(entity).unwrap().current = 40.0;
    sim.world_mut().get_mut::<BotBrain>(entity).unwrap().state = BotState::Flee;
    // Decisions keep running; 40 sits between the threshold and 1.5x of it
    run_ticks(&mut sim, 60);
    assert_eq!(sim.bot_state(bot), Some(BotState::Flee));

    sim.world_mut().get_mut::<Health>(entity).unwrap().heal(20.0);
    run_ticks(&mut sim, 1);
    assert_eq!(sim.bot_state(bot), Some(BotState::Patrol));
}
