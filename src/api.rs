//! Public API for the match.
//!
//! `MatchWorld` is the one entry point a presentation layer (or a test)
//! needs: spawn participants and props, start the match, feed input, step
//! time and read state back.
//!
//! ## Fixed Timestep
//!
//! The match uses a fixed timestep internally (default 30 Hz). When `step(dt)` is called,
//! the world accumulates time and runs fixed updates as needed. This ensures deterministic
//! behavior regardless of frame rate.
//!
//! ## Lifecycle
//!
//! `Pending` until `on_match_start`, `Running` until the clock runs out or
//! `on_match_end` is called, then `Ended`. Gameplay systems only run while
//! the match is running; input arriving outside that window is rejected.

use crate::components::*;
use crate::config::MatchConfig;
use crate::error::ConfigError;
use crate::geometry::Vec2;
use crate::ledger::{CrownState, FinalRanking, ScoreLedger, ScoreRecord};
use crate::rng::GameRng;
use crate::safe_zone::SafeZone;
use crate::scheduler::{TaskDomain, TaskKind, TaskScheduler};
use crate::services::{Camera, Currency, EffectDescriptor, Effects, MatchServices, Navigation, UpgradeBonuses};
use crate::spatial::{spatial_grid_update_system, SpatialGrid};
use crate::systems::*;
use crate::targeting::{Obstacle, ObstacleField};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemState;

/// Everything needed to put one participant into the arena.
#[derive(Debug, Clone)]
pub struct ParticipantSpec {
    pub name: String,
    pub is_bot: bool,
    pub archetype: Archetype,
    pub position: Vec2,
    /// Bot personality. Ignored for player-controlled participants.
    pub behavior: BotBehavior,
    /// Optional bot skill level in `0..=1`.
    pub difficulty: Option<f32>,
}

impl ParticipantSpec {
    pub fn player(name: impl Into<String>, archetype: Archetype, position: Vec2) -> Self {
        Self {
            name: name.into(),
            is_bot: false,
            archetype,
            position,
            behavior: BotBehavior::default(),
            difficulty: None,
        }
    }

    pub fn bot(name: impl Into<String>, archetype: Archetype, position: Vec2, behavior: BotBehavior) -> Self {
        Self {
            name: name.into(),
            is_bot: true,
            archetype,
            position,
            behavior,
            difficulty: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: f32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

/// The match world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Spawning participants, monsters, props and geometry
/// - Starting, stepping and ending the match
/// - Feeding player input
/// - Extracting state snapshots
pub struct MatchWorld {
    world: World,
    schedule: Schedule,
    end_schedule: Schedule,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl MatchWorld {
    /// Create a match from a validated configuration and injected services.
    pub fn new(config: MatchConfig, services: MatchServices) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, services))
    }

    /// Default configuration with headless services.
    pub fn with_defaults() -> Self {
        let config = MatchConfig::default();
        let services = MatchServices::headless(config.arena.arena_radius);
        Self::build(config, services)
    }

    fn build(config: MatchConfig, services: MatchServices) -> Self {
        let mut world = World::new();

        let bonuses = UpgradeBonuses::from_store(services.currency.as_ref());
        log::debug!("upgrade bonuses for this match: {:?}", bonuses);

        // Core resources
        world.insert_resource(DeltaTime(config.arena.fixed_timestep));
        world.insert_resource(MatchClock::new(config.arena.match_duration));
        world.insert_resource(SpatialGrid::new(config.arena.spatial_cell_size));
        world.insert_resource(ObstacleField::default());
        world.insert_resource(GameRng::from_optional_seed(config.arena.random_seed));
        world.insert_resource(TaskScheduler::new());

        // Match state
        world.insert_resource(ScoreLedger::new(config.scoring.bounty_per_kill));
        world.insert_resource(SafeZone::new(config.safe_zone.clone()));
        world.insert_resource(ActorIndex::default());
        world.insert_resource(FinalRanking::default());
        world.insert_resource(SpawnerState::new(config.monsters.spawn_interval));

        // Per-tick queues
        world.insert_resource(ActionRequests::default());
        world.insert_resource(AttackQueue::default());
        world.insert_resource(AreaStrikes::default());
        world.insert_resource(DamageQueue::default());
        world.insert_resource(PendingDeaths::default());

        // Collaborators
        world.insert_resource(bonuses);
        world.insert_resource(Navigation(services.navigation));
        world.insert_resource(Currency(services.currency));
        world.insert_resource(Effects::new(services.effects));
        world.insert_resource(Camera(services.camera));
        world.insert_resource(config);

        let mut schedule = Schedule::default();

        // Group 1: clock and the end-of-match cancellation point
        schedule.add_systems((match_clock_system, match_end_system).chain());

        // Group 2: intent (bots, monsters, requested actions)
        schedule.add_systems(
            (
                task_dispatch_system,
                spatial_grid_update_system,
                bot_perception_system,
                bot_decision_system,
                bot_behavior_system,
                monster_behavior_system,
                action_system,
                attack_resolution_system,
            )
                .chain()
                .after(match_end_system)
                .run_if(match_running),
        );

        // Group 3: resolution (movement, hits, damage, deaths)
        schedule.add_systems(
            (
                movement_system,
                projectile_system,
                area_strike_system,
                pickup_system,
                safe_zone_system,
                damage_apply_system,
                death_system,
                crown_hold_system,
                monster_spawn_system,
            )
                .chain()
                .after(attack_resolution_system)
                .run_if(match_running),
        );

        let mut end_schedule = Schedule::default();
        end_schedule.add_systems(match_end_system);

        Self {
            world,
            schedule,
            end_schedule,
            time_accumulator: 0.0,
        }
    }

    // ========================================================================
    // SPAWNING
    // ========================================================================

    /// Spawn a participant and register it with the ledger.
    pub fn spawn_participant(&mut self, spec: ParticipantSpec) -> ActorId {
        let config = self.world.resource::<MatchConfig>();
        let stats = *config.weapons.stats(spec.archetype);
        let actions = ActionState::new(stats.attack_interval, &config.skills);
        let participants = config.participants.clone();
        let mut profile = config.bots.clone();

        let bonuses = if spec.is_bot {
            UpgradeBonuses::default()
        } else {
            *self.world.resource::<UpgradeBonuses>()
        };

        let entity = self
            .world
            .spawn((
                BodyBundle::new(
                    spec.position,
                    participants.max_health + bonuses.max_health,
                    Collider::new(BodyKind::Participant, participants.body_radius),
                    DeathBehavior::Participant,
                ),
                MoveSpeed(participants.move_speed * (1.0 + bonuses.move_speed)),
                DisplayName(spec.name.clone()),
                Participant { is_bot: spec.is_bot },
                Weapon {
                    archetype: spec.archetype,
                    stats,
                },
                actions,
            ))
            .id();

        if spec.is_bot {
            profile.behavior = spec.behavior;
            if let Some(difficulty) = spec.difficulty {
                profile.set_difficulty(difficulty);
            }
            self.world.entity_mut(entity).insert(BotBrain::new(profile));
        } else {
            self.world.entity_mut(entity).insert(MoveIntent::default());
        }

        let id = self.world.resource_mut::<ActorIndex>().register(entity);
        self.world.entity_mut(entity).insert(id);
        self.world
            .resource_mut::<ScoreLedger>()
            .register_actor(id, &spec.name);

        log::debug!(
            "spawned {} {:?} as {:?} ({})",
            if spec.is_bot { "bot" } else { "player" },
            spec.archetype,
            id,
            spec.name
        );
        id
    }

    /// Spawn a monster of `kind` with its configured bounty plus the gold-gain
    /// bonus.
    pub fn spawn_monster(&mut self, kind: MonsterKind, at: Vec2) -> Entity {
        let monsters = &self.world.resource::<MatchConfig>().monsters;
        let profile = match kind {
            MonsterKind::Melee => monsters.melee,
            MonsterKind::Ranged => monsters.ranged,
        };
        let bounty = profile.gold_bounty + self.world.resource::<UpgradeBonuses>().gold_gain as i32;
        self.world
            .spawn(MonsterBundle::new(kind, profile, at, bounty))
            .id()
    }

    /// Spawn a destructible prop with the configured health and reward.
    pub fn spawn_destructible(&mut self, at: Vec2) -> Entity {
        let props = self.world.resource::<MatchConfig>().destructibles.clone();
        self.world
            .spawn(DestructibleBundle::new(
                at,
                props.health,
                props.body_radius,
                props.gold_reward,
                props.drop_chance,
            ))
            .id()
    }

    /// Place a pickup on the floor.
    pub fn spawn_item(&mut self, at: Vec2, kind: PickupKind) -> Entity {
        let radius = self.world.resource::<MatchConfig>().arena.item_pickup_radius;
        self.world.spawn(ItemBundle::new(at, kind, radius)).id()
    }

    /// Add static geometry. Solid obstacles block sight and projectiles.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.world.resource_mut::<ObstacleField>().add(obstacle);
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start the match clock, schedule the crown and arm the spawner.
    /// Returns `false` if the match already started.
    pub fn on_match_start(&mut self) -> bool {
        if self.world.resource::<MatchClock>().phase != MatchPhase::Pending {
            return false;
        }
        let arena = self.world.resource::<MatchConfig>().arena.clone();
        let spawn_interval = self.world.resource::<MatchConfig>().monsters.spawn_interval;

        self.world.resource_mut::<MatchClock>().phase = MatchPhase::Running;
        self.world.resource_mut::<TaskScheduler>().schedule(
            arena.crown_spawn_delay,
            None,
            TaskDomain::Match,
            TaskKind::CrownSpawn,
        );
        *self.world.resource_mut::<SpawnerState>() = SpawnerState::new(spawn_interval);

        log::info!(
            "match started: {} participants, {:.0}s",
            self.world.resource::<ActorIndex>().len(),
            arena.match_duration
        );
        true
    }

    /// End the match now and return the final standings. Calling this again
    /// after the match ended returns the same standings.
    pub fn on_match_end(&mut self) -> FinalRanking {
        let phase = self.world.resource::<MatchClock>().phase;
        if phase != MatchPhase::Ended {
            {
                let mut clock = self.world.resource_mut::<MatchClock>();
                clock.phase = MatchPhase::Running;
                clock.end_requested = true;
            }
            self.end_schedule.run(&mut self.world);
        }
        self.world.resource::<FinalRanking>().clone()
    }

    /// Step the match forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed updates
    /// as needed. This ensures deterministic behavior regardless of frame rate.
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self.world.resource::<MatchConfig>().arena.fixed_timestep;

        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.schedule.run(&mut self.world);
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// Request an action for a participant, aiming along its facing (or the
    /// auto-aim target). Returns whether the action started.
    pub fn request_action(&mut self, actor: ActorId, kind: ActionKind) -> bool {
        self.request_action_at(actor, kind, None)
    }

    /// Request an action aimed at a point.
    pub fn request_action_at(&mut self, actor: ActorId, kind: ActionKind, aim_at: Option<Vec2>) -> bool {
        let Some(entity) = self.entity_of(actor) else {
            return false;
        };
        let clock = self.world.resource::<MatchClock>();
        if !clock.is_running() {
            return false;
        }
        let now = clock.now();

        let mut state: SystemState<(
            Res<MatchConfig>,
            Res<Navigation>,
            ResMut<TaskScheduler>,
            ResMut<AttackQueue>,
            ResMut<Effects>,
            Query<(&Position, &Facing, &Health, &mut ActionState)>,
        )> = SystemState::new(&mut self.world);
        let (config, nav, mut scheduler, mut attacks, mut effects, mut actors) = state.get_mut(&mut self.world);

        let Ok((position, facing, health, mut actions)) = actors.get_mut(entity) else {
            return false;
        };
        let pose = ActorPose {
            position: position.as_vec(),
            facing: facing.0,
            alive: health.is_alive(),
        };
        let mut ctx = ActionContext {
            now,
            skills: &config.skills,
            nav: nav.0.as_ref(),
            scheduler: &mut scheduler,
            attacks: &mut attacks,
            effects: &mut effects,
        };
        match begin_action(&mut ctx, entity, kind, pose, aim_at, &mut actions) {
            Ok(()) => true,
            Err(reason) => {
                log::debug!("{:?} {:?} rejected: {:?}", actor, kind, reason);
                false
            }
        }
    }

    /// Set the walking direction of a player-controlled participant. A zero
    /// vector stops it.
    pub fn set_move_direction(&mut self, actor: ActorId, direction: Vec2) -> bool {
        let Some(entity) = self.entity_of(actor) else {
            return false;
        };
        match self.world.get_mut::<MoveIntent>(entity) {
            Some(mut intent) => {
                intent.0 = direction;
                true
            }
            None => false,
        }
    }

    /// Turn a participant to face `direction`.
    pub fn set_facing(&mut self, actor: ActorId, direction: Vec2) -> bool {
        let Some(entity) = self.entity_of(actor) else {
            return false;
        };
        match self.world.get_mut::<Facing>(entity) {
            Some(mut facing) => {
                facing.turn_to(direction);
                true
            }
            None => false,
        }
    }

    /// Queue damage against any body; it lands on the next fixed update with
    /// the given attribution.
    pub fn queue_damage(&mut self, target: Entity, amount: f32, source: DamageSource) {
        self.world.resource_mut::<DamageQueue>().push(target, amount, source);
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn entity_of(&self, actor: ActorId) -> Option<Entity> {
        self.world.resource::<ActorIndex>().entity(actor)
    }

    /// Seconds until `kind` is ready again for `actor`, zero when ready.
    pub fn cooldown_remaining(&self, actor: ActorId, kind: ActionKind) -> f32 {
        let now = self.world.resource::<MatchClock>().now();
        self.entity_of(actor)
            .and_then(|e| self.world.get::<ActionState>(e))
            .map_or(0.0, |actions| actions.cooldown_remaining(kind, now))
    }

    pub fn health_of(&self, entity: Entity) -> Option<&Health> {
        self.world.get::<Health>(entity)
    }

    pub fn actor_health(&self, actor: ActorId) -> Option<&Health> {
        self.entity_of(actor).and_then(|e| self.health_of(e))
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<Position>(entity).map(Position::as_vec)
    }

    pub fn bot_state(&self, actor: ActorId) -> Option<BotState> {
        self.entity_of(actor)
            .and_then(|e| self.world.get::<BotBrain>(e))
            .map(|b| b.state)
    }

    pub fn score(&self, actor: ActorId) -> Option<&ScoreRecord> {
        self.world.resource::<ScoreLedger>().record(actor)
    }

    pub fn crown(&self) -> CrownState {
        self.world.resource::<ScoreLedger>().crown()
    }

    pub fn ledger(&self) -> &ScoreLedger {
        self.world.resource::<ScoreLedger>()
    }

    pub fn safe_zone(&self) -> &SafeZone {
        self.world.resource::<SafeZone>()
    }

    pub fn clock(&self) -> &MatchClock {
        self.world.resource::<MatchClock>()
    }

    /// Standings computed at match end; empty before that.
    pub fn ranking(&self) -> &FinalRanking {
        self.world.resource::<FinalRanking>()
    }

    /// Persistent gold balance of the currency store.
    pub fn gold_balance(&self) -> i32 {
        self.world.resource::<Currency>().0.gold_balance()
    }

    /// Effects emitted during the last fixed update.
    pub fn recent_effects(&self) -> &[EffectDescriptor] {
        &self.world.resource::<Effects>().recent
    }

    /// Get the current match tick.
    pub fn current_tick(&self) -> u64 {
        self.clock().tick
    }

    /// Get the elapsed match time.
    pub fn current_time(&self) -> f32 {
        self.clock().now()
    }

    /// Get a snapshot of the current match state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the spatial grid reference (for debugging/visualization).
    pub fn spatial_grid(&self) -> &SpatialGrid {
        self.world.resource::<SpatialGrid>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for MatchWorld {
    fn default() -> Self {
        Self::with_defaults()
    }
}
