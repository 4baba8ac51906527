//! Match snapshot types.
//!
//! The `Snapshot` struct provides a serializable view of the match state
//! that presentation layers can draw from without touching the ECS world.

use crate::components::*;
use crate::geometry::Vec2;
use crate::ledger::{CrownState, ScoreLedger, ScoreRecord};
use crate::safe_zone::{SafeZone, ZoneStage};
use crate::systems::clock::{MatchClock, MatchPhase};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: u32,
    pub name: String,
    pub is_bot: bool,
    pub archetype: Archetype,
    pub x: f32,
    pub y: f32,
    pub facing_x: f32,
    pub facing_y: f32,
    pub health: f32,
    pub health_max: f32,
    pub alive: bool,
    /// Bot state, `None` for player-controlled participants.
    pub bot_state: Option<BotState>,
}

/// Snapshot of a monster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsterSnapshot {
    pub kind: MonsterKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub health_max: f32,
    pub alive: bool,
}

/// Snapshot of a projectile in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub x: f32,
    pub y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub from_monster: bool,
    pub explosive: bool,
}

/// Snapshot of a destructible prop or floor item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropSnapshot {
    pub x: f32,
    pub y: f32,
    /// Health left, `None` for items.
    pub health: Option<f32>,
    pub item: Option<PickupKind>,
}

/// Safe zone circle and timer stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub center: Vec2,
    pub radius: f32,
    pub next_center: Vec2,
    pub next_radius: f32,
    pub damage_per_second: f32,
    pub stage: ZoneStage,
}

/// Score row of one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub id: u32,
    pub record: ScoreRecord,
}

/// Complete match state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current match tick.
    pub tick: u64,
    /// Elapsed match time in seconds.
    pub time: f32,
    pub remaining: f32,
    pub phase: MatchPhase,
    pub actors: Vec<ActorSnapshot>,
    pub monsters: Vec<MonsterSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub props: Vec<PropSnapshot>,
    pub crown: CrownState,
    pub zone: ZoneSnapshot,
    /// Scores in registration order.
    pub scores: Vec<ScoreSnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World) -> Self {
        let mut actors = Vec::new();
        let mut query = world.query::<(
            &ActorId,
            &DisplayName,
            &Participant,
            &Weapon,
            &Position,
            &Facing,
            &Health,
            Option<&BotBrain>,
        )>();
        for (id, name, participant, weapon, pos, facing, health, brain) in query.iter(world) {
            actors.push(ActorSnapshot {
                id: id.0,
                name: name.0.clone(),
                is_bot: participant.is_bot,
                archetype: weapon.archetype,
                x: pos.x,
                y: pos.y,
                facing_x: facing.0.x,
                facing_y: facing.0.y,
                health: health.current,
                health_max: health.max,
                alive: health.is_alive(),
                bot_state: brain.map(|b| b.state),
            });
        }
        actors.sort_by_key(|a| a.id);

        let mut monsters = Vec::new();
        let mut monster_query = world.query::<(&MonsterBrain, &Position, &Health)>();
        for (brain, pos, health) in monster_query.iter(world) {
            monsters.push(MonsterSnapshot {
                kind: brain.kind,
                x: pos.x,
                y: pos.y,
                health: health.current,
                health_max: health.max,
                alive: health.is_alive(),
            });
        }

        let mut projectiles = Vec::new();
        let mut projectile_query = world.query::<(&Projectile, &Position)>();
        for (shot, pos) in projectile_query.iter(world) {
            projectiles.push(ProjectileSnapshot {
                x: pos.x,
                y: pos.y,
                dir_x: shot.direction.x,
                dir_y: shot.direction.y,
                from_monster: shot.user == ProjectileUser::Monster,
                explosive: shot.explosion_radius > 0.0,
            });
        }

        let mut props = Vec::new();
        let mut prop_query = world.query_filtered::<(&Position, &Health), With<Destructible>>();
        for (pos, health) in prop_query.iter(world) {
            props.push(PropSnapshot {
                x: pos.x,
                y: pos.y,
                health: Some(health.current),
                item: None,
            });
        }
        let mut item_query = world.query::<(&Position, &Pickup)>();
        for (pos, pickup) in item_query.iter(world) {
            props.push(PropSnapshot {
                x: pos.x,
                y: pos.y,
                health: None,
                item: Some(pickup.kind),
            });
        }

        let (crown, scores) = match world.get_resource::<ScoreLedger>() {
            Some(ledger) => (
                ledger.crown(),
                ledger
                    .actors()
                    .map(|(id, record)| ScoreSnapshot {
                        id: id.0,
                        record: record.clone(),
                    })
                    .collect(),
            ),
            None => (CrownState::Unspawned, Vec::new()),
        };

        let zone = world
            .get_resource::<SafeZone>()
            .map(|zone| ZoneSnapshot {
                center: zone.center(),
                radius: zone.radius(),
                next_center: zone.next_center(),
                next_radius: zone.next_radius(),
                damage_per_second: zone.damage_per_second(),
                stage: zone.stage(),
            })
            .unwrap_or(ZoneSnapshot {
                center: Vec2::ZERO,
                radius: 0.0,
                next_center: Vec2::ZERO,
                next_radius: 0.0,
                damage_per_second: 0.0,
                stage: ZoneStage::Final,
            });

        let clock = world.get_resource::<MatchClock>().cloned().unwrap_or_default();

        Self {
            tick: clock.tick,
            time: clock.elapsed,
            remaining: clock.remaining(),
            phase: clock.phase,
            actors,
            monsters,
            projectiles,
            props,
            crown,
            zone,
            scores,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
