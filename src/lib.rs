//! Crown Arena - Match Core
//!
//! A deterministic, fixed-timestep ECS simulation of an arena match:
//! participants with weapon archetypes, bots, monsters, a contested crown,
//! bounties and a shrinking safe zone.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod combat_math;
pub mod components;
pub mod config;
pub mod engine_bridge;
pub mod error;
pub mod geometry;
pub mod ledger;
pub mod rng;
pub mod safe_zone;
pub mod scheduler;
pub mod services;
pub mod spatial;
pub mod systems;
pub mod targeting;
pub mod world;

pub use api::{MatchWorld, ParticipantSpec};
pub use components::*;
pub use config::MatchConfig;
pub use error::{ConfigError, StoreError};
pub use geometry::Vec2;
pub use ledger::{CrownState, FinalRanking, RankingEntry, ScoreLedger, ScoreRecord};
pub use safe_zone::{SafeZone, ZoneStage};
pub use services::MatchServices;
pub use spatial::{SpatialEntry, SpatialGrid};
pub use systems::*;
pub use world::Snapshot;
