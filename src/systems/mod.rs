//! ECS systems for the arena match.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## System Ordering
//!
//! One fixed update runs three chained groups:
//!
//! **Group 1 (Clock)** - always runs:
//! - `match_clock_system` - Advances the match clock
//! - `match_end_system` - Ends the match, freezes scores, computes ranking
//!
//! **Group 2 (Intent)** - only while the match is running:
//! - `task_dispatch_system` - Resumes due scheduler tasks
//! - `spatial_grid_update_system` - Rebuilds spatial grid
//! - `bot_perception_system` - Refreshes what bots see (reads SpatialGrid)
//! - `bot_decision_system` - Re-evaluates bot states
//! - `bot_behavior_system` - Executes bot states, requests actions
//! - `monster_behavior_system` - Monster chase and attacks
//! - `action_system` - Starts requested actions
//! - `attack_resolution_system` - Turns attacks into damage and projectiles
//!
//! **Group 3 (Resolution)** - depends on Group 2:
//! - `movement_system` - Moves bodies
//! - `projectile_system` - Flies projectiles, queues hits
//! - `area_strike_system` - Applies ultimate strikes
//! - `pickup_system` - Crown and item pickups
//! - `safe_zone_system` - Advances the zone, enrolls exposed participants
//! - `damage_apply_system` - Applies all queued damage
//! - `death_system` - Reports each death exactly once
//! - `crown_hold_system` - Accrues crown hold time
//! - `monster_spawn_system` - Spawns monster waves
//!
//! All damage of a tick is applied before any death of that tick is
//! processed.

pub mod actions;
pub mod ai;
pub mod attacks;
pub mod clock;
pub mod damage;
pub mod dispatch;
pub mod monsters;
pub mod movement;
pub mod pickups;
pub mod projectiles;
pub mod serialization;
pub mod spawner;
pub mod zone;

pub use actions::*;
pub use ai::*;
pub use attacks::*;
pub use clock::*;
pub use damage::*;
pub use dispatch::*;
pub use monsters::*;
pub use movement::*;
pub use pickups::*;
pub use projectiles::*;
pub use serialization::*;
pub use spawner::*;
pub use zone::*;
