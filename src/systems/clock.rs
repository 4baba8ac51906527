//! Match clock and the end-of-match cancellation point.

use crate::ledger::{FinalRanking, ScoreLedger};
use crate::scheduler::{TaskScheduler, TIME_EPSILON};
use crate::services::Effects;
use crate::systems::spawner::SpawnerState;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed timestep length for the current update.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    #[default]
    Pending,
    Running,
    Ended,
}

/// Match countdown. Elapsed time is derived from the tick count so it does
/// not drift with accumulated float error.
#[derive(Resource, Debug, Clone, Default)]
pub struct MatchClock {
    pub duration: f32,
    pub tick: u64,
    pub elapsed: f32,
    pub phase: MatchPhase,
    /// Set to end the match on the next update regardless of time left.
    pub end_requested: bool,
}

impl MatchClock {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    /// Current match time in seconds.
    #[inline]
    pub fn now(&self) -> f32 {
        self.elapsed
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    pub fn is_running(&self) -> bool {
        self.phase == MatchPhase::Running
    }

    pub fn expired(&self) -> bool {
        self.elapsed + TIME_EPSILON >= self.duration
    }
}

/// Run condition for every gameplay system.
pub fn match_running(clock: Res<MatchClock>) -> bool {
    clock.is_running()
}

/// Advances the clock by one fixed step.
///
/// ## Data Access
/// - Reads: DeltaTime
/// - Writes: MatchClock, Effects
pub fn match_clock_system(dt: Res<DeltaTime>, mut clock: ResMut<MatchClock>, mut effects: ResMut<Effects>) {
    effects.begin_tick();
    if !clock.is_running() {
        return;
    }
    clock.tick += 1;
    clock.elapsed = clock.tick as f32 * dt.0;
}

/// Ends the match once the clock runs out or an end was requested: scoring
/// freezes, pending tasks are dropped, spawning stops and the final ranking
/// is computed exactly once.
///
/// ## Data Access
/// - Writes: MatchClock, ScoreLedger, TaskScheduler, SpawnerState, FinalRanking
pub fn match_end_system(
    mut clock: ResMut<MatchClock>,
    mut ledger: ResMut<ScoreLedger>,
    mut scheduler: ResMut<TaskScheduler>,
    mut spawner: ResMut<SpawnerState>,
    mut ranking: ResMut<FinalRanking>,
) {
    if !clock.is_running() || !(clock.expired() || clock.end_requested) {
        return;
    }

    ledger.freeze();
    scheduler.clear();
    spawner.enabled = false;
    *ranking = ledger.compute_final_ranking();
    clock.phase = MatchPhase::Ended;

    match ranking.winner() {
        Some(winner) => log::info!(
            "match ended at {:.1}s, winner {} ({:?})",
            clock.elapsed,
            winner.record.name,
            winner.actor_id
        ),
        None => log::info!("match ended at {:.1}s with no participants", clock.elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ActorId;

    fn clock_world(duration: f32) -> World {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.5));
        let mut clock = MatchClock::new(duration);
        clock.phase = MatchPhase::Running;
        world.insert_resource(clock);
        world.insert_resource(Effects::default());
        world.insert_resource(ScoreLedger::new(10));
        world.insert_resource(TaskScheduler::new());
        world.insert_resource(SpawnerState::new(3.0));
        world.insert_resource(FinalRanking::default());
        world
    }

    #[test]
    fn test_clock_runs_out_and_ends_once() {
        let mut world = clock_world(1.0);
        world
            .resource_mut::<ScoreLedger>()
            .register_actor(ActorId(1), "Solo");

        let mut schedule = Schedule::default();
        schedule.add_systems((match_clock_system, match_end_system).chain());

        schedule.run(&mut world);
        assert!(world.resource::<MatchClock>().is_running());
        assert!(world.resource::<FinalRanking>().entries.is_empty());

        schedule.run(&mut world);
        let clock = world.resource::<MatchClock>();
        assert_eq!(clock.phase, MatchPhase::Ended);
        assert_eq!(clock.tick, 2);
        assert!(world.resource::<ScoreLedger>().is_frozen());
        assert!(!world.resource::<SpawnerState>().enabled);
        assert_eq!(world.resource::<FinalRanking>().entries.len(), 1);

        // The clock stays put once ended
        schedule.run(&mut world);
        assert_eq!(world.resource::<MatchClock>().tick, 2);
    }

    #[test]
    fn test_pending_clock_does_not_advance() {
        let mut world = clock_world(10.0);
        world.resource_mut::<MatchClock>().phase = MatchPhase::Pending;
        let mut schedule = Schedule::default();
        schedule.add_systems(match_clock_system);
        schedule.run(&mut world);
        assert_eq!(world.resource::<MatchClock>().elapsed, 0.0);
    }
}
