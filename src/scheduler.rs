//! Central timer queue for every "wait, then continue" behaviour.
//!
//! Skills, dashes, zone damage ticks, corpse removal and the crown spawn are
//! all expressed as tasks carrying a resume time and a continuation. The
//! `task_dispatch_system` pops due tasks each tick and runs their continuation.
//! Cancelling a behaviour means removing its tasks from the queue.

use bevy_ecs::prelude::*;

/// Slack applied when comparing a resume time against the clock, absorbing
/// accumulated fixed-step rounding.
pub const TIME_EPSILON: f32 = 1.0e-4;

/// Cancellation group a task belongs to. Cancelling one domain for an owner
/// leaves its tasks in other domains untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskDomain {
    /// Skill 1, skill 2 and ultimate continuations.
    Skill,
    Dash,
    /// Damage-over-time while outside the safe zone.
    Zone,
    /// Removal of dead bodies.
    Lifecycle,
    /// Match-wide events with no owner.
    Match,
}

/// What to do when a task comes due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskKind {
    /// Release the running skill.
    SkillEnd,
    /// Fire one more burst attack; `remaining` counts this shot.
    BurstShot { remaining: u32 },
    /// Damage instant of the ultimate.
    UltimateStrike,
    DashEnd,
    ZoneDamageTick,
    Despawn,
    CrownSpawn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTask {
    pub id: u64,
    pub resume_at: f32,
    pub owner: Option<Entity>,
    pub domain: TaskDomain,
    pub kind: TaskKind,
}

/// Resumable tasks keyed by match time.
#[derive(Resource, Debug, Default)]
pub struct TaskScheduler {
    tasks: Vec<ScheduledTask>,
    next_id: u64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a continuation. Returns the task id.
    pub fn schedule(
        &mut self,
        resume_at: f32,
        owner: Option<Entity>,
        domain: TaskDomain,
        kind: TaskKind,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            resume_at,
            owner,
            domain,
            kind,
        });
        id
    }

    /// Drop every task of `owner` in `domain`. Returns how many were removed.
    pub fn cancel(&mut self, owner: Entity, domain: TaskDomain) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|t| !(t.owner == Some(owner) && t.domain == domain));
        before - self.tasks.len()
    }

    /// Drop every task owned by `owner`, regardless of domain.
    pub fn cancel_owner(&mut self, owner: Entity) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != Some(owner));
        before - self.tasks.len()
    }

    /// Remove and return the tasks due at `now`, oldest resume time first and
    /// insertion order among equal times.
    pub fn take_due(&mut self, now: f32) -> Vec<ScheduledTask> {
        let mut due = Vec::new();
        self.tasks.retain(|t| {
            if t.resume_at <= now + TIME_EPSILON {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| {
            a.resume_at
                .partial_cmp(&b.resume_at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        due
    }

    pub fn has_task(&self, owner: Entity, domain: TaskDomain) -> bool {
        self.tasks
            .iter()
            .any(|t| t.owner == Some(owner) && t.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
