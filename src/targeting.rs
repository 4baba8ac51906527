//! Target ranking and visibility.
//!
//! Bots rank combat targets by a weighted blend of proximity and class
//! priority. Player-controlled ranged weapons use the auto-aim variant,
//! which only considers candidates inside a forward cone and on screen.
//! Both treat "no candidates" as a normal empty result.

use crate::components::BotBehavior;
use crate::config::BotProfile;
use crate::geometry::{segment_circle_entry, Vec2};
use crate::services::ScreenProjector;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Weight of proximity in the combat score.
pub const DISTANCE_WEIGHT: f32 = 0.3;
/// Weight of class priority in the combat score.
pub const PRIORITY_WEIGHT: f32 = 0.7;
/// Priority added for a participant carrying positive bounty.
pub const BOUNTY_BONUS: f32 = 0.2;

const AIM_ANGLE_WEIGHT: f32 = 0.4;
const AIM_DISTANCE_WEIGHT: f32 = 0.3;
const AIM_SCREEN_WEIGHT: f32 = 0.3;

// ============================================================================
// OBSTACLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Blocks sight and stops projectiles.
    Solid,
    /// Decorative geometry; ignored by sight and projectiles.
    Effect,
}

/// Static circular blocker on the arena floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub radius: f32,
    pub kind: ObstacleKind,
}

/// All static geometry in the arena.
#[derive(Resource, Debug, Clone, Default)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn add(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// True when no solid obstacle sits between `from` and `to`.
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        self.first_solid_hit(from, to).is_none()
    }

    /// Fraction along `from -> to` where the segment first enters solid
    /// geometry.
    pub fn first_solid_hit(&self, from: Vec2, to: Vec2) -> Option<f32> {
        self.obstacles
            .iter()
            .filter(|o| o.kind == ObstacleKind::Solid)
            .filter_map(|o| segment_circle_entry(from, to, o.center, o.radius))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

// ============================================================================
// COMBAT TARGET SELECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateClass {
    Participant,
    Monster,
}

/// A body seen by perception.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<T> {
    pub id: T,
    pub class: CandidateClass,
    pub position: Vec2,
    pub alive: bool,
    /// Current ledger bounty; zero for monsters.
    pub bounty: i32,
}

/// Per-class priority after the behaviour modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetWeights {
    pub participant: f32,
    pub monster: f32,
    /// Applied after the bounty bonus.
    pub participant_scale: f32,
}

impl TargetWeights {
    pub fn new(profile: &BotProfile, behavior: BotBehavior) -> Self {
        let participant_scale = match behavior {
            BotBehavior::Aggressive => 1.5,
            _ => 1.0,
        };
        let monster_scale = match behavior {
            BotBehavior::Hunter => 1.5,
            _ => 1.0,
        };
        Self {
            participant: profile.player_priority,
            monster: profile.monster_priority * monster_scale,
            participant_scale,
        }
    }

    pub fn priority<T>(&self, candidate: &Candidate<T>) -> f32 {
        match candidate.class {
            CandidateClass::Participant => {
                let bonus = if candidate.bounty > 0 { BOUNTY_BONUS } else { 0.0 };
                (self.participant + bonus) * self.participant_scale
            }
            CandidateClass::Monster => self.monster,
        }
    }
}

/// `distanceScore * 0.3 + priority * 0.7` with
/// `distanceScore = max(0, 1 - distance / radius)`.
pub fn score_combat_target<T>(
    observer: Vec2,
    detection_radius: f32,
    weights: &TargetWeights,
    candidate: &Candidate<T>,
) -> f32 {
    let distance = observer.distance(candidate.position);
    let distance_score = if detection_radius > 0.0 {
        (1.0 - distance / detection_radius).max(0.0)
    } else {
        0.0
    };
    distance_score * DISTANCE_WEIGHT + weights.priority(candidate) * PRIORITY_WEIGHT
}

/// Highest-scoring living candidate. On equal scores the earlier candidate
/// wins.
pub fn select_combat_target<T: Copy>(
    observer: Vec2,
    detection_radius: f32,
    weights: &TargetWeights,
    candidates: &[Candidate<T>],
) -> Option<T> {
    let mut best: Option<(T, f32)> = None;
    for candidate in candidates.iter().filter(|c| c.alive) {
        let score = score_combat_target(observer, detection_radius, weights, candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate.id, score));
        }
    }
    best.map(|(id, _)| id)
}

// ============================================================================
// AUTO-AIM
// ============================================================================

/// Cone and reach used by the auto-aim query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimQuery {
    pub eye: Vec2,
    pub forward: Vec2,
    pub radius: f32,
    pub cone_deg: f32,
}

/// Lowest `angle * 0.4 + distance * 0.3 + screenOffset * 0.3` among living
/// candidates inside the cone, the radius and the viewport. Each term is
/// normalised to `0..=1`.
pub fn select_auto_aim_target<T: Copy>(
    query: &AimQuery,
    candidates: &[Candidate<T>],
    projector: &dyn ScreenProjector,
) -> Option<T> {
    let mut best: Option<(T, f32)> = None;
    for candidate in candidates.iter().filter(|c| c.alive) {
        let to_target = candidate.position - query.eye;
        let distance = to_target.length();
        if distance > query.radius {
            continue;
        }
        let angle = query.forward.angle_between_deg(to_target);
        if angle > query.cone_deg {
            continue;
        }
        let Some(screen) = projector.project(query.eye, query.forward, candidate.position) else {
            continue;
        };
        if !(0.0..=1.0).contains(&screen.x) || !(0.0..=1.0).contains(&screen.y) {
            continue;
        }

        let angle_term = if query.cone_deg > 0.0 { angle / query.cone_deg } else { 0.0 };
        let distance_term = if query.radius > 0.0 { distance / query.radius } else { 0.0 };
        // Max distance from the viewport centre is sqrt(0.5)
        let screen_term = screen.distance(Vec2::new(0.5, 0.5)) / std::f32::consts::FRAC_1_SQRT_2;
        let score = angle_term * AIM_ANGLE_WEIGHT
            + distance_term * AIM_DISTANCE_WEIGHT
            + screen_term * AIM_SCREEN_WEIGHT;

        if best.map_or(true, |(_, s)| score < s) {
            best = Some((candidate.id, score));
        }
    }
    best.map(|(id, _)| id)
}
