//! ECS Components for the arena simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use crate::config::{BotProfile, MonsterProfile, SkillConfig, WeaponStats};
use crate::targeting::Candidate;
use crate::geometry::Vec2;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Position on the arena floor (x = east/west, y = north/south).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn as_vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set(&mut self, v: Vec2) {
        self.x = v.x;
        self.y = v.y;
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        self.as_vec().distance(other.as_vec())
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Unit direction a body is facing.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Facing(pub Vec2);

impl Facing {
    /// Normalized facing; degenerate directions keep the default.
    pub fn new(direction: Vec2) -> Self {
        let mut facing = Self::default();
        facing.turn_to(direction);
        facing
    }

    /// Turn toward `direction`, ignoring zero-length input.
    pub fn turn_to(&mut self, direction: Vec2) {
        let n = direction.normalize_or_zero();
        if n != Vec2::ZERO {
            self.0 = n;
        }
    }
}

impl Default for Facing {
    fn default() -> Self {
        Self(Vec2::FORWARD)
    }
}

/// Base movement speed in units per second.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveSpeed(pub f32);

/// Movement direction requested by the input layer for a player-controlled
/// participant. Zero means stand still.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MoveIntent(pub Vec2);

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable identifier of a registered participant.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayName(pub String);

/// A match participant, either player-controlled or a bot.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Participant {
    pub is_bot: bool,
}

/// Lookup from participant id to its entity.
#[derive(Resource, Debug, Clone, Default)]
pub struct ActorIndex {
    entities: HashMap<ActorId, Entity>,
    next_id: u32,
}

impl ActorIndex {
    /// Reserve the next id for `entity`.
    pub fn register(&mut self, entity: Entity) -> ActorId {
        self.next_id += 1;
        let id = ActorId(self.next_id);
        self.entities.insert(id, entity);
        id
    }

    pub fn entity(&self, id: ActorId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Weapon archetype chosen at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Shotgun,
    Bazooka,
    Sword,
}

impl Archetype {
    pub fn is_melee(self) -> bool {
        matches!(self, Archetype::Sword)
    }
}

/// Personality of a bot, shifting its target priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BotBehavior {
    Aggressive,
    Defensive,
    #[default]
    Balanced,
    Hunter,
    CrownSeeker,
}

// ============================================================================
// BODY COMPONENTS
// ============================================================================

/// Closed set of body kinds that take part in collision and targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Participant,
    Monster,
    Destructible,
    Item,
}

/// Circular collision body.
#[derive(Component, Debug, Clone, Copy)]
pub struct Collider {
    pub kind: BodyKind,
    pub radius: f32,
}

impl Collider {
    pub fn new(kind: BodyKind, radius: f32) -> Self {
        Self { kind, radius }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Result of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target was already dead; nothing changed.
    Ignored,
    Wounded,
    /// This hit moved the target from alive to dead.
    Killed,
}

/// Anything that can take damage and die.
pub trait Damageable {
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome;
    fn is_alive(&self) -> bool;
}

/// Health pool with a one-way alive to dead transition.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    dead: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            dead: false,
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    /// Restore health on a living body, capped at max.
    pub fn heal(&mut self, amount: f32) {
        if !self.dead && amount > 0.0 {
            self.current = (self.current + amount).min(self.max);
        }
    }
}

impl Damageable for Health {
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.dead {
            return DamageOutcome::Ignored;
        }
        self.current = (self.current - amount).clamp(0.0, self.max);
        if self.current <= 0.0 {
            self.dead = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }

    fn is_alive(&self) -> bool {
        !self.dead
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// The participant who last damaged this body, used for kill credit.
/// `None` means the last blow was environmental or came from a monster.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LastAttacker(pub Option<Entity>);

/// What happens when a body dies.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum DeathBehavior {
    /// Kill is scored in the ledger; the crown may change hands.
    Participant,
    /// Gold is paid to the killer and the corpse is removed after a delay.
    Monster { gold_bounty: i32 },
    /// Gold is paid to the killer and a pickup may drop.
    Destructible { gold_reward: i32, drop_chance: f32 },
}

/// Weapon carried by a participant.
#[derive(Component, Debug, Clone, Copy)]
pub struct Weapon {
    pub archetype: Archetype,
    pub stats: WeaponStats,
}

// ============================================================================
// ACTION COMPONENTS
// ============================================================================

/// Discrete actions a participant can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Attack,
    Skill1,
    Skill2,
    Ultimate,
    Dash,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Attack,
        ActionKind::Skill1,
        ActionKind::Skill2,
        ActionKind::Ultimate,
        ActionKind::Dash,
    ];

    fn index(self) -> usize {
        match self {
            ActionKind::Attack => 0,
            ActionKind::Skill1 => 1,
            ActionKind::Skill2 => 2,
            ActionKind::Ultimate => 3,
            ActionKind::Dash => 4,
        }
    }

    /// The skill slot this action occupies, if it is a skill.
    pub fn skill_slot(self) -> Option<SkillSlot> {
        match self {
            ActionKind::Skill1 => Some(SkillSlot::Skill1),
            ActionKind::Skill2 => Some(SkillSlot::Skill2),
            ActionKind::Ultimate => Some(SkillSlot::Ultimate),
            ActionKind::Attack | ActionKind::Dash => None,
        }
    }
}

/// Mutually exclusive skills. At most one runs per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillSlot {
    /// Movement speed buff.
    Skill1,
    /// Burst of basic attacks.
    Skill2,
    /// Delayed area strike.
    Ultimate,
}

/// Why an action request was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionRejected {
    Dead,
    OnCooldown { remaining: f32 },
    AlreadyDashing,
}

/// Backward dash in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashMotion {
    pub from: Vec2,
    pub to: Vec2,
    pub started_at: f32,
    pub duration: f32,
}

impl DashMotion {
    pub fn position_at(&self, now: f32) -> Vec2 {
        let t = if self.duration > 0.0 {
            ((now - self.started_at) / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.from.lerp(self.to, t)
    }
}

/// Cooldowns and running skill state of one participant.
#[derive(Component, Debug, Clone)]
pub struct ActionState {
    cooldowns: [f32; 5],
    last_used: [Option<f32>; 5],
    pub active_skill: Option<SkillSlot>,
    pub dash: Option<DashMotion>,
}

impl ActionState {
    pub fn new(attack_interval: f32, skills: &SkillConfig) -> Self {
        Self {
            cooldowns: [
                attack_interval,
                skills.skill1_cooldown,
                skills.skill2_cooldown,
                skills.ultimate_cooldown,
                skills.dash_cooldown,
            ],
            last_used: [None; 5],
            active_skill: None,
            dash: None,
        }
    }

    pub fn cooldown(&self, kind: ActionKind) -> f32 {
        self.cooldowns[kind.index()]
    }

    pub fn last_used(&self, kind: ActionKind) -> Option<f32> {
        self.last_used[kind.index()]
    }

    /// Seconds until `kind` may be used again; zero when ready.
    pub fn cooldown_remaining(&self, kind: ActionKind, now: f32) -> f32 {
        self.last_used[kind.index()]
            .map_or(0.0, |t| (self.cooldown(kind) - (now - t)).max(0.0))
    }

    /// Ready once a full cooldown has passed since the last use.
    pub fn is_ready(&self, kind: ActionKind, now: f32) -> bool {
        self.last_used[kind.index()].map_or(true, |t| now - t >= self.cooldown(kind))
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.is_some()
    }

    /// Gate and record one use of `kind`. Nothing changes on rejection.
    /// Starting a skill does not touch the cooldown of the skill it
    /// interrupts.
    pub fn try_begin(&mut self, kind: ActionKind, now: f32, alive: bool) -> Result<(), ActionRejected> {
        if !alive {
            return Err(ActionRejected::Dead);
        }
        if kind == ActionKind::Dash && self.is_dashing() {
            return Err(ActionRejected::AlreadyDashing);
        }
        if !self.is_ready(kind, now) {
            return Err(ActionRejected::OnCooldown {
                remaining: self.cooldown_remaining(kind, now),
            });
        }
        self.last_used[kind.index()] = Some(now);
        if let Some(slot) = kind.skill_slot() {
            self.active_skill = Some(slot);
        }
        Ok(())
    }

    pub fn speed_multiplier(&self, skills: &SkillConfig) -> f32 {
        if self.active_skill == Some(SkillSlot::Skill1) {
            skills.skill1_speed_multiplier
        } else {
            1.0
        }
    }
}

// ============================================================================
// PROJECTILE COMPONENTS
// ============================================================================

/// Side that fired a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileUser {
    Participant,
    Monster,
}

/// Single-hit projectile flying in a straight line.
#[derive(Component, Debug, Clone, Copy)]
pub struct Projectile {
    /// Participant that fired it. Monster shots have no owner.
    pub owner: Option<Entity>,
    pub user: ProjectileUser,
    pub damage: f32,
    pub direction: Vec2,
    pub speed: f32,
    /// Seconds of flight left.
    pub remaining: f32,
    /// Zero for plain projectiles.
    pub explosion_radius: f32,
}

// ============================================================================
// BOT COMPONENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BotState {
    #[default]
    Idle,
    Patrol,
    Combat,
    Flee,
    SeekCrown,
    SeekItem,
    UseSkill,
}

/// What a bot saw at its last perception refresh.
#[derive(Debug, Clone, Default)]
pub struct Perception {
    /// Living, visible participants and monsters, nearest first.
    pub targets: Vec<Candidate<Entity>>,
    /// Visible items, nearest first.
    pub items: Vec<(Entity, Vec2)>,
    /// Last known crown position.
    pub crown: Option<Vec2>,
    /// A hostile projectile is within the threat radius.
    pub threatened: bool,
}

/// State machine and timers of an AI-controlled participant.
#[derive(Component, Debug, Clone)]
pub struct BotBrain {
    pub profile: BotProfile,
    pub state: BotState,
    pub target: Option<Entity>,
    /// Match time the current target was acquired.
    pub engaged_at: f32,
    pub next_perception_at: f32,
    pub next_decision_at: f32,
    pub perception: Perception,
    /// Set by each perception refresh; the next combat tick spends it on its
    /// skill and dodge rolls.
    pub tactics_due: bool,
}

impl BotBrain {
    pub fn new(profile: BotProfile) -> Self {
        Self {
            profile,
            state: BotState::Idle,
            target: None,
            engaged_at: 0.0,
            next_perception_at: 0.0,
            next_decision_at: 0.0,
            perception: Perception::default(),
            tactics_due: false,
        }
    }

    pub fn behavior(&self) -> BotBehavior {
        self.profile.behavior
    }

    /// Drop the current target and fall back to patrolling.
    pub fn disengage(&mut self) {
        self.target = None;
        self.state = BotState::Patrol;
    }
}

// ============================================================================
// MONSTER COMPONENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonsterKind {
    Melee,
    Ranged,
}

/// Chase-and-strike state for a spawned monster.
#[derive(Component, Debug, Clone, Copy)]
pub struct MonsterBrain {
    pub kind: MonsterKind,
    pub profile: MonsterProfile,
    pub last_attack_at: Option<f32>,
    pub target: Option<Entity>,
}

impl MonsterBrain {
    pub fn new(kind: MonsterKind, profile: MonsterProfile) -> Self {
        Self {
            kind,
            profile,
            last_attack_at: None,
            target: None,
        }
    }

    pub fn can_attack(&self, now: f32) -> bool {
        self.last_attack_at
            .map_or(true, |last| now - last >= self.profile.attack_cooldown)
    }
}

// ============================================================================
// PICKUP COMPONENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PickupKind {
    Gold(i32),
    HealthRestore(f32),
}

/// Item lying on the floor, collected by the first participant to touch it.
#[derive(Component, Debug, Clone, Copy)]
pub struct Pickup {
    pub kind: PickupKind,
}

/// Marker for destructible props.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Destructible;

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Components shared by every damageable body.
#[derive(Bundle)]
pub struct BodyBundle {
    pub position: Position,
    pub facing: Facing,
    pub health: Health,
    pub collider: Collider,
    pub last_attacker: LastAttacker,
    pub death: DeathBehavior,
}

impl BodyBundle {
    pub fn new(position: Vec2, max_health: f32, collider: Collider, death: DeathBehavior) -> Self {
        Self {
            position: position.into(),
            facing: Facing::default(),
            health: Health::new(max_health),
            collider,
            last_attacker: LastAttacker::default(),
            death,
        }
    }
}

/// Bundle for spawning a monster.
#[derive(Bundle)]
pub struct MonsterBundle {
    pub body: BodyBundle,
    pub speed: MoveSpeed,
    pub brain: MonsterBrain,
}

impl MonsterBundle {
    pub fn new(kind: MonsterKind, profile: MonsterProfile, position: Vec2, gold_bounty: i32) -> Self {
        Self {
            body: BodyBundle::new(
                position,
                profile.health,
                Collider::new(BodyKind::Monster, profile.body_radius),
                DeathBehavior::Monster { gold_bounty },
            ),
            speed: MoveSpeed(profile.move_speed),
            brain: MonsterBrain::new(kind, profile),
        }
    }
}

/// Bundle for spawning a destructible prop.
#[derive(Bundle)]
pub struct DestructibleBundle {
    pub body: BodyBundle,
    pub marker: Destructible,
}

impl DestructibleBundle {
    pub fn new(position: Vec2, health: f32, radius: f32, gold_reward: i32, drop_chance: f32) -> Self {
        Self {
            body: BodyBundle::new(
                position,
                health,
                Collider::new(BodyKind::Destructible, radius),
                DeathBehavior::Destructible {
                    gold_reward,
                    drop_chance,
                },
            ),
            marker: Destructible,
        }
    }
}

/// Bundle for an item lying on the floor.
#[derive(Bundle)]
pub struct ItemBundle {
    pub position: Position,
    pub collider: Collider,
    pub pickup: Pickup,
}

impl ItemBundle {
    pub fn new(position: Vec2, kind: PickupKind, pickup_radius: f32) -> Self {
        Self {
            position: position.into(),
            collider: Collider::new(BodyKind::Item, pickup_radius),
            pickup: Pickup { kind },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_is_monotonic_and_dies_once() {
        let mut health = Health::new(30.0);
        assert_eq!(health.apply_damage(10.0), DamageOutcome::Wounded);
        assert_eq!(health.current, 20.0);
        assert_eq!(health.apply_damage(0.0), DamageOutcome::Wounded);
        assert_eq!(health.current, 20.0);
        assert_eq!(health.apply_damage(50.0), DamageOutcome::Killed);
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());

        // Dead bodies ignore everything afterwards
        assert_eq!(health.apply_damage(5.0), DamageOutcome::Ignored);
        assert_eq!(health.apply_damage(0.0), DamageOutcome::Ignored);
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_negative_damage_never_exceeds_max() {
        let mut health = Health::new(50.0);
        health.apply_damage(-20.0);
        assert_eq!(health.current, 50.0);
    }

    #[test]
    fn test_heal_only_while_alive() {
        let mut health = Health::new(100.0);
        health.apply_damage(40.0);
        health.heal(15.0);
        assert_eq!(health.current, 75.0);
        health.heal(100.0);
        assert_eq!(health.current, 100.0);

        health.apply_damage(100.0);
        health.heal(50.0);
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_cooldown_gate_at_exact_boundary() {
        let skills = SkillConfig::default();
        let mut actions = ActionState::new(0.5, &skills);
        assert_eq!(actions.try_begin(ActionKind::Skill1, 10.0, true), Ok(()));
        assert!(matches!(
            actions.try_begin(ActionKind::Skill1, 13.9, true),
            Err(ActionRejected::OnCooldown { .. })
        ));
        assert!(matches!(
            actions.try_begin(ActionKind::Skill1, 13.99995, true),
            Err(ActionRejected::OnCooldown { .. })
        ));
        assert!(!actions.is_ready(ActionKind::Skill1, 13.99995));
        assert_eq!(actions.last_used(ActionKind::Skill1), Some(10.0));
        assert!(actions.is_ready(ActionKind::Skill1, 14.0));
        assert_eq!(actions.try_begin(ActionKind::Skill1, 14.0, true), Ok(()));
        assert!((actions.cooldown_remaining(ActionKind::Skill1, 15.0) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_dead_and_dashing_rejections() {
        let skills = SkillConfig::default();
        let mut actions = ActionState::new(0.5, &skills);
        assert_eq!(actions.try_begin(ActionKind::Attack, 0.0, false), Err(ActionRejected::Dead));
        assert_eq!(actions.last_used(ActionKind::Attack), None);

        assert_eq!(actions.try_begin(ActionKind::Dash, 0.0, true), Ok(()));
        actions.dash = Some(DashMotion {
            from: Vec2::ZERO,
            to: Vec2::new(0.0, -3.0),
            started_at: 0.0,
            duration: 0.2,
        });
        assert_eq!(actions.try_begin(ActionKind::Dash, 0.1, true), Err(ActionRejected::AlreadyDashing));
        // Dashing does not block skills
        assert_eq!(actions.try_begin(ActionKind::Skill2, 0.1, true), Ok(()));
        assert_eq!(actions.active_skill, Some(SkillSlot::Skill2));
    }

    #[test]
    fn test_dash_interpolates_linearly() {
        let dash = DashMotion {
            from: Vec2::ZERO,
            to: Vec2::new(0.0, -3.0),
            started_at: 1.0,
            duration: 0.2,
        };
        assert!((dash.position_at(1.1).y + 1.5).abs() < 1e-4);
        assert_eq!(dash.position_at(5.0), Vec2::new(0.0, -3.0));
    }

    #[test]
    fn test_facing_ignores_zero_direction() {
        let mut facing = Facing::new(Vec2::new(3.0, 0.0));
        assert_eq!(facing.0, Vec2::new(1.0, 0.0));
        facing.turn_to(Vec2::ZERO);
        assert_eq!(facing.0, Vec2::new(1.0, 0.0));
    }
}
