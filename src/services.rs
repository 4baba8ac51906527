//! Collaborators the simulation core talks to but does not own.
//!
//! Navigation, the persistent currency store, the effect spawner and the
//! camera projection are traits. A `MatchServices` context hands concrete
//! implementations to `MatchWorld`, which stores each one as a resource for
//! the systems that need it. In-process defaults are provided so a match can
//! run headless.

use crate::error::StoreError;
use crate::geometry::Vec2;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// NAVIGATION
// ============================================================================

/// Moves agents toward points. The core never computes paths itself.
pub trait NavigationService: Send + Sync {
    fn set_destination(&mut self, agent: Entity, point: Vec2);
    fn clear_destination(&mut self, agent: Entity);
    fn destination(&self, agent: Entity) -> Option<Vec2>;
    /// True when the agent has no destination or has reached it.
    fn has_arrived(&self, agent: Entity) -> bool;
    /// A walkable point within `max_radius` of `near`, if any.
    fn sample_valid_point(&self, near: Vec2, max_radius: f32) -> Option<Vec2>;
    /// Advance the agent from `from` by at most `max_step` toward its
    /// destination and return its new position.
    fn step_agent(&mut self, agent: Entity, from: Vec2, max_step: f32) -> Vec2;
    /// Drop all state for a despawned agent.
    fn forget(&mut self, agent: Entity);
}

#[derive(Debug, Clone, Copy, Default)]
struct NavAgent {
    position: Vec2,
    destination: Option<Vec2>,
}

/// Straight-line navigation on an open circular floor.
#[derive(Debug, Clone)]
pub struct OpenFieldNavigation {
    pub arena_radius: f32,
    pub stopping_distance: f32,
    agents: HashMap<Entity, NavAgent>,
}

impl OpenFieldNavigation {
    pub fn new(arena_radius: f32) -> Self {
        Self {
            arena_radius,
            stopping_distance: 0.5,
            agents: HashMap::new(),
        }
    }

    fn clamp_to_arena(&self, p: Vec2) -> Vec2 {
        let len = p.length();
        if len <= self.arena_radius {
            p
        } else {
            p * (self.arena_radius / len)
        }
    }
}

impl NavigationService for OpenFieldNavigation {
    fn set_destination(&mut self, agent: Entity, point: Vec2) {
        let target = self.clamp_to_arena(point);
        self.agents.entry(agent).or_default().destination = Some(target);
    }

    fn clear_destination(&mut self, agent: Entity) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.destination = None;
        }
    }

    fn destination(&self, agent: Entity) -> Option<Vec2> {
        self.agents.get(&agent).and_then(|a| a.destination)
    }

    fn has_arrived(&self, agent: Entity) -> bool {
        match self.agents.get(&agent) {
            Some(NavAgent {
                position,
                destination: Some(dest),
            }) => position.distance(*dest) <= self.stopping_distance,
            _ => true,
        }
    }

    fn sample_valid_point(&self, near: Vec2, max_radius: f32) -> Option<Vec2> {
        let clamped = self.clamp_to_arena(near);
        (clamped.distance(near) <= max_radius).then_some(clamped)
    }

    fn step_agent(&mut self, agent: Entity, from: Vec2, max_step: f32) -> Vec2 {
        let stopping = self.stopping_distance;
        let state = self.agents.entry(agent).or_default();
        let mut next = from;
        if let Some(dest) = state.destination {
            let to_dest = dest - from;
            let dist = to_dest.length();
            if dist > stopping {
                next = from + to_dest.normalize_or_zero() * max_step.min(dist);
            }
        }
        state.position = next;
        next
    }

    fn forget(&mut self, agent: Entity) {
        self.agents.remove(&agent);
    }
}

#[derive(Resource)]
pub struct Navigation(pub Box<dyn NavigationService>);

// ============================================================================
// CURRENCY AND UPGRADES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    Damage,
    MoveSpeed,
    GoldGain,
    MaxHealth,
}

impl UpgradeKind {
    pub fn bonus_per_level(self) -> f32 {
        match self {
            UpgradeKind::Damage => 2.0,
            UpgradeKind::MoveSpeed => 0.05,
            UpgradeKind::GoldGain => 1.0,
            UpgradeKind::MaxHealth => 10.0,
        }
    }
}

/// Persistent meta-progression: gold balance and upgrade levels.
pub trait CurrencyStore: Send + Sync {
    fn gold_balance(&self) -> i32;
    fn add_gold(&mut self, amount: i32);
    fn upgrade_bonus(&self, kind: UpgradeKind) -> f32;
    fn save(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeLevels {
    pub damage: u32,
    pub move_speed: u32,
    pub gold_gain: u32,
    pub max_health: u32,
}

impl UpgradeLevels {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Damage => self.damage,
            UpgradeKind::MoveSpeed => self.move_speed,
            UpgradeKind::GoldGain => self.gold_gain,
            UpgradeKind::MaxHealth => self.max_health,
        }
    }

    pub fn set_level(&mut self, kind: UpgradeKind, level: u32) {
        match kind {
            UpgradeKind::Damage => self.damage = level,
            UpgradeKind::MoveSpeed => self.move_speed = level,
            UpgradeKind::GoldGain => self.gold_gain = level,
            UpgradeKind::MaxHealth => self.max_health = level,
        }
    }
}

/// Saved wallet contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wallet {
    pub gold: i32,
    pub upgrades: UpgradeLevels,
}

impl Wallet {
    fn bonus(&self, kind: UpgradeKind) -> f32 {
        self.upgrades.level(kind) as f32 * kind.bonus_per_level()
    }
}

/// Wallet kept in memory. Counts saves so callers can check save points.
#[derive(Debug, Clone, Default)]
pub struct MemoryCurrencyStore {
    pub wallet: Wallet,
    pub save_count: u32,
}

impl MemoryCurrencyStore {
    pub fn with_wallet(wallet: Wallet) -> Self {
        Self {
            wallet,
            save_count: 0,
        }
    }
}

impl CurrencyStore for MemoryCurrencyStore {
    fn gold_balance(&self) -> i32 {
        self.wallet.gold
    }

    fn add_gold(&mut self, amount: i32) {
        self.wallet.gold += amount;
    }

    fn upgrade_bonus(&self, kind: UpgradeKind) -> f32 {
        self.wallet.bonus(kind)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.save_count += 1;
        Ok(())
    }
}

/// Wallet persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    wallet: Wallet,
}

impl JsonFileStore {
    /// Open the wallet at `path`. A missing file starts an empty wallet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let wallet = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Wallet::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self { path, wallet })
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }
}

impl CurrencyStore for JsonFileStore {
    fn gold_balance(&self) -> i32 {
        self.wallet.gold
    }

    fn add_gold(&mut self, amount: i32) {
        self.wallet.gold += amount;
    }

    fn upgrade_bonus(&self, kind: UpgradeKind) -> f32 {
        self.wallet.bonus(kind)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.wallet)?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[derive(Resource)]
pub struct Currency(pub Box<dyn CurrencyStore>);

impl Currency {
    /// Add gold and persist immediately. Save failures are logged, never
    /// propagated into the match.
    pub fn deposit(&mut self, amount: i32) {
        if amount == 0 {
            return;
        }
        self.0.add_gold(amount);
        if let Err(e) = self.0.save() {
            log::warn!("failed to save gold balance: {e}");
        }
    }
}

/// Permanent upgrade bonuses, read once when the match starts.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct UpgradeBonuses {
    pub damage: f32,
    pub move_speed: f32,
    pub gold_gain: f32,
    pub max_health: f32,
}

impl UpgradeBonuses {
    pub fn from_store(store: &dyn CurrencyStore) -> Self {
        Self {
            damage: store.upgrade_bonus(UpgradeKind::Damage),
            move_speed: store.upgrade_bonus(UpgradeKind::MoveSpeed),
            gold_gain: store.upgrade_bonus(UpgradeKind::GoldGain),
            max_health: store.upgrade_bonus(UpgradeKind::MaxHealth),
        }
    }
}

// ============================================================================
// EFFECTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    MuzzleFlash,
    SwordSlash,
    Explosion,
    UltimateCast,
    UltimateImpact,
    SpeedBoost,
    DashTrail,
    DeathBurst,
    MonsterSpawn,
    CrownSpawn,
    CrownPickup,
    ItemPickup,
    ZoneWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Attack,
    Skill,
    Explosion,
    Death,
    Crown,
    Pickup,
    ZoneWarning,
}

/// Fire-and-forget presentation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectDescriptor {
    Spawn { effect: EffectKind, at: Vec2, facing: Vec2 },
    Sound { cue: SoundCue, at: Vec2 },
}

pub trait EffectSink: Send + Sync {
    fn emit(&mut self, effect: &EffectDescriptor);
}

/// Discards every effect.
#[derive(Debug, Default)]
pub struct NullEffectSink;

impl EffectSink for NullEffectSink {
    fn emit(&mut self, _effect: &EffectDescriptor) {}
}

/// Outgoing effect stream. The descriptors of the current tick are kept in
/// `recent` for inspection.
#[derive(Resource)]
pub struct Effects {
    sink: Box<dyn EffectSink>,
    pub recent: Vec<EffectDescriptor>,
    pub total_emitted: u64,
}

impl Effects {
    pub fn new(sink: Box<dyn EffectSink>) -> Self {
        Self {
            sink,
            recent: Vec::new(),
            total_emitted: 0,
        }
    }

    pub fn spawn(&mut self, effect: EffectKind, at: Vec2, facing: Vec2) {
        self.emit(EffectDescriptor::Spawn { effect, at, facing });
    }

    pub fn sound(&mut self, cue: SoundCue, at: Vec2) {
        self.emit(EffectDescriptor::Sound { cue, at });
    }

    fn emit(&mut self, effect: EffectDescriptor) {
        self.sink.emit(&effect);
        self.recent.push(effect);
        self.total_emitted += 1;
    }

    pub fn begin_tick(&mut self) {
        self.recent.clear();
    }

    pub fn contains(&self, effect: EffectKind) -> bool {
        self.recent
            .iter()
            .any(|e| matches!(e, EffectDescriptor::Spawn { effect: k, .. } if *k == effect))
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new(Box::new(NullEffectSink))
    }
}

// ============================================================================
// CAMERA
// ============================================================================

/// Projects world points into the viewport of the camera following a player.
pub trait ScreenProjector: Send + Sync {
    /// Viewport coordinates (`0..=1` on both axes when visible) of `point`
    /// for a camera at `eye` looking along `forward`. `None` when the point
    /// is behind the camera.
    fn project(&self, eye: Vec2, forward: Vec2, point: Vec2) -> Option<Vec2>;
}

/// Over-the-shoulder camera with an orthographic footprint.
#[derive(Debug, Clone, Copy)]
pub struct ChaseCamera {
    pub view_depth: f32,
    pub half_width: f32,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        Self {
            view_depth: 40.0,
            half_width: 12.0,
        }
    }
}

impl ScreenProjector for ChaseCamera {
    fn project(&self, eye: Vec2, forward: Vec2, point: Vec2) -> Option<Vec2> {
        let f = forward.normalize_or_zero();
        if f == Vec2::ZERO {
            return None;
        }
        let right = Vec2::new(f.y, -f.x);
        let rel = point - eye;
        let depth = rel.dot(f);
        if depth <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            0.5 + rel.dot(right) / (2.0 * self.half_width),
            depth / self.view_depth,
        ))
    }
}

#[derive(Resource)]
pub struct Camera(pub Box<dyn ScreenProjector>);

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything external a match needs, injected at construction.
pub struct MatchServices {
    pub navigation: Box<dyn NavigationService>,
    pub currency: Box<dyn CurrencyStore>,
    pub effects: Box<dyn EffectSink>,
    pub camera: Box<dyn ScreenProjector>,
}

impl MatchServices {
    /// Headless defaults for an arena of the given radius.
    pub fn headless(arena_radius: f32) -> Self {
        Self {
            navigation: Box::new(OpenFieldNavigation::new(arena_radius)),
            currency: Box::new(MemoryCurrencyStore::default()),
            effects: Box::new(NullEffectSink),
            camera: Box::new(ChaseCamera::default()),
        }
    }

    pub fn with_currency(mut self, currency: Box<dyn CurrencyStore>) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_navigation(mut self, navigation: Box<dyn NavigationService>) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_effects(mut self, effects: Box<dyn EffectSink>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_camera(mut self, camera: Box<dyn ScreenProjector>) -> Self {
        self.camera = camera;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_field_navigation_moves_and_arrives() {
        let mut nav = OpenFieldNavigation::new(50.0);
        let agent = Entity::from_raw(1);
        assert!(nav.has_arrived(agent));

        nav.set_destination(agent, Vec2::new(3.0, 0.0));
        let p = nav.step_agent(agent, Vec2::ZERO, 2.0);
        assert_eq!(p, Vec2::new(2.0, 0.0));
        assert!(!nav.has_arrived(agent));
        let p = nav.step_agent(agent, p, 2.0);
        assert_eq!(p, Vec2::new(3.0, 0.0));
        assert!(nav.has_arrived(agent));
    }

    #[test]
    fn test_sample_valid_point_respects_bounds() {
        let nav = OpenFieldNavigation::new(10.0);
        assert_eq!(nav.sample_valid_point(Vec2::new(3.0, 4.0), 1.0), Some(Vec2::new(3.0, 4.0)));
        let clamped = nav.sample_valid_point(Vec2::new(12.0, 0.0), 5.0).unwrap();
        assert!((clamped.x - 10.0).abs() < 1e-5);
        assert!(nav.sample_valid_point(Vec2::new(30.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn test_memory_store_bonuses() {
        let mut wallet = Wallet::default();
        wallet.upgrades.set_level(UpgradeKind::Damage, 3);
        wallet.upgrades.set_level(UpgradeKind::GoldGain, 2);
        let store = MemoryCurrencyStore::with_wallet(wallet);
        let bonuses = UpgradeBonuses::from_store(&store);
        assert_eq!(bonuses.damage, 6.0);
        assert_eq!(bonuses.gold_gain, 2.0);
        assert_eq!(bonuses.max_health, 0.0);
    }

    #[test]
    fn test_deposit_saves_after_each_mutation() {
        let mut currency = Currency(Box::new(MemoryCurrencyStore::default()));
        currency.deposit(15);
        currency.deposit(5);
        currency.deposit(0);
        assert_eq!(currency.0.gold_balance(), 20);
    }

    #[test]
    fn test_json_store_round_trip() {
        let path = std::env::temp_dir().join(format!("crown_arena_wallet_{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.gold_balance(), 0);
        store.wallet_mut().upgrades.set_level(UpgradeKind::MaxHealth, 2);
        store.add_gold(42);
        store.save().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.gold_balance(), 42);
        assert_eq!(reopened.upgrade_bonus(UpgradeKind::MaxHealth), 20.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_chase_camera_projection() {
        let cam = ChaseCamera::default();
        let center = cam.project(Vec2::ZERO, Vec2::FORWARD, Vec2::new(0.0, 20.0)).unwrap();
        assert!((center.x - 0.5).abs() < 1e-5);
        assert!((center.y - 0.5).abs() < 1e-5);
        assert!(cam.project(Vec2::ZERO, Vec2::FORWARD, Vec2::new(0.0, -1.0)).is_none());
    }
}
