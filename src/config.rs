//! Match configuration.
//!
//! Every tunable of a match lives here: weapon table, skill timings, bot
//! profile, monster spawner, safe-zone phases and scoring. Configurations load
//! from RON or JSON and are validated before a match is built from them.
//!
//! Missing fields fall back to the shipped defaults, so a config file only has
//! to name what it changes.

use crate::components::{Archetype, BotBehavior};
use crate::error::ConfigError;
use crate::geometry::Vec2;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one match.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub arena: ArenaConfig,
    pub weapons: WeaponTable,
    pub skills: SkillConfig,
    pub bots: BotProfile,
    pub monsters: MonsterConfig,
    pub safe_zone: SafeZoneConfig,
    pub scoring: ScoringConfig,
    pub participants: ParticipantConfig,
    pub destructibles: DestructibleConfig,
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Match timing, arena bounds and simulation stepping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Total match length in seconds.
    pub match_duration: f32,
    /// Delay after match start before the crown appears.
    pub crown_spawn_delay: f32,
    pub crown_spawn_point: Vec2,
    pub crown_pickup_radius: f32,
    pub item_pickup_radius: f32,
    /// Radius of the playable disc around the origin.
    pub arena_radius: f32,
    /// Fixed simulation timestep in seconds.
    pub fixed_timestep: f32,
    /// Seed for reproducible matches. `None` seeds from entropy.
    pub random_seed: Option<u64>,
    /// Cell size of the perception grid.
    pub spatial_cell_size: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            match_duration: 300.0,
            crown_spawn_delay: 30.0,
            crown_spawn_point: Vec2::ZERO,
            crown_pickup_radius: 1.5,
            item_pickup_radius: 1.5,
            arena_radius: 60.0,
            fixed_timestep: 1.0 / 30.0,
            random_seed: None,
            spatial_cell_size: 10.0,
        }
    }
}

/// Stats for one weapon archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage_multiplier: f32,
    /// Melee reach for swords, auto-aim radius for ranged weapons.
    pub range: f32,
    /// Basic attack cooldown in seconds.
    pub attack_interval: f32,
    /// Projectiles per attack (0 for melee).
    pub pellet_count: u32,
    pub spread_angle_deg: f32,
    /// Area radius applied on impact; 0 disables the explosion.
    pub explosion_radius: f32,
}

/// Per-archetype weapon stats plus the shared projectile parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTable {
    /// Base weapon damage before the archetype multiplier.
    pub base_damage: f32,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
    /// Half-angle of the auto-aim cone.
    pub auto_aim_angle_deg: f32,
    pub shotgun: WeaponStats,
    pub bazooka: WeaponStats,
    pub sword: WeaponStats,
}

impl WeaponTable {
    pub fn stats(&self, archetype: Archetype) -> &WeaponStats {
        match archetype {
            Archetype::Shotgun => &self.shotgun,
            Archetype::Bazooka => &self.bazooka,
            Archetype::Sword => &self.sword,
        }
    }
}

impl Default for WeaponTable {
    fn default() -> Self {
        Self {
            base_damage: 10.0,
            projectile_speed: 20.0,
            projectile_lifetime: 5.0,
            auto_aim_angle_deg: 45.0,
            shotgun: WeaponStats {
                damage_multiplier: 1.5,
                range: 10.0,
                attack_interval: 0.5,
                pellet_count: 5,
                spread_angle_deg: 15.0,
                explosion_radius: 0.0,
            },
            bazooka: WeaponStats {
                damage_multiplier: 2.0,
                range: 30.0,
                attack_interval: 1.5,
                pellet_count: 1,
                spread_angle_deg: 0.0,
                explosion_radius: 5.0,
            },
            sword: WeaponStats {
                damage_multiplier: 1.0,
                range: 3.0,
                attack_interval: 0.2,
                pellet_count: 0,
                spread_angle_deg: 0.0,
                explosion_radius: 0.0,
            },
        }
    }
}

/// Skill and dash timings shared by every archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub skill1_cooldown: f32,
    pub skill1_duration: f32,
    pub skill1_speed_multiplier: f32,
    pub skill2_cooldown: f32,
    pub skill2_shot_count: u32,
    pub skill2_shot_interval: f32,
    pub ultimate_cooldown: f32,
    pub ultimate_duration: f32,
    /// Delay between casting the ultimate and its damage instant.
    pub ultimate_cast_delay: f32,
    pub ultimate_radius: f32,
    pub ultimate_damage: f32,
    pub dash_cooldown: f32,
    pub dash_distance: f32,
    pub dash_duration: f32,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            skill1_cooldown: 4.0,
            skill1_duration: 1.0,
            skill1_speed_multiplier: 1.5,
            skill2_cooldown: 2.0,
            skill2_shot_count: 5,
            skill2_shot_interval: 0.1,
            ultimate_cooldown: 6.0,
            ultimate_duration: 2.0,
            ultimate_cast_delay: 0.5,
            ultimate_radius: 10.0,
            ultimate_damage: 50.0,
            dash_cooldown: 0.0,
            dash_distance: 3.0,
            dash_duration: 0.2,
        }
    }
}

/// Tuning for AI-controlled participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotProfile {
    pub behavior: BotBehavior,
    pub detection_radius: f32,
    /// Seconds between perception refreshes.
    pub detection_interval: f32,
    pub attack_radius: f32,
    pub flee_health_threshold: f32,
    /// Seconds between top-level state re-evaluations.
    pub decision_interval: f32,
    pub player_priority: f32,
    pub monster_priority: f32,
    /// Also used as the probability of pursuing a visible item.
    pub item_priority: f32,
    pub aim_accuracy: f32,
    /// Delay after acquiring a target before the first shot.
    pub reaction_time: f32,
    pub dodge_chance: f32,
    pub skill_usage_chance: f32,
    pub flee_distance: f32,
    pub patrol_radius: f32,
    /// Radius in which a hostile projectile counts as incoming.
    pub threat_radius: f32,
}

impl BotProfile {
    /// Scale combat competence with a difficulty in `0.0..=1.0`.
    pub fn set_difficulty(&mut self, difficulty: f32) {
        let d = difficulty.clamp(0.0, 1.0);
        let lerp = |a: f32, b: f32| a + (b - a) * d;
        self.aim_accuracy = lerp(0.5, 0.95);
        self.reaction_time = lerp(0.5, 0.1);
        self.dodge_chance = lerp(0.1, 0.5);
        self.skill_usage_chance = lerp(0.2, 0.6);
    }
}

impl Default for BotProfile {
    fn default() -> Self {
        Self {
            behavior: BotBehavior::Balanced,
            detection_radius: 20.0,
            detection_interval: 0.2,
            attack_radius: 15.0,
            flee_health_threshold: 30.0,
            decision_interval: 0.5,
            player_priority: 0.7,
            monster_priority: 0.3,
            item_priority: 0.5,
            aim_accuracy: 0.8,
            reaction_time: 0.2,
            dodge_chance: 0.3,
            skill_usage_chance: 0.4,
            flee_distance: 20.0,
            patrol_radius: 20.0,
            threat_radius: 5.0,
        }
    }
}

/// Stats for one monster kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonsterProfile {
    pub health: f32,
    pub damage: f32,
    /// Distance from which the monster attacks.
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub move_speed: f32,
    /// Gold paid to the killer before upgrade bonuses.
    pub gold_bounty: i32,
    pub body_radius: f32,
}

/// Monster stats and spawner cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterConfig {
    pub melee: MonsterProfile,
    pub ranged: MonsterProfile,
    pub spawn_interval: f32,
    /// Monsters per wave, split across living participants.
    pub spawn_count: u32,
    pub min_spawn_radius: f32,
    pub max_spawn_radius: f32,
    pub ranged_spawn_chance: f32,
    /// Consecutive melee spawns required before a ranged roll is made.
    pub melee_spawns_before_ranged: u32,
    /// Seconds a dead monster lingers before it is removed.
    pub despawn_delay: f32,
    pub max_alive: usize,
}

impl Default for MonsterConfig {
    fn default() -> Self {
        Self {
            melee: MonsterProfile {
                health: 30.0,
                damage: 10.0,
                attack_range: 1.5,
                attack_cooldown: 1.0,
                move_speed: 3.5,
                gold_bounty: 5,
                body_radius: 0.5,
            },
            ranged: MonsterProfile {
                health: 20.0,
                damage: 10.0,
                attack_range: 8.0,
                attack_cooldown: 1.5,
                move_speed: 3.0,
                gold_bounty: 5,
                body_radius: 0.5,
            },
            spawn_interval: 3.0,
            spawn_count: 5,
            min_spawn_radius: 3.0,
            max_spawn_radius: 10.0,
            ranged_spawn_chance: 0.2,
            melee_spawns_before_ranged: 3,
            despawn_delay: 3.0,
            max_alive: 60,
        }
    }
}

/// Safe-zone phase plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeZoneConfig {
    pub initial_center: Vec2,
    pub initial_radius: f32,
    pub min_radius: f32,
    pub shrink_factor: f32,
    /// Wait before the first warning.
    pub initial_delay: f32,
    pub warning_duration: f32,
    pub shrink_duration: f32,
    pub pause_duration: f32,
    pub total_phases: u32,
    pub base_damage_per_second: f32,
    /// Added to the damage rate after every completed phase.
    pub damage_increment: f32,
    pub damage_tick_interval: f32,
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            initial_center: Vec2::ZERO,
            initial_radius: 50.0,
            min_radius: 5.0,
            shrink_factor: 0.6,
            initial_delay: 60.0,
            warning_duration: 10.0,
            shrink_duration: 30.0,
            pause_duration: 30.0,
            total_phases: 3,
            base_damage_per_second: 5.0,
            damage_increment: 2.0,
            damage_tick_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bounty added to a participant for every participant kill.
    pub bounty_per_kill: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { bounty_per_kill: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub max_health: f32,
    pub move_speed: f32,
    pub body_radius: f32,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            move_speed: 5.0,
            body_radius: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructibleConfig {
    pub health: f32,
    pub gold_reward: i32,
    /// Chance to leave a pickup behind when destroyed.
    pub drop_chance: f32,
    pub body_radius: f32,
    pub health_restore_amount: f32,
    pub dropped_gold: i32,
}

impl Default for DestructibleConfig {
    fn default() -> Self {
        Self {
            health: 50.0,
            gold_reward: 10,
            drop_chance: 0.3,
            body_radius: 1.0,
            health_restore_amount: 25.0,
            dropped_gold: 10,
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl MatchConfig {
    /// Load a configuration from a `.ron` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that durations, radii and probabilities are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("arena.match_duration", self.arena.match_duration)?;
        positive("arena.fixed_timestep", self.arena.fixed_timestep)?;
        positive("arena.arena_radius", self.arena.arena_radius)?;
        positive("arena.spatial_cell_size", self.arena.spatial_cell_size)?;
        non_negative("arena.crown_spawn_delay", self.arena.crown_spawn_delay)?;

        positive("weapons.projectile_speed", self.weapons.projectile_speed)?;
        positive("weapons.projectile_lifetime", self.weapons.projectile_lifetime)?;
        for (field, stats) in [
            ("weapons.shotgun.attack_interval", &self.weapons.shotgun),
            ("weapons.bazooka.attack_interval", &self.weapons.bazooka),
            ("weapons.sword.attack_interval", &self.weapons.sword),
        ] {
            non_negative(field, stats.attack_interval)?;
        }

        positive("skills.dash_duration", self.skills.dash_duration)?;
        positive("skills.skill2_shot_interval", self.skills.skill2_shot_interval)?;
        if self.skills.ultimate_cast_delay > self.skills.ultimate_duration {
            return Err(ConfigError::Invalid {
                field: "skills.ultimate_cast_delay",
                reason: "must not exceed skills.ultimate_duration".to_string(),
            });
        }

        positive("bots.decision_interval", self.bots.decision_interval)?;
        positive("bots.detection_interval", self.bots.detection_interval)?;
        positive("bots.detection_radius", self.bots.detection_radius)?;
        probability("bots.aim_accuracy", self.bots.aim_accuracy)?;
        probability("bots.dodge_chance", self.bots.dodge_chance)?;
        probability("bots.skill_usage_chance", self.bots.skill_usage_chance)?;
        probability("bots.item_priority", self.bots.item_priority)?;

        positive("monsters.spawn_interval", self.monsters.spawn_interval)?;
        probability("monsters.ranged_spawn_chance", self.monsters.ranged_spawn_chance)?;
        if self.monsters.min_spawn_radius > self.monsters.max_spawn_radius {
            return Err(ConfigError::Invalid {
                field: "monsters.min_spawn_radius",
                reason: "must not exceed monsters.max_spawn_radius".to_string(),
            });
        }

        let zone = &self.safe_zone;
        positive("safe_zone.initial_radius", zone.initial_radius)?;
        non_negative("safe_zone.min_radius", zone.min_radius)?;
        positive("safe_zone.shrink_duration", zone.shrink_duration)?;
        positive("safe_zone.damage_tick_interval", zone.damage_tick_interval)?;
        non_negative("safe_zone.damage_increment", zone.damage_increment)?;
        if !(0.0..=1.0).contains(&zone.shrink_factor) {
            return Err(ConfigError::Invalid {
                field: "safe_zone.shrink_factor",
                reason: format!("{} is outside 0..=1", zone.shrink_factor),
            });
        }

        non_negative("scoring.bounty_per_kill", self.scoring.bounty_per_kill as f32)?;
        positive("participants.max_health", self.participants.max_health)?;
        probability("destructibles.drop_chance", self.destructibles.drop_chance)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be positive"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must not be negative"),
        })
    }
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a probability"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = MatchConfig::from_ron_str(
            "(arena: (match_duration: 120.0, random_seed: Some(7)), scoring: (bounty_per_kill: 25))",
        )
        .unwrap();
        assert_eq!(config.arena.match_duration, 120.0);
        assert_eq!(config.arena.random_seed, Some(7));
        assert_eq!(config.scoring.bounty_per_kill, 25);
        assert_eq!(config.safe_zone.initial_radius, 50.0);
        assert_eq!(config.weapons.stats(Archetype::Shotgun).pellet_count, 5);
    }

    #[test]
    fn test_json_config() {
        let config =
            MatchConfig::from_json_str(r#"{"safe_zone": {"total_phases": 5}}"#).unwrap();
        assert_eq!(config.safe_zone.total_phases, 5);
        assert_eq!(config.arena.crown_spawn_delay, 30.0);
    }

    #[test]
    fn test_bot_profile_has_no_crown_weight() {
        let json = serde_json::to_value(BotProfile::default()).unwrap();
        assert!(json.get("crown_priority").is_none());

        // Older files that still carry the key load fine
        let config = MatchConfig::from_json_str(r#"{"bots": {"crown_priority": 0.9, "item_priority": 0.25}}"#)
            .unwrap();
        assert_eq!(config.bots.item_priority, 0.25);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = MatchConfig::from_ron_str("(arena: (match_duration: 0.0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "arena.match_duration", .. }));

        let err = MatchConfig::from_json_str(r#"{"bots": {"dodge_chance": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "bots.dodge_chance", .. }));
    }

    #[test]
    fn test_difficulty_scaling() {
        let mut bots = BotProfile::default();
        bots.set_difficulty(1.0);
        assert!((bots.aim_accuracy - 0.95).abs() < 1e-5);
        assert!((bots.reaction_time - 0.1).abs() < 1e-5);
        bots.set_difficulty(0.0);
        assert!((bots.dodge_chance - 0.1).abs() < 1e-5);
        assert!((bots.skill_usage_chance - 0.2).abs() < 1e-5);
    }
}
