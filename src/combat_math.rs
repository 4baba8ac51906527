//! Pure combat formulas.
//!
//! Nothing here touches the ECS world: weapons, skills and projectiles call
//! these functions with plain values and act on the results.

use crate::components::Archetype;
use crate::config::WeaponTable;
use crate::geometry::Vec2;
use rand::Rng;

/// Angle (exclusive) either side of forward that a melee swing covers.
pub const MELEE_HALF_ARC_DEG: f32 = 90.0;

/// Damage of one hit for `archetype`: the archetype multiplier applied to the
/// base weapon damage plus the flat permanent bonus, truncated toward zero.
///
/// No minimum is enforced, so a zero result is a zero-damage hit.
pub fn base_damage(weapons: &WeaponTable, archetype: Archetype, upgrade_bonus: f32) -> i32 {
    let multiplier = weapons.stats(archetype).damage_multiplier;
    ((weapons.base_damage + upgrade_bonus) * multiplier) as i32
}

/// Random perturbation of one shotgun pellet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PelletOffset {
    /// Horizontal deviation in degrees.
    pub yaw_deg: f32,
    /// Vertical deviation in degrees. The planar simulation does not use it
    /// for travel but presentation layers may.
    pub pitch_deg: f32,
}

impl PelletOffset {
    /// Direction of the pellet when fired along `forward`.
    pub fn apply(&self, forward: Vec2) -> Vec2 {
        forward.normalize_or_zero().rotated_deg(self.yaw_deg)
    }
}

/// One independent offset per pellet, each axis uniform in
/// `[-spread_angle_deg, +spread_angle_deg]`.
pub fn shotgun_spread<R: Rng + ?Sized>(
    rng: &mut R,
    pellet_count: u32,
    spread_angle_deg: f32,
) -> Vec<PelletOffset> {
    let spread = spread_angle_deg.abs();
    (0..pellet_count)
        .map(|_| PelletOffset {
            yaw_deg: rng.gen_range(-spread..=spread),
            pitch_deg: rng.gen_range(-spread..=spread),
        })
        .collect()
}

/// True when `to_target` lies strictly inside the forward half-space.
pub fn in_melee_arc(forward: Vec2, to_target: Vec2) -> bool {
    forward.angle_between_deg(to_target) < MELEE_HALF_ARC_DEG
}

/// Melee hit test: within `range` of the attacker and inside the forward arc.
pub fn melee_hit(attacker: Vec2, forward: Vec2, target: Vec2, range: f32) -> bool {
    let to_target = target - attacker;
    to_target.length() <= range && in_melee_arc(forward, to_target)
}

/// A body considered by an area strike.
#[derive(Debug, Clone, Copy)]
pub struct AreaCandidate<T> {
    pub id: T,
    pub position: Vec2,
    pub alive: bool,
}

/// Flat damage to every living candidate within `radius` of `center`.
/// There is no falloff with distance.
pub fn area_damage<T: Copy>(
    center: Vec2,
    radius: f32,
    damage: f32,
    candidates: &[AreaCandidate<T>],
) -> Vec<(T, f32)> {
    candidates
        .iter()
        .filter(|c| c.alive && c.position.distance(center) <= radius)
        .map(|c| (c.id, damage))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_base_damage_per_archetype() {
        let weapons = WeaponTable::default();
        assert_eq!(base_damage(&weapons, Archetype::Sword, 0.0), 10);
        assert_eq!(base_damage(&weapons, Archetype::Shotgun, 0.0), 15);
        assert_eq!(base_damage(&weapons, Archetype::Bazooka, 4.0), 28);
        // Truncation, not rounding
        assert_eq!(base_damage(&weapons, Archetype::Shotgun, 1.0), 16);
    }

    #[test]
    fn test_zero_damage_is_not_clamped() {
        let mut weapons = WeaponTable::default();
        weapons.base_damage = 0.0;
        assert_eq!(base_damage(&weapons, Archetype::Sword, 0.0), 0);
    }

    #[test]
    fn test_shotgun_spread_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let pellets = shotgun_spread(&mut rng, 5, 15.0);
        assert_eq!(pellets.len(), 5);
        for p in &pellets {
            assert!(p.yaw_deg.abs() <= 15.0);
            assert!(p.pitch_deg.abs() <= 15.0);
            let dir = p.apply(Vec2::FORWARD);
            assert!(Vec2::FORWARD.angle_between_deg(dir) <= 15.0 + 1e-3);
        }
        assert!(shotgun_spread(&mut rng, 0, 15.0).is_empty());
    }

    #[test]
    fn test_melee_arc() {
        let forward = Vec2::new(0.0, 1.0);
        assert!(melee_hit(Vec2::ZERO, forward, Vec2::new(1.0, 2.0), 3.0));
        // Just behind the shoulder line
        assert!(!melee_hit(Vec2::ZERO, forward, Vec2::new(2.0, -0.1), 3.0));
        // Behind
        assert!(!melee_hit(Vec2::ZERO, forward, Vec2::new(0.0, -1.0), 3.0));
        // Out of reach
        assert!(!melee_hit(Vec2::ZERO, forward, Vec2::new(0.0, 3.5), 3.0));
    }

    #[test]
    fn test_area_damage_is_flat() {
        let candidates = [
            AreaCandidate { id: 1, position: Vec2::new(1.0, 0.0), alive: true },
            AreaCandidate { id: 2, position: Vec2::new(4.9, 0.0), alive: true },
            AreaCandidate { id: 3, position: Vec2::new(2.0, 0.0), alive: false },
            AreaCandidate { id: 4, position: Vec2::new(6.0, 0.0), alive: true },
        ];
        let hits = area_damage(Vec2::ZERO, 5.0, 50.0, &candidates);
        assert_eq!(hits, vec![(1, 50.0), (2, 50.0)]);
    }
}
