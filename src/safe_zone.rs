//! Shrinking safe-zone state machine.
//!
//! `WaitingInitial -> (Warning -> Shrinking -> Paused) x phases -> Final`,
//! with no pause after the last shrink. Each phase targets
//! `max(min_radius, radius * shrink_factor)` around a centre offset by at most
//! half the radius difference, so the new circle stays inside the old one.
//!
//! The zone also tracks which bodies are currently exposed (outside the
//! circle); the zone system schedules their damage ticks.

use crate::config::SafeZoneConfig;
use crate::geometry::Vec2;
use crate::rng::GameRng;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneStage {
    WaitingInitial { remaining: f32 },
    Warning { phase: u32, remaining: f32 },
    Shrinking { phase: u32, elapsed: f32 },
    Paused { phase: u32, remaining: f32 },
    Final,
}

/// Transitions reported by `SafeZone::advance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneSignal {
    WarningStarted {
        phase: u32,
        next_center: Vec2,
        next_radius: f32,
    },
    ShrinkStarted { phase: u32 },
    ShrinkCompleted {
        phase: u32,
        center: Vec2,
        radius: f32,
        damage_per_second: f32,
    },
    FinalPhaseReached,
}

#[derive(Resource, Debug, Clone)]
pub struct SafeZone {
    config: SafeZoneConfig,
    stage: ZoneStage,
    center: Vec2,
    radius: f32,
    shrink_from_center: Vec2,
    shrink_from_radius: f32,
    next_center: Vec2,
    next_radius: f32,
    damage_per_second: f32,
    completed_phases: u32,
    exposed: HashSet<Entity>,
}

impl SafeZone {
    pub fn new(config: SafeZoneConfig) -> Self {
        Self {
            stage: ZoneStage::WaitingInitial {
                remaining: config.initial_delay,
            },
            center: config.initial_center,
            radius: config.initial_radius,
            shrink_from_center: config.initial_center,
            shrink_from_radius: config.initial_radius,
            next_center: config.initial_center,
            next_radius: config.initial_radius,
            damage_per_second: config.base_damage_per_second,
            completed_phases: 0,
            exposed: HashSet::new(),
            config,
        }
    }

    pub fn stage(&self) -> ZoneStage {
        self.stage
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn next_center(&self) -> Vec2 {
        self.next_center
    }

    pub fn next_radius(&self) -> f32 {
        self.next_radius
    }

    pub fn damage_per_second(&self) -> f32 {
        self.damage_per_second
    }

    pub fn completed_phases(&self) -> u32 {
        self.completed_phases
    }

    /// Damage dealt by one periodic tick to an exposed body.
    pub fn tick_damage(&self) -> f32 {
        self.damage_per_second * self.config.damage_tick_interval
    }

    pub fn tick_interval(&self) -> f32 {
        self.config.damage_tick_interval
    }

    /// Horizontal containment test; the boundary counts as inside.
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.center) <= self.radius
    }

    // ------------------------------------------------------------------------
    // Exposure tracking
    // ------------------------------------------------------------------------

    /// Mark `entity` as outside the zone. Returns true if it was not already.
    pub fn enroll(&mut self, entity: Entity) -> bool {
        self.exposed.insert(entity)
    }

    /// Mark `entity` as no longer exposed. Returns true if it was.
    pub fn release(&mut self, entity: Entity) -> bool {
        self.exposed.remove(&entity)
    }

    pub fn is_exposed(&self, entity: Entity) -> bool {
        self.exposed.contains(&entity)
    }

    pub fn exposed_count(&self) -> usize {
        self.exposed.len()
    }

    // ------------------------------------------------------------------------
    // Phase timeline
    // ------------------------------------------------------------------------

    /// Advance the phase timeline by `dt` seconds. A long step may cross
    /// several stage boundaries; every transition is reported in order.
    pub fn advance(&mut self, dt: f32, rng: &mut GameRng) -> Vec<ZoneSignal> {
        let mut signals = Vec::new();
        let mut left = dt.max(0.0);

        loop {
            match self.stage {
                ZoneStage::WaitingInitial { remaining } => {
                    if left < remaining {
                        self.stage = ZoneStage::WaitingInitial {
                            remaining: remaining - left,
                        };
                        break;
                    }
                    left -= remaining;
                    self.begin_warning(0, rng, &mut signals);
                }
                ZoneStage::Warning { phase, remaining } => {
                    if left < remaining {
                        self.stage = ZoneStage::Warning {
                            phase,
                            remaining: remaining - left,
                        };
                        break;
                    }
                    left -= remaining;
                    self.shrink_from_center = self.center;
                    self.shrink_from_radius = self.radius;
                    self.stage = ZoneStage::Shrinking { phase, elapsed: 0.0 };
                    signals.push(ZoneSignal::ShrinkStarted { phase });
                }
                ZoneStage::Shrinking { phase, elapsed } => {
                    let duration = self.config.shrink_duration;
                    if elapsed + left < duration {
                        let elapsed = elapsed + left;
                        let t = elapsed / duration;
                        self.center = self.shrink_from_center.lerp(self.next_center, t);
                        self.radius = self.shrink_from_radius
                            + (self.next_radius - self.shrink_from_radius) * t;
                        self.stage = ZoneStage::Shrinking { phase, elapsed };
                        break;
                    }
                    left -= duration - elapsed;
                    self.finish_shrink(phase, &mut signals);
                }
                ZoneStage::Paused { phase, remaining } => {
                    if left < remaining {
                        self.stage = ZoneStage::Paused {
                            phase,
                            remaining: remaining - left,
                        };
                        break;
                    }
                    left -= remaining;
                    self.begin_warning(phase + 1, rng, &mut signals);
                }
                ZoneStage::Final => break,
            }
        }

        signals
    }

    fn begin_warning(&mut self, phase: u32, rng: &mut GameRng, signals: &mut Vec<ZoneSignal>) {
        if phase >= self.config.total_phases {
            self.stage = ZoneStage::Final;
            signals.push(ZoneSignal::FinalPhaseReached);
            return;
        }

        self.next_radius = next_radius(self.radius, self.config.shrink_factor, self.config.min_radius);
        let max_offset = (self.radius - self.next_radius) * 0.5;
        self.next_center = self.center + rng.point_in_disc(max_offset);
        self.stage = ZoneStage::Warning {
            phase,
            remaining: self.config.warning_duration,
        };
        signals.push(ZoneSignal::WarningStarted {
            phase,
            next_center: self.next_center,
            next_radius: self.next_radius,
        });
    }

    fn finish_shrink(&mut self, phase: u32, signals: &mut Vec<ZoneSignal>) {
        self.center = self.next_center;
        self.radius = self.next_radius;
        self.completed_phases += 1;
        self.damage_per_second = self.config.base_damage_per_second
            + self.config.damage_increment * self.completed_phases as f32;
        signals.push(ZoneSignal::ShrinkCompleted {
            phase,
            center: self.center,
            radius: self.radius,
            damage_per_second: self.damage_per_second,
        });

        if self.completed_phases >= self.config.total_phases {
            self.stage = ZoneStage::Final;
            signals.push(ZoneSignal::FinalPhaseReached);
        } else {
            self.stage = ZoneStage::Paused {
                phase,
                remaining: self.config.pause_duration,
            };
        }
    }
}

/// Radius targeted by the next phase.
pub fn next_radius(current: f32, shrink_factor: f32, min_radius: f32) -> f32 {
    (current * shrink_factor).max(min_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> SafeZoneConfig {
        SafeZoneConfig {
            initial_delay: 5.0,
            warning_duration: 2.0,
            shrink_duration: 4.0,
            pause_duration: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_radius_sequence_over_three_phases() {
        let mut zone = SafeZone::new(quick_config());
        let mut rng = GameRng::from_seed(1);
        let mut radii = vec![zone.radius()];
        for signal in zone.advance(1000.0, &mut rng) {
            if let ZoneSignal::ShrinkCompleted { radius, .. } = signal {
                radii.push(radius);
            }
        }
        let expected = [50.0, 30.0, 18.0, 10.8];
        assert_eq!(radii.len(), expected.len());
        for (got, want) in radii.iter().zip(expected) {
            assert!((got - want).abs() < 1e-3, "{got} vs {want}");
        }
        assert_eq!(zone.stage(), ZoneStage::Final);
    }

    #[test]
    fn test_minimum_radius_clamp() {
        assert_eq!(next_radius(6.0, 0.6, 5.0), 5.0);
        assert!((next_radius(10.0, 0.6, 5.0) - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_next_center_stays_within_half_difference() {
        for seed in 0..50 {
            let mut zone = SafeZone::new(quick_config());
            let mut rng = GameRng::from_seed(seed);
            let mut prev_center = zone.center();
            let mut prev_radius = zone.radius();
            for signal in zone.advance(1000.0, &mut rng) {
                match signal {
                    ZoneSignal::WarningStarted { next_center, next_radius, .. } => {
                        assert!(next_radius <= prev_radius);
                        let limit = (prev_radius - next_radius) * 0.5;
                        assert!(next_center.distance(prev_center) <= limit + 1e-4);
                    }
                    ZoneSignal::ShrinkCompleted { center, radius, .. } => {
                        prev_radius = radius;
                        prev_center = center;
                    }
                    _ => {}
                }
            }
            // Final centre matches the last shrink target
            assert!(zone.center().distance(zone.next_center()) < 1e-5);
        }
    }

    #[test]
    fn test_timeline_and_damage_growth() {
        let mut zone = SafeZone::new(quick_config());
        let mut rng = GameRng::from_seed(2);

        assert!(zone.advance(4.5, &mut rng).is_empty());
        let signals = zone.advance(0.5, &mut rng);
        assert!(matches!(signals[0], ZoneSignal::WarningStarted { phase: 0, .. }));

        let signals = zone.advance(2.0, &mut rng);
        assert_eq!(signals, vec![ZoneSignal::ShrinkStarted { phase: 0 }]);

        // Halfway through the shrink the radius is halfway between
        zone.advance(2.0, &mut rng);
        assert!((zone.radius() - 40.0).abs() < 1e-3);
        assert_eq!(zone.damage_per_second(), 5.0);

        zone.advance(2.0, &mut rng);
        assert!(matches!(zone.stage(), ZoneStage::Paused { phase: 0, .. }));
        assert_eq!(zone.damage_per_second(), 7.0);
        assert_eq!(zone.completed_phases(), 1);

        // Damage only grows from here on
        let mut last = zone.damage_per_second();
        for _ in 0..100 {
            zone.advance(1.0, &mut rng);
            assert!(zone.damage_per_second() >= last);
            last = zone.damage_per_second();
        }
        assert_eq!(last, 11.0);
    }

    #[test]
    fn test_containment_and_exposure() {
        let mut zone = SafeZone::new(SafeZoneConfig::default());
        assert!(zone.contains(Vec2::new(50.0, 0.0)));
        assert!(!zone.contains(Vec2::new(30.0, 40.1)));

        let e = Entity::from_raw(4);
        assert!(zone.enroll(e));
        assert!(!zone.enroll(e));
        assert!(zone.is_exposed(e));
        assert!(zone.release(e));
        assert!(!zone.is_exposed(e));
    }
}
