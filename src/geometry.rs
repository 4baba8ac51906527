//! Planar vector math shared by every system.
//!
//! The arena is simulated on the horizontal plane: `x` runs east/west and `y`
//! runs north/south. Heights never matter for combat resolution.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D vector used for points and directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    /// Default facing for freshly spawned bodies.
    pub const FORWARD: Vec2 = Vec2 { x: 0.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `degrees` counter-clockwise from +x.
    pub fn from_angle_deg(degrees: f32) -> Self {
        let r = degrees.to_radians();
        Self::new(r.cos(), r.sin())
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit-length copy, or zero when the vector is degenerate.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len < 1.0e-4 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Rotate counter-clockwise by `degrees`.
    pub fn rotated_deg(self, degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Unsigned angle between two directions in degrees, 0..=180.
    /// Degenerate inputs yield 0.
    pub fn angle_between_deg(self, other: Vec2) -> f32 {
        let a = self.normalize_or_zero();
        let b = other.normalize_or_zero();
        if a == Self::ZERO || b == Self::ZERO {
            return 0.0;
        }
        a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
    }

    pub fn lerp(self, to: Vec2, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// First point where the segment `from -> to` touches a circle, as a fraction
/// of the segment length in `0.0..=1.0`.
///
/// Returns `Some(0.0)` when `from` already lies inside the circle.
pub fn segment_circle_entry(from: Vec2, to: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let d = to - from;
    let f = from - center;
    let c = f.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = d.length_squared();
    if a < 1.0e-8 {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}
