//! Minimal 2D vector math for the physics passes.
//!
//! Positions, velocities, and forces are all [`Vec2`] values. Only the
//! operations the physics strategies actually need are provided: there
//! is no general-purpose linear algebra here.

use serde::{Deserialize, Serialize};

/// A 2D vector with `f32` components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a vector from its components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the vector.
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Component-wise sum.
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference (`self - other`).
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scale both components by a factor.
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// The vector pointing the opposite way.
    pub fn negate(self) -> Self {
        self.scale(-1.0)
    }

    /// Clamp both components into `[min, max]` per axis.
    ///
    /// Used to keep entity positions inside the canvas bounds.
    pub fn clamp_axes(self, min: Self, max: Self) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }

    /// Rescale the vector to the given length, preserving direction.
    ///
    /// Returns the vector unchanged when its length is zero (there is
    /// no direction to preserve).
    pub fn with_length(self, target: f32) -> Self {
        let len = self.length();
        if len > 0.0 {
            self.scale(target / len)
        } else {
            self
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn length_of_345_triangle() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
    }

    #[test]
    fn add_and_sub_are_inverses() {
        let a = Vec2::new(1.5, -2.0);
        let b = Vec2::new(0.5, 3.0);
        let sum = a.add(b);
        assert_eq!(sum.sub(b), a);
    }

    #[test]
    fn negate_flips_both_axes() {
        let v = Vec2::new(2.0, -3.0);
        assert_eq!(v.negate(), Vec2::new(-2.0, 3.0));
    }

    #[test]
    fn clamp_axes_constrains_to_bounds() {
        let v = Vec2::new(-5.0, 700.0);
        let clamped = v.clamp_axes(Vec2::ZERO, Vec2::new(640.0, 480.0));
        assert_eq!(clamped, Vec2::new(0.0, 480.0));
    }

    #[test]
    fn with_length_preserves_direction() {
        let v = Vec2::new(6.0, 8.0);
        let rescaled = v.with_length(5.0);
        assert_eq!(rescaled, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn with_length_on_zero_vector_is_identity() {
        assert_eq!(Vec2::ZERO.with_length(7.0), Vec2::ZERO);
    }
}
