// src/bake/bounds.rs
//! Shared normalization domain for every encoded frame.

use bevy::prelude::*;

/// Axis-aligned bounds over all vertices of all baked frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VatBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for VatBounds {
    fn default() -> Self { Self::EMPTY }
}

impl VatBounds {
    /// Inverted bounds; the first `include` snaps to the point.
    pub const EMPTY: Self = Self { min: Vec3::splat(f32::MAX), max: Vec3::splat(f32::MIN) };

    pub fn new(min: Vec3, max: Vec3) -> Self { Self { min, max } }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn include_all(&mut self, points: &[Vec3]) {
        for p in points {
            self.include(*p);
        }
    }

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vec3 { self.max - self.min }

    /// Per-axis inverse lerp into [0, 1]; a flat axis maps to 0.
    pub fn normalize(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            inverse_lerp(self.min.x, self.max.x, p.x),
            inverse_lerp(self.min.y, self.max.y, p.y),
            inverse_lerp(self.min.z, self.max.z, p.z),
        )
    }

    /// Inverse of `normalize` (what the shader does with a sampled texel).
    pub fn denormalize(&self, t: Vec3) -> Vec3 {
        self.min + (self.max - self.min) * t
    }
}

#[inline]
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if a != b { ((v - a) / (b - a)).clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_normalizes() {
        let mut b = VatBounds::EMPTY;
        assert!(b.is_empty());
        b.include_all(&[Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 4.0, 2.0)]);
        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 2.0));

        let t = b.normalize(Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(t, Vec3::new(0.5, 0.25, 0.0), "flat z axis encodes as 0");
        assert_eq!(b.denormalize(Vec3::new(0.5, 0.25, 0.0)), Vec3::new(0.0, 1.0, 2.0));
    }
}
