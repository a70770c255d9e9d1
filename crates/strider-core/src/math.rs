//! Math utilities
//!
//! Bounds, planes and tolerance helpers on top of glam.

pub use glam::{Quat, Vec3};

/// Tolerance for treating a vector as zero or a comparison as a tie
pub const MATH_EPSILON: f32 = 0.000001;

/// Whether every component of `v` is within [`MATH_EPSILON`] of zero.
pub fn is_near_zero(v: Vec3) -> bool {
    v.length_squared() <= MATH_EPSILON * MATH_EPSILON
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted box that any point expands
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around `points`; empty for no points
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |mut bounds, &point| {
            bounds.expand_to_include(point);
            bounds
        })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Scale component-wise about the origin. Negative factors mirror the
    /// box without inverting it.
    pub fn scaled(&self, scale: Vec3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let a = self.min * scale;
        let b = self.max * scale;
        Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere through the corners of `aabb`
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.half_extents().length(),
        }
    }
}

/// Plane `normal · p + distance = 0` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Plane through `point`; `normal` need not be normalized
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance, positive on the side the normal points to
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
