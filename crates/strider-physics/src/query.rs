//! Narrow collision query interface
//!
//! The character controller only ever asks the world four things: gravity,
//! a convex sweep, the contact manifolds around its probe, and to push a
//! body. [`CollisionQueryable`] is exactly that surface, which keeps the
//! controller independent of the rigid-body backend.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::filter::CollisionFilter;
use crate::object::{CollisionObjectId, ObjectKind};
use crate::shape::CollisionShape;

/// The shape being swept or tested for contacts
#[derive(Debug, Clone, Copy)]
pub struct SweepProbe<'a> {
    /// Object doing the query, never reported as a hit or pair
    pub object: CollisionObjectId,
    pub shape: &'a CollisionShape,
    pub rotation: Quat,
    pub filter: CollisionFilter,
}

/// Closest hit of a convex sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the `from -> to` motion travelled before impact
    pub fraction: f32,
    /// World normal on the hit object, pointing back at the probe
    pub normal: Vec3,
    pub object: CollisionObjectId,
    pub kind: ObjectKind,
    /// The hit object is a simulated dynamic body
    pub dynamic: bool,
}

/// Decides which objects a sweep is allowed to hit
pub struct SweepFilter<'a> {
    predicate: Box<dyn Fn(CollisionObjectId, ObjectKind) -> bool + 'a>,
}

impl<'a> SweepFilter<'a> {
    pub fn new(predicate: impl Fn(CollisionObjectId, ObjectKind) -> bool + 'a) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// Reject the probe itself and every ghost-like object
    pub fn ignore_self_and_ghosts(probe: CollisionObjectId) -> Self {
        Self::new(move |object, kind| object != probe && !kind.is_ghost())
    }

    pub fn accepts(&self, object: CollisionObjectId, kind: ObjectKind) -> bool {
        (self.predicate)(object, kind)
    }
}

/// One contact of a manifold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Signed separation; negative when penetrating
    pub distance: f32,
    /// World normal on body 1, pointing towards body 0
    pub normal_world_on_b: Vec3,
}

/// Contacts between the probe and one other object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactManifold {
    /// Whether the probe is body 0 of this manifold
    pub body0_is_probe: bool,
    pub points: SmallVec<[ContactPoint; 4]>,
}

impl ContactManifold {
    /// Sign that turns `normal_world_on_b` into "away from the probe"
    pub fn direction_sign(&self) -> f32 {
        if self.body0_is_probe { -1.0 } else { 1.0 }
    }
}

/// A broad-phase pair involving the probe, with fresh manifolds
#[derive(Debug, Clone, PartialEq)]
pub struct OverlappingPair {
    pub object: CollisionObjectId,
    pub kind: ObjectKind,
    pub manifolds: SmallVec<[ContactManifold; 1]>,
}

/// What a kinematic controller needs from the collision world
pub trait CollisionQueryable {
    /// World gravity
    fn gravity(&self) -> Vec3;

    /// Sweep `probe` from `from` to `to`, returning the closest accepted hit.
    ///
    /// Objects the probe already overlaps are ignored unless the motion goes
    /// deeper into them.
    fn convex_sweep_test(&self, probe: &SweepProbe<'_>, from: Vec3, to: Vec3, filter: &SweepFilter<'_>)
    -> Option<SweepHit>;

    /// Generate contact manifolds for every object overlapping `probe` placed at `position`
    fn dispatch_overlapping_pairs(&self, probe: &SweepProbe<'_>, position: Vec3) -> Vec<OverlappingPair>;

    /// Apply an impulse at the center of mass of a dynamic body. Other objects ignore it.
    fn apply_impulse(&mut self, object: CollisionObjectId, impulse: Vec3);
}
