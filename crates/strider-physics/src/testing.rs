//! Analytic collision world for controller tests
//!
//! Obstacles are infinite half-spaces, so sweeps and contacts have exact
//! closed-form answers.

use std::cell::Cell;

use glam::Vec3;
use smallvec::smallvec;
use strider_core::Plane;

use crate::object::{CollisionObjectId, ObjectKind};
use crate::query::{
    CollisionQueryable, ContactManifold, ContactPoint, OverlappingPair, SweepFilter, SweepHit, SweepProbe,
};
use crate::shape::{CollisionShape, ShapeDimensions};

/// Contacts closer than this are reported even when separated
const CONTACT_MARGIN: f32 = 0.02;

pub(crate) struct HalfSpace {
    pub id: CollisionObjectId,
    pub plane: Plane,
    pub kind: ObjectKind,
    pub dynamic: bool,
}

pub(crate) struct PlaneWorld {
    pub gravity: Vec3,
    pub obstacles: Vec<HalfSpace>,
    pub impulses: Vec<(CollisionObjectId, Vec3)>,
    /// Report the probe as body 0 of every manifold
    pub probe_is_body0: bool,
    pub dispatch_calls: Cell<usize>,
    pub sweep_calls: Cell<usize>,
}

impl PlaneWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            obstacles: Vec::new(),
            impulses: Vec::new(),
            probe_is_body0: true,
            dispatch_calls: Cell::new(0),
            sweep_calls: Cell::new(0),
        }
    }

    /// Static half-space through `point`, solid on the side opposite `normal`
    pub fn add_plane(&mut self, point: Vec3, normal: Vec3) -> CollisionObjectId {
        self.add(point, normal, ObjectKind::RigidBody, false)
    }

    pub fn add(&mut self, point: Vec3, normal: Vec3, kind: ObjectKind, dynamic: bool) -> CollisionObjectId {
        let id = CollisionObjectId(1000 + self.obstacles.len() as u32);
        self.obstacles.push(HalfSpace {
            id,
            plane: Plane::from_point_normal(point, normal),
            kind,
            dynamic,
        });
        id
    }

    fn separation(shape: &CollisionShape, plane: &Plane, center: Vec3) -> f32 {
        plane.distance_to_point(center) - support_extent(shape, plane.normal)
    }
}

/// Distance from the shape center to its deepest point along `-normal`
fn support_extent(shape: &CollisionShape, normal: Vec3) -> f32 {
    match shape.dimensions() {
        ShapeDimensions::Sphere { radius } => radius,
        ShapeDimensions::Capsule { radius, half_height } => radius + half_height * normal.y.abs(),
        ShapeDimensions::Box { half_extents } => (half_extents * normal.abs()).element_sum(),
        ShapeDimensions::Mesh { .. } | ShapeDimensions::Heightfield { .. } => 0.0,
    }
}

impl CollisionQueryable for PlaneWorld {
    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn convex_sweep_test(&self, probe: &SweepProbe<'_>, from: Vec3, to: Vec3, filter: &SweepFilter<'_>) -> Option<SweepHit> {
        self.sweep_calls.set(self.sweep_calls.get() + 1);
        let mut best: Option<SweepHit> = None;
        for obstacle in &self.obstacles {
            if !filter.accepts(obstacle.id, obstacle.kind) {
                continue;
            }
            let s0 = Self::separation(probe.shape, &obstacle.plane, from);
            let s1 = Self::separation(probe.shape, &obstacle.plane, to);
            // Moving away or parallel, or stopping short of the surface.
            if s1 >= s0 || s1 > 0.0 {
                continue;
            }
            let fraction = if s0 <= 0.0 { 0.0 } else { s0 / (s0 - s1) };
            if best.is_none_or(|hit| fraction < hit.fraction) {
                best = Some(SweepHit {
                    fraction,
                    normal: obstacle.plane.normal,
                    object: obstacle.id,
                    kind: obstacle.kind,
                    dynamic: obstacle.dynamic,
                });
            }
        }
        best
    }

    fn dispatch_overlapping_pairs(&self, probe: &SweepProbe<'_>, position: Vec3) -> Vec<OverlappingPair> {
        self.dispatch_calls.set(self.dispatch_calls.get() + 1);
        self.obstacles
            .iter()
            .filter_map(|obstacle| {
                let distance = Self::separation(probe.shape, &obstacle.plane, position);
                if distance >= CONTACT_MARGIN {
                    return None;
                }
                let normal_world_on_b = if self.probe_is_body0 {
                    obstacle.plane.normal
                } else {
                    -obstacle.plane.normal
                };
                let manifold = ContactManifold {
                    body0_is_probe: self.probe_is_body0,
                    points: smallvec![ContactPoint { distance, normal_world_on_b }],
                };
                Some(OverlappingPair {
                    object: obstacle.id,
                    kind: obstacle.kind,
                    manifolds: smallvec![manifold],
                })
            })
            .collect()
    }

    fn apply_impulse(&mut self, object: CollisionObjectId, impulse: Vec3) {
        if self.obstacles.iter().any(|o| o.id == object && o.dynamic) {
            self.impulses.push((object, impulse));
        }
    }
}
