//! Rapier-backed collision world
//!
//! Owns the rapier sets and pipelines and maps every collider back to the
//! [`CollisionObjectId`] stored in its user data. Ghost objects and
//! characters are parentless sensor colliders posed directly from their
//! nodes; rigid bodies are regular rapier bodies.

use std::sync::Arc;

use ahash::AHashMap;
use glam::{Quat, Vec3};
use rapier3d::parry::bounding_volume::{Aabb, BoundingVolume};
use rapier3d::parry::query::{self, ShapeCastOptions};
use rapier3d::prelude::*;
use smallvec::{SmallVec, smallvec};
use strider_core::Transform;

use crate::convert::{from_isometry, from_vector, to_isometry, to_point, to_rotation, to_vector};
use crate::filter::CollisionFilter;
use crate::object::{CollisionObjectId, ObjectKind};
use crate::query::{
    CollisionQueryable, ContactManifold, ContactPoint, OverlappingPair, SweepFilter, SweepHit, SweepProbe,
};
use crate::rigid_body::RigidBodyParameters;
use crate::shape::CollisionShape;

/// Separated pairs closer than this still produce contacts
const CONTACT_PREDICTION: Real = 0.02;

/// Closest hit of a ray test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: CollisionObjectId,
    pub kind: ObjectKind,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

struct WorldObject {
    kind: ObjectKind,
    collider: ColliderHandle,
    body: Option<RigidBodyHandle>,
    /// Collider offset from the owning node origin
    offset: Vec3,
    /// Overrides world gravity for this body
    gravity: Option<Vec3>,
    _shape: Arc<CollisionShape>,
}

/// Wrapper around the Rapier3D pipeline
pub struct PhysicsWorld {
    gravity: Vec3,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Colliders added or moved since the query pipeline was last rebuilt
    unindexed: Vec<ColliderHandle>,

    objects: AHashMap<CollisionObjectId, WorldObject>,
    next_id: u32,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            unindexed: Vec::new(),
            objects: AHashMap::new(),
            next_id: 1,
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn allocate_id(&mut self) -> CollisionObjectId {
        let id = CollisionObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a rigid body posed at `pose`. Mass 0 makes it static.
    pub fn insert_rigid_body(
        &mut self,
        shape: Arc<CollisionShape>,
        offset: Vec3,
        pose: &Transform,
        filter: CollisionFilter,
        parameters: &RigidBodyParameters,
    ) -> CollisionObjectId {
        let id = self.allocate_id();

        let body_type = if parameters.kinematic {
            RigidBodyType::KinematicPositionBased
        } else if parameters.mass > 0.0 {
            RigidBodyType::Dynamic
        } else {
            RigidBodyType::Fixed
        };
        let body = RigidBodyBuilder::new(body_type)
            .translation(to_vector(pose.position))
            .rotation(to_rotation(pose.rotation).scaled_axis())
            .linear_damping(parameters.linear_damping)
            .angular_damping(parameters.angular_damping)
            .gravity_scale(if parameters.gravity.is_some() { 0.0 } else { 1.0 })
            .user_data(id.to_user_data())
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        let mut collider = ColliderBuilder::new(shape.shared_shape().clone())
            .translation(to_vector(offset))
            .friction(parameters.friction)
            .restitution(parameters.restitution)
            .collision_groups(filter.to_interaction_groups())
            .user_data(id.to_user_data());
        if parameters.mass > 0.0 {
            collider = collider.mass(parameters.mass);
        }
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider.build(), body_handle, &mut self.rigid_body_set);
        self.mark_unindexed(collider_handle);

        self.objects.insert(
            id,
            WorldObject {
                kind: ObjectKind::RigidBody,
                collider: collider_handle,
                body: Some(body_handle),
                offset,
                gravity: parameters.gravity,
                _shape: shape,
            },
        );
        id
    }

    /// Add a non-responding sensor volume (ghost object or character probe)
    pub fn insert_ghost(
        &mut self,
        kind: ObjectKind,
        shape: Arc<CollisionShape>,
        offset: Vec3,
        pose: &Transform,
        filter: CollisionFilter,
    ) -> CollisionObjectId {
        let id = self.allocate_id();
        let collider = ColliderBuilder::new(shape.shared_shape().clone())
            .position(Self::collider_pose(pose, offset))
            .sensor(true)
            .collision_groups(filter.to_interaction_groups())
            .user_data(id.to_user_data())
            .build();
        let collider_handle = self.collider_set.insert(collider);
        self.mark_unindexed(collider_handle);

        self.objects.insert(
            id,
            WorldObject {
                kind,
                collider: collider_handle,
                body: None,
                offset,
                gravity: None,
                _shape: shape,
            },
        );
        id
    }

    /// Remove an object and its collider
    pub fn remove(&mut self, id: CollisionObjectId) -> bool {
        let Some(object) = self.objects.remove(&id) else {
            return false;
        };
        self.unindexed.retain(|handle| *handle != object.collider);
        match object.body {
            Some(body) => {
                self.rigid_body_set.remove(
                    body,
                    &mut self.island_manager,
                    &mut self.collider_set,
                    &mut self.impulse_joint_set,
                    &mut self.multibody_joint_set,
                    true,
                );
            }
            None => {
                self.collider_set
                    .remove(object.collider, &mut self.island_manager, &mut self.rigid_body_set, true);
            }
        }
        true
    }

    pub fn contains(&self, id: CollisionObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn kind(&self, id: CollisionObjectId) -> Option<ObjectKind> {
        self.objects.get(&id).map(|o| o.kind)
    }

    /// Number of registered objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Resolve a rapier collider to its object
    pub fn object_for_collider(&self, handle: ColliderHandle) -> Option<(CollisionObjectId, ObjectKind)> {
        let collider = self.collider_set.get(handle)?;
        let id = CollisionObjectId::from_user_data(collider.user_data);
        self.objects.get(&id).map(|o| (id, o.kind))
    }

    /// Collider handle of an object
    pub fn collider_handle(&self, id: CollisionObjectId) -> Option<ColliderHandle> {
        self.objects.get(&id).map(|o| o.collider)
    }

    fn mark_unindexed(&mut self, handle: ColliderHandle) {
        if !self.unindexed.contains(&handle) {
            self.unindexed.push(handle);
        }
    }

    fn collider_pose(pose: &Transform, offset: Vec3) -> Isometry<Real> {
        to_isometry(pose.position + pose.rotation * offset, pose.rotation)
    }

    /// Move a sensor collider to follow its node
    pub fn set_ghost_pose(&mut self, id: CollisionObjectId, pose: &Transform) {
        let Some(object) = self.objects.get(&id) else {
            return;
        };
        if object.body.is_some() {
            return;
        }
        let handle = object.collider;
        let iso = Self::collider_pose(pose, object.offset);
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_position(iso);
            self.mark_unindexed(handle);
        }
    }

    /// Read a non-dynamic body's pose from its node
    pub fn set_body_pose(&mut self, id: CollisionObjectId, pose: &Transform) {
        let Some(object) = self.objects.get(&id) else {
            return;
        };
        let (Some(handle), collider) = (object.body, object.collider) else {
            return;
        };
        let mut moved = false;
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            let iso = to_isometry(pose.position, pose.rotation);
            if body.is_kinematic() {
                body.set_next_kinematic_position(iso);
            } else if body.is_fixed() {
                body.set_position(iso, false);
                moved = true;
            }
        }
        if moved {
            self.mark_unindexed(collider);
        }
    }

    /// World pose of a body origin
    pub fn body_pose(&self, id: CollisionObjectId) -> Option<(Vec3, Quat)> {
        let handle = self.objects.get(&id)?.body?;
        self.rigid_body_set.get(handle).map(|body| from_isometry(body.position()))
    }

    pub(crate) fn body(&self, id: CollisionObjectId) -> Option<&RigidBody> {
        let handle = self.objects.get(&id)?.body?;
        self.rigid_body_set.get(handle)
    }

    pub(crate) fn body_mut(&mut self, id: CollisionObjectId) -> Option<&mut RigidBody> {
        let handle = self.objects.get(&id)?.body?;
        self.rigid_body_set.get_mut(handle)
    }

    /// Include or exclude an object from simulation and queries
    pub fn set_enabled(&mut self, id: CollisionObjectId, enabled: bool) {
        let Some(object) = self.objects.get(&id) else {
            return;
        };
        let handle = object.collider;
        if let Some(body) = object.body.and_then(|h| self.rigid_body_set.get_mut(h)) {
            body.set_enabled(enabled);
        }
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_enabled(enabled);
            self.mark_unindexed(handle);
        }
    }

    pub fn set_filter(&mut self, id: CollisionObjectId, filter: CollisionFilter) {
        let Some(object) = self.objects.get(&id) else {
            return;
        };
        if let Some(collider) = self.collider_set.get_mut(object.collider) {
            collider.set_collision_groups(filter.to_interaction_groups());
        }
    }

    /// Rebuild the ray-query acceleration structure after poses changed
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
        self.unindexed.clear();
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        for object in self.objects.values() {
            let (Some(handle), Some(gravity)) = (object.body, object.gravity) else {
                continue;
            };
            if let Some(body) = self.rigid_body_set.get_mut(handle) {
                if body.is_dynamic() {
                    let force = to_vector(gravity * body.mass());
                    body.add_force(force, true);
                }
            }
        }

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &to_vector(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // Forces only last for the step they were applied in.
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    /// Cast a ray, returning the closest object accepted by `filter`
    pub fn ray_test(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: Option<&SweepFilter<'_>>,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(to_point(origin), to_vector(direction));

        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            let id = CollisionObjectId::from_user_data(collider.user_data);
            match (self.objects.get(&id), filter) {
                (Some(object), Some(filter)) => filter.accepts(id, object.kind),
                (Some(_), None) => true,
                (None, _) => false,
            }
        };
        let query_filter = QueryFilter::default().predicate(&predicate);

        let (handle, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            query_filter,
        )?;
        let (object, kind) = self.object_for_collider(handle)?;
        Some(RayHit {
            object,
            kind,
            point: origin + direction * intersection.time_of_impact,
            normal: from_vector(&intersection.normal),
            distance: intersection.time_of_impact,
        })
    }

    /// Objects whose shapes currently overlap the given object's shape
    pub fn overlapping_objects(&self, id: CollisionObjectId) -> Vec<CollisionObjectId> {
        let Some(collider) = self.objects.get(&id).and_then(|o| self.collider_set.get(o.collider)) else {
            return Vec::new();
        };
        let groups = collider.collision_groups();
        let aabb = collider.compute_aabb();

        let mut result: Vec<CollisionObjectId> = self
            .colliders_near(&aabb)
            .into_iter()
            .filter_map(|handle| self.collider_set.get(handle))
            .filter(|other| other.is_enabled() && groups.test(other.collision_groups()))
            .filter_map(|other| {
                let other_id = CollisionObjectId::from_user_data(other.user_data);
                if other_id == id || !self.objects.contains_key(&other_id) {
                    return None;
                }
                if !aabb.intersects(&other.compute_aabb()) {
                    return None;
                }
                query::intersection_test(collider.position(), collider.shape(), other.position(), other.shape())
                    .ok()
                    .filter(|hit| *hit)
                    .map(|_| other_id)
            })
            .collect();
        result.sort();
        result
    }

    /// Colliders whose bounds may touch `region`: whatever the query
    /// pipeline indexes there, plus everything added or moved since its
    /// last rebuild.
    fn colliders_near(&self, region: &Aabb) -> SmallVec<[ColliderHandle; 16]> {
        let mut handles: SmallVec<[ColliderHandle; 16]> = SmallVec::new();
        self.query_pipeline.colliders_with_aabb_intersecting_aabb(region, |handle| {
            handles.push(*handle);
            true
        });
        for handle in &self.unindexed {
            if !handles.contains(handle) {
                handles.push(*handle);
            }
        }
        handles
    }

    /// Colliders near `region` that a query from `probe` may consider
    fn candidates<'a>(
        &'a self,
        probe: &'a SweepProbe<'_>,
        region: &Aabb,
    ) -> impl Iterator<Item = (CollisionObjectId, ObjectKind, &'a Collider)> + 'a {
        let groups = probe.filter.to_interaction_groups();
        let region = *region;
        self.colliders_near(&region).into_iter().filter_map(move |handle| {
            let collider = self.collider_set.get(handle)?;
            if !collider.is_enabled() || !groups.test(collider.collision_groups()) {
                return None;
            }
            let id = CollisionObjectId::from_user_data(collider.user_data);
            if id == probe.object {
                return None;
            }
            if !region.intersects(&collider.compute_aabb()) {
                return None;
            }
            let object = self.objects.get(&id)?;
            Some((id, object.kind, collider))
        })
    }

    fn is_dynamic_collider(&self, collider: &Collider) -> bool {
        collider
            .parent()
            .and_then(|h| self.rigid_body_set.get(h))
            .is_some_and(|body| body.is_dynamic())
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl CollisionQueryable for PhysicsWorld {
    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn convex_sweep_test(&self, probe: &SweepProbe<'_>, from: Vec3, to: Vec3, filter: &SweepFilter<'_>) -> Option<SweepHit> {
        let motion = to - from;
        if motion.length_squared() <= Real::EPSILON {
            return None;
        }

        let shape = probe.shape.shared_shape();
        let start = to_isometry(from, probe.rotation);
        let end = to_isometry(to, probe.rotation);
        let swept = shape.compute_swept_aabb(&start, &end);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: false,
            compute_impact_geometry_on_penetration: true,
        };

        let mut best: Option<SweepHit> = None;
        for (id, kind, collider) in self.candidates(probe, &swept) {
            if !filter.accepts(id, kind) {
                continue;
            }
            let hit = match query::cast_shapes(
                &start,
                &to_vector(motion),
                &**shape,
                collider.position(),
                &Vector::zeros(),
                collider.shape(),
                options,
            ) {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(err) => {
                    log::trace!("Sweep against {} unsupported: {:?}", id, err);
                    continue;
                }
            };

            if best.is_none_or(|b| hit.time_of_impact < b.fraction) {
                let normal = collider.position().rotation * hit.normal2.into_inner();
                best = Some(SweepHit {
                    fraction: hit.time_of_impact,
                    normal: from_vector(&normal),
                    object: id,
                    kind,
                    dynamic: self.is_dynamic_collider(collider),
                });
            }
        }
        best
    }

    fn dispatch_overlapping_pairs(&self, probe: &SweepProbe<'_>, position: Vec3) -> Vec<OverlappingPair> {
        let shape = probe.shape.shared_shape();
        let pose = to_isometry(position, probe.rotation);
        let aabb = shape.compute_aabb(&pose).loosened(CONTACT_PREDICTION);

        let mut pairs = Vec::new();
        for (id, kind, collider) in self.candidates(probe, &aabb) {
            let contact =
                match query::contact(&pose, &**shape, collider.position(), collider.shape(), CONTACT_PREDICTION) {
                    Ok(Some(contact)) => contact,
                    Ok(None) => continue,
                    Err(err) => {
                        log::trace!("Contact against {} unsupported: {:?}", id, err);
                        continue;
                    }
                };
            let manifold = ContactManifold {
                body0_is_probe: true,
                points: smallvec![ContactPoint {
                    distance: contact.dist,
                    normal_world_on_b: from_vector(&contact.normal2),
                }],
            };
            pairs.push(OverlappingPair {
                object: id,
                kind,
                manifolds: smallvec![manifold],
            });
        }
        pairs
    }

    fn apply_impulse(&mut self, object: CollisionObjectId, impulse: Vec3) {
        if let Some(body) = self.body_mut(object) {
            if body.is_dynamic() {
                body.apply_impulse(to_vector(impulse), true);
            }
        }
    }
}
