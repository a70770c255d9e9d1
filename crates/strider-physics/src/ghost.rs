//! Ghost objects: overlap-only volumes that follow a scene node

use std::sync::Arc;

use glam::{Quat, Vec3};
use strider_core::{NodeId, SceneGraph, Transform};

use crate::filter::CollisionFilter;
use crate::object::CollisionObjectId;
use crate::query::SweepProbe;
use crate::shape::CollisionShape;
use crate::world::PhysicsWorld;

/// A sensor volume bound to a node. It reports overlaps but never pushes
/// or gets pushed.
#[derive(Debug)]
pub struct PhysicsGhostObject {
    id: CollisionObjectId,
    node: NodeId,
    shape: Arc<CollisionShape>,
    center_offset: Vec3,
    filter: CollisionFilter,
}

impl PhysicsGhostObject {
    pub(crate) fn new(
        id: CollisionObjectId,
        node: NodeId,
        shape: Arc<CollisionShape>,
        center_offset: Vec3,
        filter: CollisionFilter,
    ) -> Self {
        Self {
            id,
            node,
            shape,
            center_offset,
            filter,
        }
    }

    /// Handle of the ghost in the collision world
    pub fn collision_handle(&self) -> CollisionObjectId {
        self.id
    }

    pub fn id(&self) -> CollisionObjectId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn shape(&self) -> &Arc<CollisionShape> {
        &self.shape
    }

    pub fn center_offset(&self) -> Vec3 {
        self.center_offset
    }

    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// World position of the shape center, read straight from the node
    pub fn world_position(&self, scene: &SceneGraph) -> Option<Vec3> {
        scene.world_transform(self.node).map(|pose| self.shape_position(&pose))
    }

    /// World rotation of the shape
    pub fn world_rotation(&self, scene: &SceneGraph) -> Option<Quat> {
        scene.world_transform(self.node).map(|pose| pose.rotation)
    }

    pub(crate) fn shape_position(&self, pose: &Transform) -> Vec3 {
        pose.position + pose.rotation * self.center_offset
    }

    /// Query view of this ghost's shape
    pub fn probe(&self, rotation: Quat) -> SweepProbe<'_> {
        SweepProbe {
            object: self.id,
            shape: &self.shape,
            rotation,
            filter: self.filter,
        }
    }

    /// Push the node pose into the collision world
    pub(crate) fn sync(&self, world: &mut PhysicsWorld, scene: &SceneGraph) {
        if let Some(pose) = scene.world_transform(self.node) {
            world.set_ghost_pose(self.id, &pose);
        }
    }

    /// Objects currently overlapping this ghost, as of the last sync
    pub fn overlapping_objects(&self, world: &PhysicsWorld) -> Vec<CollisionObjectId> {
        world.overlapping_objects(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use crate::rigid_body::RigidBodyParameters;

    #[test]
    fn test_world_position_includes_rotated_offset() {
        let mut scene = SceneGraph::new();
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let node = scene.add_node_with_transform(
            "trigger",
            Transform::from_position_rotation(Vec3::new(1.0, 0.0, 0.0), rotation),
        );
        let ghost = PhysicsGhostObject::new(
            CollisionObjectId(7),
            node,
            Arc::new(CollisionShape::sphere(1.0)),
            Vec3::new(1.0, 0.0, 0.0),
            CollisionFilter::default(),
        );
        let position = ghost.world_position(&scene).unwrap();
        assert!((position - Vec3::new(1.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_overlaps_follow_node() {
        let mut scene = SceneGraph::new();
        let mut world = PhysicsWorld::default();

        let box_node = scene.add_node_with_transform("box", Transform::from_position(Vec3::ZERO));
        let box_pose = scene.world_transform(box_node).unwrap();
        let target = world.insert_rigid_body(
            Arc::new(CollisionShape::cuboid(Vec3::splat(0.5))),
            Vec3::ZERO,
            &box_pose,
            CollisionFilter::default(),
            &RigidBodyParameters::fixed(),
        );

        let node = scene.add_node_with_transform("trigger", Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        let shape = Arc::new(CollisionShape::sphere(0.5));
        let pose = scene.world_transform(node).unwrap();
        let id = world.insert_ghost(ObjectKind::GhostObject, shape.clone(), Vec3::ZERO, &pose, CollisionFilter::default());
        let ghost = PhysicsGhostObject::new(id, node, shape, Vec3::ZERO, CollisionFilter::default());
        assert!(ghost.overlapping_objects(&world).is_empty());

        scene.set_world_position(node, Vec3::new(0.8, 0.0, 0.0));
        ghost.sync(&mut world, &scene);
        assert_eq!(ghost.overlapping_objects(&world), vec![target]);
    }
}
