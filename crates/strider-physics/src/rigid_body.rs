//! Rigid bodies bound to scene nodes

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use strider_core::{NodeId, SceneGraph};

use crate::convert::{from_vector, to_vector};
use crate::object::CollisionObjectId;
use crate::shape::CollisionShape;
use crate::world::PhysicsWorld;

/// Rigid body construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RigidBodyParameters {
    /// Mass in kilograms; 0 makes the body static
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Driven by its node instead of the simulation
    pub kinematic: bool,
    /// Per-body gravity replacing the world's
    pub gravity: Option<Vec3>,
}

impl RigidBodyParameters {
    /// Immovable body
    pub fn fixed() -> Self {
        Self {
            mass: 0.0,
            ..Self::default()
        }
    }

    /// Simulated body of the given mass
    pub fn dynamic(mass: f32) -> Self {
        Self { mass, ..Self::default() }
    }

    /// Body moved by its node
    pub fn kinematic() -> Self {
        Self {
            kinematic: true,
            ..Self::fixed()
        }
    }
}

impl Default for RigidBodyParameters {
    fn default() -> Self {
        Self {
            mass: 0.0,
            friction: 0.5,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.05,
            kinematic: false,
            gravity: None,
        }
    }
}

/// A rigid body whose pose is synchronised with a scene node.
///
/// Dynamic bodies write their pose into the node after every step; static
/// and kinematic bodies follow the node.
#[derive(Debug)]
pub struct PhysicsRigidBody {
    id: CollisionObjectId,
    node: NodeId,
    shape: Arc<CollisionShape>,
    center_offset: Vec3,
    parameters: RigidBodyParameters,
}

impl PhysicsRigidBody {
    pub(crate) fn new(
        id: CollisionObjectId,
        node: NodeId,
        shape: Arc<CollisionShape>,
        center_offset: Vec3,
        parameters: RigidBodyParameters,
    ) -> Self {
        Self {
            id,
            node,
            shape,
            center_offset,
            parameters,
        }
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

    /// Offset of the collider from the node origin
    pub fn center_offset(&self) -> Vec3 {
        self.center_offset
    }

    pub fn parameters(&self) -> &RigidBodyParameters {
        &self.parameters
    }

    pub fn mass(&self) -> f32 {
        self.parameters.mass
    }

    pub fn is_kinematic(&self) -> bool {
        self.parameters.kinematic
    }

    pub fn is_static(&self) -> bool {
        !self.parameters.kinematic && self.parameters.mass <= 0.0
    }

    pub fn is_dynamic(&self) -> bool {
        !self.parameters.kinematic && self.parameters.mass > 0.0
    }

    /// Switch between node-driven and simulated motion
    pub fn set_kinematic(&mut self, world: &mut PhysicsWorld, kinematic: bool) {
        if self.parameters.kinematic == kinematic {
            return;
        }
        self.parameters.kinematic = kinematic;
        let body_type = if kinematic {
            rapier3d::prelude::RigidBodyType::KinematicPositionBased
        } else if self.parameters.mass > 0.0 {
            rapier3d::prelude::RigidBodyType::Dynamic
        } else {
            rapier3d::prelude::RigidBodyType::Fixed
        };
        if let Some(body) = world.body_mut(self.id) {
            body.set_body_type(body_type, true);
        }
    }

    pub fn apply_impulse(&self, world: &mut PhysicsWorld, impulse: Vec3) {
        if let Some(body) = self.dynamic_body(world) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    /// Force applied over the next world step only
    pub fn apply_force(&self, world: &mut PhysicsWorld, force: Vec3) {
        if let Some(body) = self.dynamic_body(world) {
            body.add_force(to_vector(force), true);
        }
    }

    pub fn apply_torque_impulse(&self, world: &mut PhysicsWorld, torque: Vec3) {
        if let Some(body) = self.dynamic_body(world) {
            body.apply_torque_impulse(to_vector(torque), true);
        }
    }

    pub fn set_linear_velocity(&self, world: &mut PhysicsWorld, velocity: Vec3) {
        if let Some(body) = self.dynamic_body(world) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn linear_velocity(&self, world: &PhysicsWorld) -> Vec3 {
        world.body(self.id).map(|body| from_vector(body.linvel())).unwrap_or(Vec3::ZERO)
    }

    pub fn angular_velocity(&self, world: &PhysicsWorld) -> Vec3 {
        world.body(self.id).map(|body| from_vector(body.angvel())).unwrap_or(Vec3::ZERO)
    }

    fn dynamic_body<'w>(&self, world: &'w mut PhysicsWorld) -> Option<&'w mut rapier3d::prelude::RigidBody> {
        world.body_mut(self.id).filter(|body| body.is_dynamic())
    }

    /// Move a static or kinematic body to where its node is
    pub(crate) fn pull_from_node(&self, world: &mut PhysicsWorld, scene: &SceneGraph) {
        if self.is_dynamic() {
            return;
        }
        if let Some(pose) = scene.world_transform(self.node) {
            world.set_body_pose(self.id, &pose);
        }
    }

    /// Write a dynamic body's simulated pose into its node
    pub(crate) fn push_to_node(&self, world: &PhysicsWorld, scene: &mut SceneGraph) {
        if !self.is_dynamic() {
            return;
        }
        if let Some((position, rotation)) = world.body_pose(self.id) {
            scene.set_world_position(self.node, position);
            scene.set_world_rotation(self.node, rotation);
        }
    }
}
