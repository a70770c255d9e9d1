//! # Strider Physics
//!
//! Character controller and collision response for the Strider engine.
//!
//! ## Features
//! - Collision shapes built from scene nodes, with auto-fit and sharing
//! - Rigid bodies and ghost objects synchronised with their nodes
//! - Kinematic character controller (fixup, step up, slide, step down)
//! - Convex sweeps, contact manifolds and ray tests on a rapier world
//! - Declarative construction from JSON properties blocks

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod action;
pub mod character;
pub mod controller;
mod convert;
pub mod error;
pub mod filter;
pub mod ghost;
pub mod heightfield;
pub mod object;
pub mod properties;
pub mod query;
pub mod rigid_body;
pub mod shape;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{ActionInterface, ActionList};
pub use character::{DEFAULT_MAX_SLOPE_ANGLE, DEFAULT_MAX_STEP_HEIGHT, PhysicsCharacter};
pub use controller::PhysicsController;
pub use error::{PhysicsError, PhysicsResult};
pub use filter::{CollisionFilter, CollisionGroup};
pub use ghost::PhysicsGhostObject;
pub use heightfield::{HeightfieldCache, HeightfieldData, HeightfieldSource};
pub use object::{CollisionObjectId, ObjectKind};
pub use properties::{CollisionObjectProperties, CollisionObjectType};
pub use query::{
    CollisionQueryable, ContactManifold, ContactPoint, OverlappingPair, SweepFilter, SweepHit, SweepProbe,
};
pub use rigid_body::{PhysicsRigidBody, RigidBodyParameters};
pub use shape::{CollisionShape, ShapeCache, ShapeDefinition, ShapeDimensions, ShapeKind};
pub use world::{PhysicsWorld, RayHit};

/// Physics configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Seconds per world step
    pub fixed_timestep: f32,
    /// World steps allowed per frame before time is dropped
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
        }
    }
}
