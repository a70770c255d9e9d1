//! # Strider Core
//!
//! Foundation shared by the Strider simulation crates:
//! - **Math**: bounds, planes and epsilon helpers
//! - **Geometry**: renderable mesh data attached to scene nodes
//! - **Scene Graph**: hierarchical transforms, listeners and the `Positionable` capability
//! - **Time**: fixed-step simulation support

pub mod geometry;
pub mod math;
pub mod scene;
pub mod time;

pub use geometry::MeshGeometry;
pub use math::{Aabb, BoundingSphere, Plane, MATH_EPSILON};
pub use scene::{ListenerId, Node, NodeId, NodeMut, Positionable, SceneGraph, Transform};
pub use time::{FixedTimeStep, TimeManager};
