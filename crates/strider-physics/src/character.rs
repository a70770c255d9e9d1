//! Kinematic character controller
//!
//! A character is a ghost probe that moves its own node. Every world step
//! runs the same four-stage pipeline:
//!
//! 1. **Fixup**: push the probe out of anything it already penetrates,
//!    correcting a fifth of the depth per pass, for at most four passes.
//! 2. **Step up**: while not falling, lift the probe by the step height so
//!    small ledges do not block horizontal motion.
//! 3. **Forward/strafe**: sweep along the requested velocity and slide
//!    along whatever is hit, pushing dynamic bodies out of the way.
//! 4. **Step down**: integrate gravity, sweep back down and either land
//!    on a walkable surface or slide down a steep one.
//!
//! The node is translated once, by the net motion, at the end of the step.

use std::sync::Arc;

use glam::{Quat, Vec3};
use strider_core::math::is_near_zero;
use strider_core::{MATH_EPSILON, NodeId, Positionable, Transform};

use crate::action::ActionInterface;
use crate::ghost::PhysicsGhostObject;
use crate::object::CollisionObjectId;
use crate::query::{CollisionQueryable, SweepFilter, SweepProbe};
use crate::shape::CollisionShape;

/// Default maximum step height in world units
pub const DEFAULT_MAX_STEP_HEIGHT: f32 = 0.1;
/// Default steepest walkable slope in degrees
pub const DEFAULT_MAX_SLOPE_ANGLE: f32 = 45.0;

const MAX_FIXUP_PASSES: usize = 4;
const MAX_SWEEP_ITERATIONS: usize = 10;
const MIN_REMAINING_FRACTION: f32 = 0.01;
/// Share of a penetration resolved per fixup pass
const PENETRATION_RECOVERY: f32 = 0.2;
const UP: Vec3 = Vec3::Y;

/// Physics-driven character
#[derive(Debug)]
pub struct PhysicsCharacter {
    ghost: PhysicsGhostObject,
    mass: f32,
    enabled: bool,
    physics_enabled: bool,

    move_velocity: Vec3,
    forward_velocity: f32,
    right_velocity: f32,
    vertical_velocity: Vec3,
    current_velocity: Vec3,
    normalized_velocity: Vec3,

    current_position: Vec3,
    step_height: f32,
    step_offset: f32,
    slope_angle: f32,
    cos_slope_angle: f32,

    colliding: bool,
    collision_normal: Vec3,
}

impl PhysicsCharacter {
    pub(crate) fn new(ghost: PhysicsGhostObject, mass: f32) -> Self {
        let mut character = Self {
            ghost,
            mass,
            enabled: true,
            physics_enabled: true,
            move_velocity: Vec3::ZERO,
            forward_velocity: 0.0,
            right_velocity: 0.0,
            vertical_velocity: Vec3::ZERO,
            current_velocity: Vec3::ZERO,
            normalized_velocity: Vec3::ZERO,
            current_position: Vec3::ZERO,
            step_height: DEFAULT_MAX_STEP_HEIGHT,
            step_offset: 0.0,
            slope_angle: 0.0,
            cos_slope_angle: 0.0,
            colliding: false,
            collision_normal: Vec3::ZERO,
        };
        character.set_max_slope_angle(DEFAULT_MAX_SLOPE_ANGLE);
        character
    }

    /// The probe this character moves with
    pub fn ghost(&self) -> &PhysicsGhostObject {
        &self.ghost
    }

    pub fn id(&self) -> CollisionObjectId {
        self.ghost.id()
    }

    pub fn node(&self) -> NodeId {
        self.ghost.node()
    }

    /// Mass used when pushing dynamic bodies
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether movement is collision-checked. Disabled characters move
    /// kinematically and ignore gravity.
    pub fn is_physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    pub fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }

    /// World-space movement velocity, applied from the next step
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.move_velocity = velocity;
    }

    pub fn velocity(&self) -> Vec3 {
        self.move_velocity
    }

    /// Speed along the node's facing axis
    pub fn set_forward_velocity(&mut self, velocity: f32) {
        self.forward_velocity = velocity;
    }

    pub fn forward_velocity(&self) -> f32 {
        self.forward_velocity
    }

    /// Speed along the node's right axis
    pub fn set_right_velocity(&mut self, velocity: f32) {
        self.right_velocity = velocity;
    }

    pub fn right_velocity(&self) -> f32 {
        self.right_velocity
    }

    /// Combined horizontal and vertical velocity of the last step
    pub fn current_velocity(&self) -> Vec3 {
        self.current_velocity + self.vertical_velocity
    }

    pub fn vertical_velocity(&self) -> Vec3 {
        self.vertical_velocity
    }

    pub fn set_max_step_height(&mut self, height: f32) {
        self.step_height = height.max(0.0);
    }

    pub fn max_step_height(&self) -> f32 {
        self.step_height
    }

    /// Steepest walkable slope, in degrees
    pub fn set_max_slope_angle(&mut self, degrees: f32) {
        self.slope_angle = degrees;
        self.cos_slope_angle = degrees.to_radians().cos();
    }

    pub fn max_slope_angle(&self) -> f32 {
        self.slope_angle
    }

    /// Whether the last fixup found the probe penetrating something
    pub fn is_colliding(&self) -> bool {
        self.colliding
    }

    /// Normal of the deepest penetration, pointing into the obstacle
    pub fn collision_normal(&self) -> Vec3 {
        self.collision_normal
    }

    /// Jump high enough to reach `height` under `gravity`.
    ///
    /// Ignored while already moving vertically unless `force` is set.
    pub fn jump(&mut self, gravity: Vec3, height: f32, force: bool) {
        if !force && !is_near_zero(self.vertical_velocity) {
            return;
        }
        let j = -gravity * 2.0 * height;
        let launch = Vec3::new(signed_sqrt(j.x), signed_sqrt(j.y), signed_sqrt(j.z));
        self.vertical_velocity += launch;
    }

    /// Rotate the owning node in local space
    pub fn rotate(&self, node: &mut dyn Positionable, rotation: Quat) {
        node.rotate_local(rotation);
    }

    /// Replace the owning node's world rotation
    pub fn set_rotation(&self, node: &mut dyn Positionable, rotation: Quat) {
        node.set_world_rotation(rotation);
    }

    fn probe_for<'s>(&self, shape: &'s CollisionShape, pose: &Transform) -> SweepProbe<'s> {
        SweepProbe {
            object: self.ghost.id(),
            shape,
            rotation: pose.rotation,
            filter: self.ghost.filter(),
        }
    }

    /// One fixup pass. Returns whether any penetration was found.
    fn fix_collision(&mut self, world: &dyn CollisionQueryable, probe: &SweepProbe<'_>) -> bool {
        let mut correction = Vec3::ZERO;
        let mut deepest = 0.0;
        let mut penetrating = false;

        for pair in world.dispatch_overlapping_pairs(probe, self.current_position) {
            if pair.kind.is_ghost() {
                continue;
            }
            for manifold in &pair.manifolds {
                let sign = manifold.direction_sign();
                for point in manifold.points.iter().filter(|p| p.distance < 0.0) {
                    if point.distance < deepest {
                        deepest = point.distance;
                        self.collision_normal = point.normal_world_on_b * sign;
                    }
                    correction += point.normal_world_on_b * sign * point.distance * PENETRATION_RECOVERY;
                    penetrating = true;
                }
            }
        }

        self.current_position += correction;
        penetrating
    }

    fn step_up(&mut self, world: &dyn CollisionQueryable, probe: &SweepProbe<'_>) {
        self.step_offset = 0.0;
        if !is_near_zero(self.vertical_velocity) || self.step_height <= 0.0 {
            return;
        }

        // Stop short of anything overhead.
        let target = self.current_position + UP * self.step_height;
        let filter = SweepFilter::ignore_self_and_ghosts(probe.object);
        let fraction = world
            .convex_sweep_test(probe, self.current_position, target, &filter)
            .map_or(1.0, |hit| hit.fraction);

        self.step_offset = self.step_height * fraction;
        self.current_position += UP * self.step_offset;
    }

    fn compose_velocity(&mut self, pose: &Transform) {
        let mut velocity = Vec3::ZERO;
        let mut speed_squared: f32 = 0.0;

        if !is_near_zero(self.move_velocity) {
            velocity += self.move_velocity;
            speed_squared = self.move_velocity.length_squared();
        }
        if self.forward_velocity != 0.0 {
            // Models face their local +Z.
            velocity += -pose.forward().normalize_or_zero() * self.forward_velocity;
            speed_squared = speed_squared.max(self.forward_velocity * self.forward_velocity);
        }
        if self.right_velocity != 0.0 {
            velocity += pose.right().normalize_or_zero() * self.right_velocity;
            speed_squared = speed_squared.max(self.right_velocity * self.right_velocity);
        }

        self.normalized_velocity = velocity.normalize_or_zero();
        self.current_velocity = self.normalized_velocity * speed_squared.sqrt();
    }

    fn step_forward_and_strafe(
        &mut self,
        world: &mut dyn CollisionQueryable,
        probe: &SweepProbe<'_>,
        pose: &Transform,
        dt: f32,
    ) {
        self.compose_velocity(pose);
        let mut target = self.current_position + self.current_velocity * dt;

        if !self.physics_enabled {
            self.current_position = target;
            return;
        }

        if self.colliding && self.normalized_velocity.dot(self.collision_normal) > 0.0 {
            target = self.slide_target(target, self.collision_normal);
        }

        let filter = SweepFilter::ignore_self_and_ghosts(probe.object);
        let speed = self.current_velocity.length();
        let mut fraction = 1.0;

        for _ in 0..MAX_SWEEP_ITERATIONS {
            if fraction <= MIN_REMAINING_FRACTION {
                break;
            }
            let Some(hit) = world.convex_sweep_test(probe, self.current_position, target, &filter) else {
                break;
            };
            fraction -= hit.fraction;

            let normal = hit.normal.normalize_or_zero();
            if hit.dynamic && self.mass > 0.0 {
                world.apply_impulse(hit.object, -normal * self.mass * speed);
            }

            target = self.slide_target(target, normal);
            let direction = target - self.current_position;
            if direction.length_squared() <= f32::EPSILON || direction.normalize().dot(self.normalized_velocity) <= 0.0 {
                break;
            }
        }

        // The slid move stands on every exit, including running out of fraction.
        self.current_position = target;
    }

    fn step_down(&mut self, world: &mut dyn CollisionQueryable, probe: &SweepProbe<'_>, dt: f32) {
        self.vertical_velocity += world.gravity() * dt;
        let integrated = self.vertical_velocity;
        let start = self.current_position;
        let mut target = start + self.vertical_velocity * dt - UP * self.step_offset;

        let filter = SweepFilter::ignore_self_and_ghosts(probe.object);
        let mut fraction = 1.0;
        let mut landed = false;

        for _ in 0..MAX_SWEEP_ITERATIONS {
            if fraction <= MIN_REMAINING_FRACTION {
                break;
            }
            let Some(hit) = world.convex_sweep_test(probe, self.current_position, target, &filter) else {
                break;
            };
            fraction -= hit.fraction;

            let normal = hit.normal.normalize_or_zero();
            if normal.dot(UP) > self.cos_slope_angle - MATH_EPSILON {
                self.current_position = self.current_position.lerp(target, hit.fraction);
                self.vertical_velocity = Vec3::ZERO;
                landed = true;
                break;
            }

            if hit.dynamic {
                let push = normal.dot(self.vertical_velocity).abs().sqrt();
                world.apply_impulse(hit.object, -normal * push);
            }
            target = self.slide_target(target, normal);
        }

        if !landed {
            self.current_position = target;

            // Trust the distance actually covered, not the integrated speed.
            let baseline = start - UP * self.step_offset;
            let mut resynced = (self.current_position - baseline) / dt;
            if resynced.dot(UP) > 0.0 && integrated.dot(UP) <= 0.0 {
                resynced -= UP * resynced.dot(UP);
            }
            self.vertical_velocity = resynced;
        }
    }

    /// Redirect the remaining motion along the surface with normal `normal`
    fn slide_target(&self, target: Vec3, normal: Vec3) -> Vec3 {
        let movement = target - self.current_position;
        let length = movement.length();
        if length <= f32::EPSILON {
            return target;
        }
        let direction = movement / length;
        let reflected = (direction - 2.0 * direction.dot(normal) * normal).normalize_or_zero();
        let perpendicular = reflected - normal * reflected.dot(normal);
        self.current_position + perpendicular * length
    }
}

impl ActionInterface for PhysicsCharacter {
    fn update_action(&mut self, world: &mut dyn CollisionQueryable, node: &mut dyn Positionable, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let pose = node.world_transform();
        let start = self.ghost.shape_position(&pose);
        self.current_position = start;

        let shape = Arc::clone(self.ghost.shape());
        let probe = self.probe_for(&shape, &pose);

        if self.physics_enabled {
            self.colliding = false;
            for _ in 0..MAX_FIXUP_PASSES {
                if !self.fix_collision(world, &probe) {
                    break;
                }
                self.colliding = true;
            }
            self.step_up(world, &probe);
        } else {
            self.step_offset = 0.0;
        }

        self.step_forward_and_strafe(world, &probe, &pose, dt);

        if self.physics_enabled {
            self.step_down(world, &probe, dt);
        }

        let translation = self.current_position - start;
        log::trace!(
            "Character {} moved {:?} (colliding: {}, vertical velocity: {:?})",
            self.ghost.id(),
            translation,
            self.colliding,
            self.vertical_velocity
        );
        node.translate_world(translation);
    }
}

fn signed_sqrt(value: f32) -> f32 {
    value.signum() * value.abs().sqrt()
}
