//! Physics controller: owns the world and every collision object

use ahash::AHashMap;
use glam::Vec3;
use strider_core::{FixedTimeStep, NodeId, SceneGraph, TimeManager};

use crate::PhysicsConfig;
use crate::action::{ActionInterface, ActionList};
use crate::character::PhysicsCharacter;
use crate::error::{PhysicsError, PhysicsResult};
use crate::filter::CollisionFilter;
use crate::ghost::PhysicsGhostObject;
use crate::object::{CollisionObjectId, ObjectKind};
use crate::properties::{CollisionObjectProperties, CollisionObjectType};
use crate::rigid_body::{PhysicsRigidBody, RigidBodyParameters};
use crate::shape::{ShapeCache, ShapeDefinition};
use crate::world::{PhysicsWorld, RayHit};

/// Front door of the physics subsystem.
///
/// Collision objects are created against a [`SceneGraph`] node and keep
/// that node in sync: dynamic bodies drive their node, while kinematic
/// bodies, ghost objects and characters follow (or move) theirs.
pub struct PhysicsController {
    config: PhysicsConfig,
    world: PhysicsWorld,
    shapes: ShapeCache,
    rigid_bodies: AHashMap<CollisionObjectId, PhysicsRigidBody>,
    ghosts: AHashMap<CollisionObjectId, PhysicsGhostObject>,
    characters: AHashMap<CollisionObjectId, PhysicsCharacter>,
    actions: ActionList,
    time: TimeManager,
}

impl PhysicsController {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            world: PhysicsWorld::new(config.gravity),
            config,
            shapes: ShapeCache::new(),
            rigid_bodies: AHashMap::new(),
            ghosts: AHashMap::new(),
            characters: AHashMap::new(),
            actions: ActionList::new(),
            time: TimeManager::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn shapes(&self) -> &ShapeCache {
        &self.shapes
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
        self.world.set_gravity(gravity);
    }

    /// Total number of world steps taken so far
    pub fn step_count(&self) -> u64 {
        self.time.fixed_update_count()
    }

    /// Create a rigid body for `node`
    pub fn create_rigid_body(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        shape: &ShapeDefinition,
        parameters: RigidBodyParameters,
        filter: CollisionFilter,
    ) -> PhysicsResult<CollisionObjectId> {
        let pose = scene.world_transform(node).ok_or(PhysicsError::UnknownNode(node))?;
        let is_dynamic = parameters.mass > 0.0 && !parameters.kinematic;
        let (shape, offset) = self.shapes.create_shape(scene, node, shape, is_dynamic)?;

        let id = self.world.insert_rigid_body(shape.clone(), offset, &pose, filter, &parameters);
        log::debug!(
            "Created {} rigid body {} for node {} (mass {})",
            shape.kind().name(),
            id,
            node,
            parameters.mass
        );
        self.rigid_bodies
            .insert(id, PhysicsRigidBody::new(id, node, shape, offset, parameters));
        Ok(id)
    }

    /// Create an overlap-only ghost object for `node`
    pub fn create_ghost_object(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        shape: &ShapeDefinition,
        filter: CollisionFilter,
    ) -> PhysicsResult<CollisionObjectId> {
        let ghost = self.insert_ghost(scene, node, shape, filter, ObjectKind::GhostObject)?;
        let id = ghost.id();
        log::debug!("Created ghost object {} for node {}", id, node);
        self.ghosts.insert(id, ghost);
        Ok(id)
    }

    /// Create a character that moves `node` and register its action
    pub fn create_character(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        shape: &ShapeDefinition,
        mass: f32,
        filter: CollisionFilter,
    ) -> PhysicsResult<CollisionObjectId> {
        let ghost = self.insert_ghost(scene, node, shape, filter, ObjectKind::Character)?;
        let id = ghost.id();
        self.characters.insert(id, PhysicsCharacter::new(ghost, mass));
        self.actions.register(id);
        log::debug!("Created character {} for node {} (mass {})", id, node, mass);
        Ok(id)
    }

    fn insert_ghost(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        shape: &ShapeDefinition,
        filter: CollisionFilter,
        kind: ObjectKind,
    ) -> PhysicsResult<PhysicsGhostObject> {
        let pose = scene.world_transform(node).ok_or(PhysicsError::UnknownNode(node))?;
        // Character probes are swept, so they need a convex shape.
        let convex_only = kind == ObjectKind::Character;
        let (shape, offset) = self.shapes.create_shape(scene, node, shape, convex_only)?;
        let id = self.world.insert_ghost(kind, shape.clone(), offset, &pose, filter);
        self.world.update_queries();
        Ok(PhysicsGhostObject::new(id, node, shape, offset, filter))
    }

    /// Build whatever a properties block describes
    pub fn create_from_properties(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        properties: &CollisionObjectProperties,
    ) -> PhysicsResult<CollisionObjectId> {
        let result = self.build_from_properties(scene, node, properties);
        if let Err(err) = &result {
            log::error!(
                "Failed to create {} for node {}: {}",
                properties.object_type.name(),
                node,
                err
            );
        }
        result
    }

    fn build_from_properties(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        properties: &CollisionObjectProperties,
    ) -> PhysicsResult<CollisionObjectId> {
        let shape = properties.expect_type(properties.object_type)?;
        let filter = properties.filter();
        match properties.object_type {
            CollisionObjectType::RigidBody => {
                self.create_rigid_body(scene, node, shape, properties.rigid_body_parameters(), filter)
            }
            CollisionObjectType::GhostObject => self.create_ghost_object(scene, node, shape, filter),
            CollisionObjectType::Character => {
                let id = self.create_character(scene, node, shape, properties.character_mass(), filter)?;
                if let Some(character) = self.characters.get_mut(&id) {
                    character.set_max_step_height(properties.max_step_height);
                    character.set_max_slope_angle(properties.max_slope_angle);
                }
                Ok(id)
            }
        }
    }

    /// Build a character from a properties block, rejecting other types
    pub fn create_character_from_properties(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        properties: &CollisionObjectProperties,
    ) -> PhysicsResult<CollisionObjectId> {
        if let Err(err) = properties.expect_type(CollisionObjectType::Character) {
            log::error!("Failed to create character for node {}: {}", node, err);
            return Err(err);
        }
        self.create_from_properties(scene, node, properties)
    }

    pub fn destroy_rigid_body(&mut self, id: CollisionObjectId) -> bool {
        if self.rigid_bodies.remove(&id).is_none() {
            return false;
        }
        self.world.remove(id);
        log::debug!("Destroyed rigid body {}", id);
        true
    }

    pub fn destroy_ghost_object(&mut self, id: CollisionObjectId) -> bool {
        if self.ghosts.remove(&id).is_none() {
            return false;
        }
        self.world.remove(id);
        log::debug!("Destroyed ghost object {}", id);
        true
    }

    /// Unregister the character's action, then release its probe and shape
    pub fn destroy_character(&mut self, id: CollisionObjectId) -> bool {
        if !self.characters.contains_key(&id) {
            return false;
        }
        self.actions.unregister(id);
        self.world.remove(id);
        self.characters.remove(&id);
        log::debug!("Destroyed character {}", id);
        true
    }

    /// Destroy any kind of collision object
    pub fn destroy(&mut self, id: CollisionObjectId) -> bool {
        match self.world.kind(id) {
            Some(ObjectKind::RigidBody) => self.destroy_rigid_body(id),
            Some(ObjectKind::GhostObject) => self.destroy_ghost_object(id),
            Some(ObjectKind::Character) => self.destroy_character(id),
            None => false,
        }
    }

    pub fn rigid_body(&self, id: CollisionObjectId) -> Option<&PhysicsRigidBody> {
        self.rigid_bodies.get(&id)
    }

    pub fn rigid_body_mut(&mut self, id: CollisionObjectId) -> Option<&mut PhysicsRigidBody> {
        self.rigid_bodies.get_mut(&id)
    }

    /// A rigid body together with the world it lives in
    pub fn rigid_body_and_world(&mut self, id: CollisionObjectId) -> Option<(&mut PhysicsRigidBody, &mut PhysicsWorld)> {
        let body = self.rigid_bodies.get_mut(&id)?;
        Some((body, &mut self.world))
    }

    pub fn ghost_object(&self, id: CollisionObjectId) -> Option<&PhysicsGhostObject> {
        self.ghosts.get(&id)
    }

    pub fn character(&self, id: CollisionObjectId) -> Option<&PhysicsCharacter> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CollisionObjectId) -> Option<&mut PhysicsCharacter> {
        self.characters.get_mut(&id)
    }

    /// Character ids in creation order
    pub fn character_ids(&self) -> Vec<CollisionObjectId> {
        self.actions.iter().collect()
    }

    /// Take a character out of (or back into) the world. Disabled
    /// characters are invisible to queries and skip their action.
    pub fn set_character_enabled(&mut self, id: CollisionObjectId, enabled: bool) -> PhysicsResult<()> {
        let character = self.characters.get_mut(&id).ok_or(PhysicsError::UnknownObject(id))?;
        character.set_enabled(enabled);
        self.world.set_enabled(id, enabled);
        Ok(())
    }

    /// Objects overlapping a ghost object or character probe
    pub fn overlapping_objects(&self, id: CollisionObjectId) -> PhysicsResult<Vec<CollisionObjectId>> {
        if let Some(ghost) = self.ghosts.get(&id) {
            return Ok(ghost.overlapping_objects(&self.world));
        }
        self.characters
            .get(&id)
            .map(|character| character.ghost().overlapping_objects(&self.world))
            .ok_or(PhysicsError::UnknownObject(id))
    }

    /// Closest object along a ray
    pub fn ray_test(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        self.world.ray_test(origin, direction, max_distance, None)
    }

    /// Advance by one frame of `frame_dt` seconds, running as many fixed
    /// world steps as have accumulated (at most `max_substeps`).
    ///
    /// Returns the number of world steps taken.
    pub fn step(&mut self, scene: &mut SceneGraph, frame_dt: f32) -> u32 {
        let timestep = FixedTimeStep::from_step(self.config.fixed_timestep as f64)
            .with_max_updates(self.config.max_substeps);
        self.time.update(frame_dt as f64);

        let steps = self.time.fixed_updates_needed(&timestep);
        for _ in 0..steps {
            self.step_world(scene, self.config.fixed_timestep);
            self.time.consume_fixed_update(timestep.step);
        }
        if steps == timestep.max_updates && self.time.should_run_fixed_update(timestep.step) {
            log::trace!("Physics fell behind, dropping backlog");
            self.time.discard_backlog(timestep.step);
        }
        steps
    }

    /// Run exactly one world step of `dt` seconds
    pub fn step_world(&mut self, scene: &mut SceneGraph, dt: f32) {
        for body in self.rigid_bodies.values() {
            body.pull_from_node(&mut self.world, scene);
        }
        for ghost in self.ghosts.values() {
            ghost.sync(&mut self.world, scene);
        }
        for character in self.characters.values() {
            character.ghost().sync(&mut self.world, scene);
        }
        self.world.update_queries();

        for id in self.actions.iter() {
            let Some(character) = self.characters.get_mut(&id) else {
                continue;
            };
            if !character.is_enabled() {
                continue;
            }
            let Some(mut node) = scene.node_mut(character.node()) else {
                continue;
            };
            character.update_action(&mut self.world, &mut node, dt);
            // Later actions must see this character where it ended up.
            character.ghost().sync(&mut self.world, scene);
        }

        self.world.step(dt);

        for body in self.rigid_bodies.values() {
            body.push_to_node(&self.world, scene);
        }
    }
}

impl Default for PhysicsController {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    use glam::Quat;
    use strider_core::math::is_near_zero;
    use strider_core::{MeshGeometry, Transform};

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Scene with a static ground slab whose top face is at y = 0
    fn grounded_scene() -> (PhysicsController, SceneGraph) {
        let mut controller = PhysicsController::default();
        let mut scene = SceneGraph::new();
        let ground = scene.add_node_with_transform("ground", Transform::from_position(Vec3::new(0.0, -0.5, 0.0)));
        controller
            .create_rigid_body(
                &scene,
                ground,
                &ShapeDefinition::cuboid(Vec3::new(100.0, 1.0, 100.0)),
                RigidBodyParameters::fixed(),
                CollisionFilter::default(),
            )
            .unwrap();
        (controller, scene)
    }

    fn spawn_character(controller: &mut PhysicsController, scene: &mut SceneGraph, position: Vec3) -> CollisionObjectId {
        let node = scene.add_node_with_transform("player", Transform::from_position(position));
        controller
            .create_character(scene, node, &ShapeDefinition::sphere(0.5), 1.0, CollisionFilter::default())
            .unwrap()
    }

    fn position_of(controller: &PhysicsController, scene: &SceneGraph, id: CollisionObjectId) -> Vec3 {
        let node = controller.character(id).unwrap().node();
        scene.world_transform(node).unwrap().position
    }

    #[test]
    fn test_character_walks_on_ground() {
        let (mut controller, mut scene) = grounded_scene();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 0.5, 0.0));
        controller.character_mut(id).unwrap().set_velocity(Vec3::new(0.0, 0.0, -1.0));

        assert_eq!(controller.step(&mut scene, DT), 1);
        let position = position_of(&controller, &scene, id);
        assert!((position - Vec3::new(0.0, 0.5, -DT)).length() < 1e-3);
        assert!(is_near_zero(controller.character(id).unwrap().vertical_velocity()));
    }

    #[test]
    fn test_character_falls_and_lands() {
        let (mut controller, mut scene) = grounded_scene();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 2.0, 0.0));

        for _ in 0..90 {
            controller.step(&mut scene, DT);
        }
        let position = position_of(&controller, &scene, id);
        assert!((position.y - 0.5).abs() < 1e-3);
        assert!(is_near_zero(controller.character(id).unwrap().vertical_velocity()));
    }

    #[test]
    fn test_character_slides_along_a_wall() {
        let (mut controller, mut scene) = grounded_scene();
        // Face at z = -1.
        let wall = scene.add_node_with_transform("wall", Transform::from_position(Vec3::new(0.0, 2.0, -1.5)));
        controller
            .create_rigid_body(
                &scene,
                wall,
                &ShapeDefinition::cuboid(Vec3::new(20.0, 4.0, 1.0)),
                RigidBodyParameters::fixed(),
                CollisionFilter::default(),
            )
            .unwrap();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 0.5, 0.0));
        controller.character_mut(id).unwrap().set_velocity(Vec3::new(1.0, 0.0, -3.0));

        for _ in 0..120 {
            controller.step(&mut scene, DT);
        }

        // One unit per second along the wall, before and after reaching it.
        let position = position_of(&controller, &scene, id);
        assert!(position.x > 1.8 && position.x < 2.05, "x = {}", position.x);
        assert!(position.z > -0.52 && position.z < -0.44, "z = {}", position.z);
        assert!((position.y - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_character_slides_down_a_steep_slope() {
        let mut controller = PhysicsController::default();
        let mut scene = SceneGraph::new();
        let tilt = Quat::from_rotation_z(60f32.to_radians());
        let slope = scene.add_node_with_transform("slope", Transform::from_position_rotation(Vec3::ZERO, tilt));
        controller
            .create_rigid_body(
                &scene,
                slope,
                &ShapeDefinition::cuboid(Vec3::new(40.0, 1.0, 10.0)),
                RigidBodyParameters::fixed(),
                CollisionFilter::default(),
            )
            .unwrap();

        // Top face is the plane normal · p = 0.5; start just clear of it.
        let normal = tilt * Vec3::Y;
        let start = normal * 1.05;
        let id = spawn_character(&mut controller, &mut scene, start);

        for _ in 0..60 {
            controller.step(&mut scene, DT);
        }

        let position = position_of(&controller, &scene, id);
        assert!(position.y < start.y - 0.5, "y = {}", position.y);
        assert!(position.x < start.x - 0.25, "x = {}", position.x);
        assert!(normal.dot(position) > 0.9);
        assert!(!is_near_zero(controller.character(id).unwrap().vertical_velocity()));
    }

    #[test]
    fn test_node_listener_fires_once_per_step() {
        let (mut controller, mut scene) = grounded_scene();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 0.5, 0.0));
        controller.character_mut(id).unwrap().set_velocity(Vec3::X);

        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let node = controller.character(id).unwrap().node();
        scene
            .add_transform_listener(node, Box::new(move |_, _| counter.set(counter.get() + 1)))
            .unwrap();

        for _ in 0..3 {
            controller.step(&mut scene, DT);
        }
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_fixed_step_accumulation() {
        let mut controller = PhysicsController::new(PhysicsConfig {
            max_substeps: 3,
            ..PhysicsConfig::default()
        });
        let mut scene = SceneGraph::new();

        assert_eq!(controller.step(&mut scene, DT * 0.5), 0);
        assert_eq!(controller.step(&mut scene, DT * 0.5), 1);
        // A long frame is capped and the backlog dropped.
        assert_eq!(controller.step(&mut scene, DT * 10.0), 3);
        assert_eq!(controller.step(&mut scene, 0.0), 0);
        assert_eq!(controller.step_count(), 4);
    }

    #[test]
    fn test_dynamic_body_drives_node_and_kinematic_follows() {
        let (mut controller, mut scene) = grounded_scene();
        let crate_node = scene.add_node_with_transform("crate", Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
        let crate_id = controller
            .create_rigid_body(
                &scene,
                crate_node,
                &ShapeDefinition::cuboid(Vec3::ONE),
                RigidBodyParameters::dynamic(5.0),
                CollisionFilter::default(),
            )
            .unwrap();
        let platform_node = scene.add_node_with_transform("platform", Transform::from_position(Vec3::new(10.0, 1.0, 0.0)));
        let platform_id = controller
            .create_rigid_body(
                &scene,
                platform_node,
                &ShapeDefinition::cuboid(Vec3::new(2.0, 0.2, 2.0)),
                RigidBodyParameters::kinematic(),
                CollisionFilter::default(),
            )
            .unwrap();

        scene.set_world_position(platform_node, Vec3::new(10.0, 2.0, 0.0));
        for _ in 0..10 {
            controller.step(&mut scene, DT);
        }

        assert!(scene.world_transform(crate_node).unwrap().position.y < 3.0);
        assert!(controller.rigid_body(crate_id).unwrap().is_dynamic());
        let (platform, _) = controller.world().body_pose(platform_id).unwrap();
        assert!((platform - Vec3::new(10.0, 2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_destroy_character_releases_everything() {
        let (mut controller, mut scene) = grounded_scene();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 0.5, 0.0));
        let shapes_before = controller.shapes().live_count();

        assert!(controller.destroy(id));
        assert!(controller.character(id).is_none());
        assert!(!controller.world().contains(id));
        assert!(controller.character_ids().is_empty());
        assert_eq!(controller.shapes().live_count(), shapes_before - 1);
        assert!(!controller.destroy_character(id));
    }

    #[test]
    fn test_create_from_properties() {
        let (mut controller, mut scene) = grounded_scene();
        let node = scene.add_node_with_transform("npc", Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        let properties = CollisionObjectProperties::from_json(
            r#"{
                "type": "CHARACTER",
                "shape": { "type": "CAPSULE", "radius": 0.3, "height": 1.8 },
                "mass": 70.0,
                "maxStepHeight": 0.35,
                "maxSlopeAngle": 30.0
            }"#,
        )
        .unwrap();

        let id = controller.create_character_from_properties(&scene, node, &properties).unwrap();
        let character = controller.character(id).unwrap();
        assert_eq!(character.mass(), 70.0);
        assert_eq!(character.max_step_height(), 0.35);
        assert_eq!(character.max_slope_angle(), 30.0);
        assert_eq!(character.ghost().filter().group, crate::filter::CollisionGroup::CHARACTER);
    }

    #[test]
    fn test_character_construction_errors() {
        let (mut controller, mut scene) = grounded_scene();
        let node = scene.add_node("bare");

        let ghost_block = CollisionObjectProperties::new(CollisionObjectType::GhostObject, ShapeDefinition::sphere(1.0));
        assert!(matches!(
            controller.create_character_from_properties(&scene, node, &ghost_block),
            Err(PhysicsError::InvalidProperties(_))
        ));

        // No render geometry to build a mesh from.
        let mesh_block = CollisionObjectProperties::new(CollisionObjectType::Character, ShapeDefinition::mesh());
        assert!(controller.create_from_properties(&scene, node, &mesh_block).is_err());

        // Concave shapes cannot be swept.
        scene.set_geometry(node, Arc::new(MeshGeometry::cuboid("box", Vec3::ZERO, Vec3::splat(0.5))));
        assert!(matches!(
            controller.create_from_properties(&scene, node, &mesh_block),
            Err(PhysicsError::UnsupportedDynamicShape(_))
        ));
        assert!(controller.character_ids().is_empty());
    }

    #[test]
    fn test_disabled_character_is_skipped_and_hidden() {
        let (mut controller, mut scene) = grounded_scene();
        let id = spawn_character(&mut controller, &mut scene, Vec3::new(0.0, 0.5, 0.0));
        let sensor_node = scene.add_node_with_transform("sensor", Transform::from_position(Vec3::new(0.0, 0.5, 0.0)));
        let sensor = controller
            .create_ghost_object(&scene, sensor_node, &ShapeDefinition::sphere(0.5), CollisionFilter::default())
            .unwrap();

        controller.step(&mut scene, DT);
        assert!(controller.overlapping_objects(sensor).unwrap().contains(&id));

        controller.set_character_enabled(id, false).unwrap();
        controller.character_mut(id).unwrap().set_velocity(Vec3::X);
        controller.step(&mut scene, DT);

        assert!(!controller.overlapping_objects(sensor).unwrap().contains(&id));
        assert!((position_of(&controller, &scene, id) - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-3);
        assert!(matches!(
            controller.set_character_enabled(CollisionObjectId(999), true),
            Err(PhysicsError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_ray_test_and_gravity() {
        let (mut controller, mut scene) = grounded_scene();
        controller.step(&mut scene, DT);

        let hit = controller.ray_test(Vec3::new(2.0, 5.0, 2.0), -Vec3::Y, 20.0).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-3);
        assert!(controller.ray_test(Vec3::new(2.0, 5.0, 2.0), Vec3::Y, 20.0).is_none());

        controller.set_gravity(Vec3::new(0.0, -1.62, 0.0));
        assert_eq!(controller.gravity(), Vec3::new(0.0, -1.62, 0.0));
        assert_eq!(crate::query::CollisionQueryable::gravity(controller.world()), Vec3::new(0.0, -1.62, 0.0));
    }
}
