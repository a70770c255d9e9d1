//! JSON scenario files
//!
//! A scenario lists scene nodes (optionally with render geometry and a
//! collision object), a duration, and timed character inputs:
//!
//! ```json
//! {
//!     "duration": 2.0,
//!     "nodes": [
//!         { "name": "ground", "position": [0, -0.5, 0],
//!           "collisionObject": { "type": "RIGID_BODY", "shape": { "type": "BOX", "extents": [40, 1, 40] } } },
//!         { "name": "player", "position": [0, 2, 0],
//!           "collisionObject": { "type": "CHARACTER", "shape": { "type": "CAPSULE", "radius": 0.4, "height": 1.8 } } }
//!     ],
//!     "inputs": [ { "time": 0.5, "node": "player", "velocity": [0, 0, -2], "jump": 1.0 } ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use strider_core::{MeshGeometry, NodeId, SceneGraph, Transform};
use strider_physics::{CollisionObjectId, CollisionObjectProperties, ObjectKind, PhysicsConfig, PhysicsController};

/// Render geometry given to a node so shapes can auto-fit to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryDescription {
    pub half_extents: Vec3,
    #[serde(default)]
    pub center: Vec3,
}

/// One scene node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees, applied Y then X then Z
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub geometry: Option<GeometryDescription>,
    #[serde(default)]
    pub collision_object: Option<CollisionObjectProperties>,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Character input applied once simulated time reaches `time`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    pub time: f32,
    pub node: String,
    #[serde(default)]
    pub velocity: Option<Vec3>,
    #[serde(default)]
    pub forward_velocity: Option<f32>,
    #[serde(default)]
    pub right_velocity: Option<f32>,
    /// Jump height
    #[serde(default)]
    pub jump: Option<f32>,
    #[serde(default)]
    pub physics_enabled: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Simulated seconds
    pub duration: f32,
    /// Frames per simulated second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub inputs: Vec<InputEvent>,
}

fn default_frame_rate() -> f32 {
    60.0
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Structural checks that need no physics world
    fn check(&self) -> Result<()> {
        if self.duration < 0.0 || !self.duration.is_finite() {
            bail!("duration must be non-negative");
        }
        if self.frame_rate <= 0.0 || !self.frame_rate.is_finite() {
            bail!("frameRate must be positive");
        }
        let mut names = AHashMap::new();
        for node in &self.nodes {
            if names.insert(node.name.as_str(), ()).is_some() {
                bail!("duplicate node name '{}'", node.name);
            }
        }
        for input in &self.inputs {
            if !names.contains_key(input.node.as_str()) {
                bail!("input at {}s targets unknown node '{}'", input.time, input.node);
            }
        }
        Ok(())
    }

    /// Build the scene and every collision object
    pub fn build(&self) -> Result<Simulation> {
        let mut scene = SceneGraph::new();
        let mut controller = PhysicsController::new(self.physics);
        let mut objects = AHashMap::new();

        for description in &self.nodes {
            let rotation = Quat::from_euler(
                glam::EulerRot::YXZ,
                description.rotation.y.to_radians(),
                description.rotation.x.to_radians(),
                description.rotation.z.to_radians(),
            );
            let node = scene.add_node_with_transform(
                description.name.clone(),
                Transform::new(description.position, rotation, description.scale),
            );
            if let Some(geometry) = &description.geometry {
                let mesh = MeshGeometry::cuboid(description.name.clone(), geometry.center, geometry.half_extents);
                scene.set_geometry(node, Arc::new(mesh));
            }
            if let Some(properties) = &description.collision_object {
                let id = controller
                    .create_from_properties(&scene, node, properties)
                    .with_context(|| format!("Failed to create collision object for '{}'", description.name))?;
                objects.insert(description.name.clone(), (node, id));
            }
        }

        for input in &self.inputs {
            match objects.get(&input.node) {
                Some((_, id)) if controller.world().kind(*id) == Some(ObjectKind::Character) => {}
                _ => bail!("input at {}s targets '{}', which is not a character", input.time, input.node),
            }
        }

        Ok(Simulation {
            scene,
            controller,
            objects,
        })
    }
}

/// A built scenario, ready to run
pub struct Simulation {
    pub scene: SceneGraph,
    pub controller: PhysicsController,
    objects: AHashMap<String, (NodeId, CollisionObjectId)>,
}

/// Final state of one collision object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReport {
    pub name: String,
    pub kind: String,
    pub position: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colliding: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overlapping: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub frames: u32,
    pub world_steps: u64,
    pub objects: Vec<ObjectReport>,
}

impl Simulation {
    pub fn object(&self, name: &str) -> Option<CollisionObjectId> {
        self.objects.get(name).map(|(_, id)| *id)
    }

    /// Run the whole scenario and report where everything ended up
    pub fn run(&mut self, scenario: &Scenario) -> SimulationReport {
        let frame_dt = 1.0 / scenario.frame_rate;
        let frames = (scenario.duration * scenario.frame_rate).round() as u32;

        let mut inputs: Vec<&InputEvent> = scenario.inputs.iter().collect();
        inputs.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut pending = inputs.into_iter().peekable();

        for frame in 0..frames {
            let now = frame as f32 * frame_dt;
            while let Some(input) = pending.next_if(|input| input.time <= now) {
                self.apply_input(input);
            }
            let steps = self.controller.step(&mut self.scene, frame_dt);
            log::trace!("Frame {} ran {} world steps", frame, steps);
        }

        SimulationReport {
            frames,
            world_steps: self.controller.step_count(),
            objects: self.report(scenario),
        }
    }

    fn apply_input(&mut self, input: &InputEvent) {
        let Some(id) = self.object(&input.node) else {
            return;
        };
        log::debug!("Applying input for '{}' at {}s", input.node, input.time);
        if let Some(enabled) = input.enabled {
            if let Err(err) = self.controller.set_character_enabled(id, enabled) {
                log::warn!("Cannot toggle '{}': {}", input.node, err);
            }
        }

        let gravity = self.controller.gravity();
        let Some(character) = self.controller.character_mut(id) else {
            return;
        };
        if let Some(velocity) = input.velocity {
            character.set_velocity(velocity);
        }
        if let Some(velocity) = input.forward_velocity {
            character.set_forward_velocity(velocity);
        }
        if let Some(velocity) = input.right_velocity {
            character.set_right_velocity(velocity);
        }
        if let Some(enabled) = input.physics_enabled {
            character.set_physics_enabled(enabled);
        }
        if let Some(height) = input.jump {
            character.jump(gravity, height, false);
        }
    }

    fn report(&self, scenario: &Scenario) -> Vec<ObjectReport> {
        let names: AHashMap<CollisionObjectId, &str> =
            self.objects.iter().map(|(name, (_, id))| (*id, name.as_str())).collect();

        scenario
            .nodes
            .iter()
            .filter_map(|description| {
                let (node, id) = *self.objects.get(&description.name)?;
                let position = self.scene.world_transform(node)?.position;
                let kind = self.controller.world().kind(id)?;

                let (velocity, colliding) = match kind {
                    ObjectKind::Character => {
                        let character = self.controller.character(id)?;
                        (Some(character.current_velocity()), Some(character.is_colliding()))
                    }
                    ObjectKind::RigidBody => {
                        let body = self.controller.rigid_body(id)?;
                        (Some(body.linear_velocity(self.controller.world())), None)
                    }
                    ObjectKind::GhostObject => (None, None),
                };
                let overlapping = match kind {
                    ObjectKind::RigidBody => Vec::new(),
                    _ => self
                        .controller
                        .overlapping_objects(id)
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|other| names.get(&other).map(|name| name.to_string()))
                        .collect(),
                };

                Some(ObjectReport {
                    name: description.name.clone(),
                    kind: format!("{:?}", kind),
                    position,
                    velocity,
                    colliding,
                    overlapping,
                })
            })
            .collect()
    }
}
