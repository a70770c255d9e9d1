//! Scene Graph
//!
//! Node hierarchy for the simulation slice:
//! - Transform parenting
//! - Eagerly propagated world transforms (reads are always authoritative)
//! - Transform-changed listeners
//! - The [`Positionable`] capability used by simulation systems

use std::sync::Arc;

use ahash::AHashMap;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;

use crate::geometry::MeshGeometry;

/// Position, rotation and scale of a node, local or world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Unrotated, unscaled transform at `position`
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Split an affine matrix back into its parts
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self::new(position, rotation, scale)
    }

    /// Scale, then rotate, then translate
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Facing direction. Nodes look down their local -Z.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Map a point from this transform's local space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * local)
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Something with a world-space pose that simulation code may move.
///
/// Reads must always reflect the latest writes; implementors do not cache.
pub trait Positionable {
    /// Current world transform
    fn world_transform(&self) -> Transform;

    /// Translate by a world-space delta
    fn translate_world(&mut self, delta: Vec3);

    /// Replace the world-space rotation
    fn set_world_rotation(&mut self, rotation: Quat);

    /// World position
    fn world_position(&self) -> Vec3 {
        self.world_transform().position
    }

    /// Rotate by `rotation` applied in local space
    fn rotate_local(&mut self, rotation: Quat) {
        let current = self.world_transform().rotation;
        self.set_world_rotation((current * rotation).normalize());
    }
}

impl Positionable for Transform {
    fn world_transform(&self) -> Transform {
        *self
    }

    fn translate_world(&mut self, delta: Vec3) {
        self.translate(delta);
    }

    fn set_world_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }
}

/// Stable node identifier with generation counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Get the node index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the node generation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// Identifier of a registered transform listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked with the node and its new world transform
pub type TransformListener = Box<dyn FnMut(NodeId, &Transform)>;

/// One node of the scene hierarchy
#[derive(Debug, Clone)]
pub struct Node {
    /// Node identifier
    pub id: NodeId,
    pub name: String,
    /// Local transform
    local_transform: Transform,
    /// Cached world transform
    world_transform: Transform,
    /// Cached world matrix
    world_matrix: Mat4,
    /// Parent node
    parent: Option<NodeId>,
    /// Child nodes
    children: SmallVec<[NodeId; 8]>,
    /// Renderable geometry, if any
    pub geometry: Option<Arc<MeshGeometry>>,
}

impl Node {
    fn new(id: NodeId, name: String) -> Self {
        Self {
            id,
            name,
            local_transform: Transform::IDENTITY,
            world_transform: Transform::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            children: SmallVec::new(),
            geometry: None,
        }
    }

    /// Get the local transform
    pub fn local_transform(&self) -> &Transform {
        &self.local_transform
    }

    /// World transform, always current
    pub fn world_transform(&self) -> &Transform {
        &self.world_transform
    }

    /// Get the world matrix
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Get the parent node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Get the child nodes
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|c| *c != child);
    }
}

/// Scene graph managing the hierarchy of nodes
#[derive(Default)]
pub struct SceneGraph {
    /// All nodes in the scene
    nodes: AHashMap<NodeId, Node>,
    /// Root nodes (no parent)
    roots: Vec<NodeId>,
    /// Generation per slot index
    generations: Vec<u32>,
    /// Free slot indices
    free: Vec<u32>,
    /// Transform-changed listeners per node
    listeners: AHashMap<NodeId, Vec<(ListenerId, TransformListener)>>,
    next_listener: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new root node to the scene
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => NodeId {
                index,
                generation: self.generations[index as usize],
            },
            None => {
                self.generations.push(0);
                NodeId {
                    index: (self.generations.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.nodes.insert(id, Node::new(id, name.into()));
        self.roots.push(id);
        id
    }

    /// Add a new root node with an initial local transform
    pub fn add_node_with_transform(&mut self, name: impl Into<String>, transform: Transform) -> NodeId {
        let id = self.add_node(name);
        self.set_local_transform(id, transform);
        id
    }

    /// Remove a node from the scene. Children become roots.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;

        if let Some(parent_id) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.remove_child(id);
            }
        }
        self.roots.retain(|&e| e != id);

        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
                self.roots.push(*child);
            }
        }
        for child in node.children.clone() {
            self.refresh_subtree(child);
        }

        self.listeners.remove(&id);
        self.generations[id.index as usize] = id.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Check whether a node id is still alive
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get a node
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a node's world transform
    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        self.nodes.get(&id).map(|node| node.world_transform)
    }

    /// Attach renderable geometry to a node
    pub fn set_geometry(&mut self, id: NodeId, geometry: Arc<MeshGeometry>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.geometry = Some(geometry);
                true
            }
            None => false,
        }
    }

    /// Borrow a node as a [`Positionable`]
    pub fn node_mut(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        if self.nodes.contains_key(&id) {
            Some(NodeMut { scene: self, id })
        } else {
            None
        }
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => node.local_transform = transform,
            None => return false,
        }
        self.refresh_subtree(id);
        true
    }

    /// Translate a node by a world-space delta
    pub fn translate_world(&mut self, id: NodeId, delta: Vec3) -> bool {
        let parent_inverse = self.parent_world_matrix(id).inverse();
        let local_delta = parent_inverse.transform_vector3(delta);
        match self.nodes.get_mut(&id) {
            Some(node) => node.local_transform.position += local_delta,
            None => return false,
        }
        self.refresh_subtree(id);
        true
    }

    /// Set a node's world-space position
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) -> bool {
        match self.world_transform(id) {
            Some(world) => self.translate_world(id, position - world.position),
            None => false,
        }
    }

    /// Set a node's world-space rotation
    pub fn set_world_rotation(&mut self, id: NodeId, rotation: Quat) -> bool {
        let parent_rotation = self.parent_world_matrix(id).to_scale_rotation_translation().1;
        match self.nodes.get_mut(&id) {
            Some(node) => node.local_transform.rotation = (parent_rotation.inverse() * rotation).normalize(),
            None => return false,
        }
        self.refresh_subtree(id);
        true
    }

    /// Set the parent of a node, keeping its local transform
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
        if !self.nodes.contains_key(&child) {
            return;
        }
        if let Some(parent_id) = parent {
            if parent_id == child || !self.nodes.contains_key(&parent_id) {
                return;
            }
        }

        let old_parent = self.nodes.get(&child).and_then(|n| n.parent);
        if let Some(old_parent) = old_parent {
            if let Some(old_parent_node) = self.nodes.get_mut(&old_parent) {
                old_parent_node.remove_child(child);
            }
        }

        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.add_child(child);
            }
            self.roots.retain(|&e| e != child);
        } else if !self.roots.contains(&child) {
            self.roots.push(child);
        }

        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = parent;
        }
        self.refresh_subtree(child);
    }

    /// Get root nodes
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Register a listener fired whenever the node's world transform changes
    pub fn add_transform_listener(&mut self, id: NodeId, listener: TransformListener) -> Option<ListenerId> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let listener_id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.entry(id).or_default().push((listener_id, listener));
        Some(listener_id)
    }

    /// Unregister a transform listener
    pub fn remove_transform_listener(&mut self, id: NodeId, listener: ListenerId) -> bool {
        match self.listeners.get_mut(&id) {
            Some(list) => {
                let before = list.len();
                list.retain(|(l, _)| *l != listener);
                list.len() != before
            }
            None => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn parent_world_matrix(&self, id: NodeId) -> Mat4 {
        self.nodes
            .get(&id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.nodes.get(&parent))
            .map(|parent| parent.world_matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    fn refresh_subtree(&mut self, id: NodeId) {
        let parent_world = self.parent_world_matrix(id);
        let mut changed = Vec::new();
        self.update_transform_recursive(id, parent_world, &mut changed);
        for (node_id, world) in changed {
            if let Some(list) = self.listeners.get_mut(&node_id) {
                for (_, listener) in list.iter_mut() {
                    listener(node_id, &world);
                }
            }
        }
    }

    fn update_transform_recursive(&mut self, id: NodeId, parent_world: Mat4, changed: &mut Vec<(NodeId, Transform)>) {
        let (world_matrix, children) = {
            let node = match self.nodes.get_mut(&id) {
                Some(n) => n,
                None => return,
            };

            let world_matrix = parent_world * node.local_transform.local_matrix();
            node.world_matrix = world_matrix;

            let world = Transform::from_matrix(world_matrix);
            if world != node.world_transform {
                node.world_transform = world;
                changed.push((id, world));
            }

            (world_matrix, node.children.clone())
        };

        for child in children {
            self.update_transform_recursive(child, world_matrix, changed);
        }
    }
}

/// Mutable view of one node implementing [`Positionable`]
pub struct NodeMut<'a> {
    scene: &'a mut SceneGraph,
    id: NodeId,
}

impl NodeMut<'_> {
    /// The node being viewed
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl Positionable for NodeMut<'_> {
    fn world_transform(&self) -> Transform {
        self.scene.world_transform(self.id).unwrap_or_default()
    }

    fn translate_world(&mut self, delta: Vec3) {
        if delta != Vec3::ZERO {
            self.scene.translate_world(self.id, delta);
        }
    }

    fn set_world_rotation(&mut self, rotation: Quat) {
        self.scene.set_world_rotation(self.id, rotation);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_transform_axes_follow_rotation() {
        let quarter = Transform::from_position_rotation(Vec3::ONE, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!((quarter.forward() - Vec3::NEG_X).length() < 0.001);
        assert!((quarter.right() - Vec3::NEG_Z).length() < 0.001);
        assert!((quarter.up() - Vec3::Y).length() < 0.001);

        let round_trip = Transform::from_matrix(quarter.local_matrix());
        assert!((round_trip.position - Vec3::ONE).length() < 0.001);
        assert!(round_trip.rotation.dot(quarter.rotation).abs() > 0.9999);
    }

    #[test]
    fn test_transform_point_applies_scale_then_rotation() {
        let t = Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let p = t.transform_point(Vec3::X);
        assert!((p - Vec3::new(1.0, 0.0, -2.0)).length() < 0.001);
    }

    #[test]
    fn test_scene_graph_add_and_remove() {
        let mut sg = SceneGraph::new();
        let id = sg.add_node("TestNode");
        assert_eq!(sg.node_count(), 1);
        assert_eq!(sg.get_node(id).unwrap().name, "TestNode");

        sg.remove_node(id);
        assert!(sg.is_empty());
        assert!(sg.get_node(id).is_none());

        // Slot reuse bumps the generation so the stale id stays dead.
        let reused = sg.add_node("Other");
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused, id);
        assert!(!sg.contains(id));
    }

    #[test]
    fn test_scene_graph_parenting() {
        let mut sg = SceneGraph::new();
        let parent = sg.add_node("Parent");
        let child = sg.add_node("Child");

        sg.set_parent(child, Some(parent));

        assert!(sg.get_node(parent).unwrap().children().contains(&child));
        assert_eq!(sg.get_node(child).unwrap().parent(), Some(parent));
        assert!(!sg.roots().contains(&child));
    }

    #[test]
    fn test_world_transforms_propagate_eagerly() {
        let mut sg = SceneGraph::new();
        let parent = sg.add_node_with_transform("Parent", Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let child = sg.add_node_with_transform("Child", Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));

        sg.set_parent(child, Some(parent));
        assert!((sg.world_transform(child).unwrap().position.x - 15.0).abs() < 0.001);

        sg.translate_world(parent, Vec3::new(0.0, 1.0, 0.0));
        let world = sg.world_transform(child).unwrap().position;
        assert!((world - Vec3::new(15.0, 1.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_translate_world_under_scaled_rotated_parent() {
        let mut sg = SceneGraph::new();
        let parent = sg.add_node_with_transform(
            "Parent",
            Transform::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), Vec3::splat(2.0)),
        );
        let child = sg.add_node("Child");
        sg.set_parent(child, Some(parent));

        let before = sg.world_transform(child).unwrap().position;
        sg.translate_world(child, Vec3::new(1.0, 0.0, 0.0));
        let after = sg.world_transform(child).unwrap().position;
        assert!((after - before - Vec3::X).length() < 0.001);
    }

    #[test]
    fn test_transform_listener_fires_once_per_change() {
        let mut sg = SceneGraph::new();
        let id = sg.add_node("Listened");
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        let listener = sg
            .add_transform_listener(id, Box::new(move |_, _| observed.set(observed.get() + 1)))
            .unwrap();

        sg.translate_world(id, Vec3::X);
        assert_eq!(count.get(), 1);

        // No-op writes do not notify.
        sg.translate_world(id, Vec3::ZERO);
        assert_eq!(count.get(), 1);

        assert!(sg.remove_transform_listener(id, listener));
        sg.translate_world(id, Vec3::X);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_node_mut_is_positionable() {
        let mut sg = SceneGraph::new();
        let id = sg.add_node_with_transform("Mover", Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        {
            let mut node = sg.node_mut(id).unwrap();
            node.translate_world(Vec3::new(2.0, 0.0, 0.0));
            node.rotate_local(Quat::from_rotation_y(std::f32::consts::PI));
            assert!((node.world_position() - Vec3::new(2.0, 1.0, 0.0)).length() < 0.001);
        }
        let forward = sg.world_transform(id).unwrap().forward();
        assert!((forward - Vec3::Z).length() < 0.001);
    }
}
