//! Collision shapes
//!
//! Shapes are built from a [`ShapeDefinition`] against a scene node. Missing
//! dimensions are fitted to the node's render geometry and everything is
//! baked at the node's world scale. Identical shapes are shared through a
//! weak cache, so a shape lives exactly as long as its last owner.

use std::sync::{Arc, Weak};

use ahash::AHashMap;
use glam::Vec3;
use rapier3d::na::DMatrix;
use rapier3d::prelude::SharedShape;
use serde::{Deserialize, Serialize};
use strider_core::{MeshGeometry, NodeId, SceneGraph};

use crate::convert::{to_point, to_vector};
use crate::error::{PhysicsError, PhysicsResult};
use crate::heightfield::{HeightfieldCache, HeightfieldData, HeightfieldSource};

/// Supported shape kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    Box,
    Sphere,
    Capsule,
    Mesh,
    Heightfield,
}

impl ShapeKind {
    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Capsule => "capsule",
            Self::Mesh => "mesh",
            Self::Heightfield => "heightfield",
        }
    }
}

/// Declarative shape description. Unset dimensions auto-fit to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDefinition {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Offset of the shape from the node origin
    #[serde(default)]
    pub center: Option<Vec3>,
    /// Take `center` as-is instead of scaling it with the node
    #[serde(default)]
    pub center_absolute: bool,
    /// Full box extents
    #[serde(default)]
    pub extents: Option<Vec3>,
    #[serde(default)]
    pub radius: Option<f32>,
    /// Total capsule height, end caps included
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub heightfield: Option<HeightfieldSource>,
}

impl ShapeDefinition {
    /// Shape of the given kind sized entirely from the node geometry
    pub fn auto(kind: ShapeKind) -> Self {
        Self {
            kind,
            center: None,
            center_absolute: false,
            extents: None,
            radius: None,
            height: None,
            heightfield: None,
        }
    }

    pub fn cuboid(extents: Vec3) -> Self {
        Self {
            extents: Some(extents),
            ..Self::auto(ShapeKind::Box)
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self {
            radius: Some(radius),
            ..Self::auto(ShapeKind::Sphere)
        }
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            radius: Some(radius),
            height: Some(height),
            ..Self::auto(ShapeKind::Capsule)
        }
    }

    /// Triangle mesh taken from the node geometry
    pub fn mesh() -> Self {
        Self::auto(ShapeKind::Mesh)
    }

    pub fn heightfield(source: HeightfieldSource) -> Self {
        Self {
            heightfield: Some(source),
            ..Self::auto(ShapeKind::Heightfield)
        }
    }

    /// Offset the shape from the node origin
    pub fn with_center(mut self, center: Vec3, absolute: bool) -> Self {
        self.center = Some(center);
        self.center_absolute = absolute;
        self
    }
}

/// Resolved world-scale dimensions of a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDimensions {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along +Y; `half_height` excludes the end caps
    Capsule { radius: f32, half_height: f32 },
    Mesh { scale: Vec3 },
    Heightfield { scale: Vec3 },
}

/// A built collision shape, shared between the objects using it
pub struct CollisionShape {
    kind: ShapeKind,
    dimensions: ShapeDimensions,
    shape: SharedShape,
    // Kept alive so cache keys derived from their addresses stay unique.
    _geometry: Option<Arc<MeshGeometry>>,
    heightfield: Option<Arc<HeightfieldData>>,
}

impl CollisionShape {
    /// Box from half extents
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::primitive(ShapeDimensions::Box { half_extents })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::primitive(ShapeDimensions::Sphere { radius })
    }

    /// Capsule along +Y with the given total height
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::primitive(ShapeDimensions::Capsule {
            radius,
            half_height: capsule_half_height(radius, height),
        })
    }

    fn primitive(dimensions: ShapeDimensions) -> Self {
        let (kind, shape) = match dimensions {
            ShapeDimensions::Box { half_extents: h } => (ShapeKind::Box, SharedShape::cuboid(h.x, h.y, h.z)),
            ShapeDimensions::Sphere { radius } => (ShapeKind::Sphere, SharedShape::ball(radius)),
            ShapeDimensions::Capsule { radius, half_height } => {
                (ShapeKind::Capsule, SharedShape::capsule_y(half_height, radius))
            }
            ShapeDimensions::Mesh { .. } | ShapeDimensions::Heightfield { .. } => {
                unreachable!("mesh and heightfield shapes are built from source data")
            }
        };
        Self {
            kind,
            dimensions,
            shape,
            _geometry: None,
            heightfield: None,
        }
    }

    fn mesh(geometry: Arc<MeshGeometry>, scale: Vec3) -> PhysicsResult<Self> {
        let vertices = geometry.positions().iter().map(|p| to_point(*p * scale)).collect();
        let indices = geometry.indices().to_vec();
        let shape = SharedShape::trimesh(vertices, indices)
            .map_err(|e| PhysicsError::InvalidShape(format!("mesh '{}': {e:?}", geometry.name)))?;
        Ok(Self {
            kind: ShapeKind::Mesh,
            dimensions: ShapeDimensions::Mesh { scale },
            shape,
            _geometry: Some(geometry),
            heightfield: None,
        })
    }

    fn heightfield(data: Arc<HeightfieldData>, scale: Vec3) -> Self {
        let heights = DMatrix::from_row_slice(data.rows(), data.cols(), data.heights());
        // One world unit between samples before node scaling.
        let field_scale = Vec3::new(
            scale.x * (data.cols() - 1) as f32,
            scale.y,
            scale.z * (data.rows() - 1) as f32,
        );
        Self {
            kind: ShapeKind::Heightfield,
            dimensions: ShapeDimensions::Heightfield { scale: field_scale },
            shape: SharedShape::heightfield(heights, to_vector(field_scale)),
            _geometry: None,
            heightfield: Some(data),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn dimensions(&self) -> ShapeDimensions {
        self.dimensions
    }

    /// Height samples backing a heightfield shape
    pub fn heightfield_data(&self) -> Option<&Arc<HeightfieldData>> {
        self.heightfield.as_ref()
    }

    /// Mesh and heightfield shapes cannot be simulated dynamically
    pub fn is_concave(&self) -> bool {
        matches!(self.kind, ShapeKind::Mesh | ShapeKind::Heightfield)
    }

    pub(crate) fn shared_shape(&self) -> &SharedShape {
        &self.shape
    }
}

impl std::fmt::Debug for CollisionShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionShape")
            .field("kind", &self.kind)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

fn capsule_half_height(radius: f32, height: f32) -> f32 {
    (height * 0.5 - radius).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
    Box([u32; 3]),
    Sphere(u32),
    Capsule(u32, u32),
    Mesh(usize, [u32; 3]),
    Heightfield(usize, [u32; 3]),
}

fn vec_bits(v: Vec3) -> [u32; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

/// Builds collision shapes and shares identical ones
#[derive(Default)]
pub struct ShapeCache {
    shapes: AHashMap<ShapeKey, Weak<CollisionShape>>,
    heightfields: HeightfieldCache,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build (or reuse) the shape described by `definition` for `node`.
    ///
    /// Returns the shape and its offset from the node origin in world scale.
    pub fn create_shape(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        definition: &ShapeDefinition,
        is_dynamic: bool,
    ) -> PhysicsResult<(Arc<CollisionShape>, Vec3)> {
        let result = self.build(scene, node, definition, is_dynamic);
        if let Err(err) = &result {
            log::error!("Failed to create {} shape for node {}: {}", definition.kind.name(), node, err);
        }
        result
    }

    fn build(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        definition: &ShapeDefinition,
        is_dynamic: bool,
    ) -> PhysicsResult<(Arc<CollisionShape>, Vec3)> {
        let scene_node = scene.get_node(node).ok_or(PhysicsError::UnknownNode(node))?;
        let scale = scene_node.world_transform().scale.abs();
        let geometry = scene_node.geometry.clone();
        let kind = definition.kind;

        if is_dynamic && matches!(kind, ShapeKind::Mesh | ShapeKind::Heightfield) {
            return Err(PhysicsError::UnsupportedDynamicShape(kind.name()));
        }

        let explicit_center = definition.center.map(|center| {
            if definition.center_absolute { center } else { center * scale }
        });
        let max_scale = scale.max_element();
        let missing_geometry = || PhysicsError::MissingGeometry(node, kind.name());

        let (dimensions, fitted_center) = match kind {
            ShapeKind::Box => match definition.extents {
                Some(extents) => {
                    let half_extents = positive_vec(extents * scale * 0.5, "box extents")?;
                    (ShapeDimensions::Box { half_extents }, Vec3::ZERO)
                }
                None => {
                    let bounds = geometry.as_ref().ok_or_else(missing_geometry)?.bounding_box().scaled(scale);
                    let half_extents = positive_vec(bounds.half_extents(), "fitted box")?;
                    (ShapeDimensions::Box { half_extents }, bounds.center())
                }
            },
            ShapeKind::Sphere => match definition.radius {
                Some(radius) => {
                    let radius = positive(radius * max_scale, "sphere radius")?;
                    (ShapeDimensions::Sphere { radius }, Vec3::ZERO)
                }
                None => {
                    let sphere = geometry.as_ref().ok_or_else(missing_geometry)?.bounding_sphere();
                    let radius = positive(sphere.radius * max_scale, "fitted sphere")?;
                    (ShapeDimensions::Sphere { radius }, sphere.center * scale)
                }
            },
            ShapeKind::Capsule => {
                let bounds = if definition.radius.is_some() && definition.height.is_some() {
                    None
                } else {
                    Some(geometry.as_ref().ok_or_else(missing_geometry)?.bounding_box().scaled(scale))
                };
                let radius = definition
                    .radius
                    .map(|radius| radius * scale.x.max(scale.z))
                    .or_else(|| bounds.map(|b| b.half_extents().x.max(b.half_extents().z)))
                    .unwrap_or_default();
                let height = definition
                    .height
                    .map(|height| height * scale.y)
                    .or_else(|| bounds.map(|b| b.size().y))
                    .unwrap_or_default();
                let radius = positive(radius, "capsule radius")?;
                let height = positive(height, "capsule height")?;
                let center = bounds.map(|b| b.center()).unwrap_or(Vec3::ZERO);
                let half_height = capsule_half_height(radius, height);
                (ShapeDimensions::Capsule { radius, half_height }, center)
            }
            ShapeKind::Mesh => {
                let geometry = geometry.ok_or_else(missing_geometry)?;
                if geometry.is_empty() {
                    return Err(PhysicsError::InvalidShape(format!("mesh '{}' has no triangles", geometry.name)));
                }
                let key = ShapeKey::Mesh(Arc::as_ptr(&geometry) as usize, vec_bits(scale));
                let shape = self.cached(key, || CollisionShape::mesh(geometry, scale))?;
                return Ok((shape, explicit_center.unwrap_or(Vec3::ZERO)));
            }
            ShapeKind::Heightfield => {
                let source = definition
                    .heightfield
                    .as_ref()
                    .ok_or_else(|| PhysicsError::InvalidShape("heightfield shape without a source".into()))?;
                let data = self.heightfields.load(source)?;
                let key = ShapeKey::Heightfield(Arc::as_ptr(&data) as usize, vec_bits(scale));
                let shape = self.cached(key, || Ok(CollisionShape::heightfield(data, scale)))?;
                return Ok((shape, explicit_center.unwrap_or(Vec3::ZERO)));
            }
        };

        let key = match dimensions {
            ShapeDimensions::Box { half_extents } => ShapeKey::Box(vec_bits(half_extents)),
            ShapeDimensions::Sphere { radius } => ShapeKey::Sphere(radius.to_bits()),
            ShapeDimensions::Capsule { radius, half_height } => {
                ShapeKey::Capsule(radius.to_bits(), half_height.to_bits())
            }
            ShapeDimensions::Mesh { scale } => ShapeKey::Mesh(0, vec_bits(scale)),
            ShapeDimensions::Heightfield { scale } => ShapeKey::Heightfield(0, vec_bits(scale)),
        };
        let shape = self.cached(key, || Ok(CollisionShape::primitive(dimensions)))?;
        log::debug!("Created {:?} for node {}", shape, node);
        Ok((shape, explicit_center.unwrap_or(fitted_center)))
    }

    fn cached(
        &mut self,
        key: ShapeKey,
        build: impl FnOnce() -> PhysicsResult<CollisionShape>,
    ) -> PhysicsResult<Arc<CollisionShape>> {
        if let Some(shape) = self.shapes.get(&key).and_then(Weak::upgrade) {
            return Ok(shape);
        }
        let shape = Arc::new(build()?);
        self.shapes.retain(|_, weak| weak.strong_count() > 0);
        self.shapes.insert(key, Arc::downgrade(&shape));
        Ok(shape)
    }

    /// Number of distinct shapes still owned by someone
    pub fn live_count(&self) -> usize {
        self.shapes.values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn heightfields(&self) -> &HeightfieldCache {
        &self.heightfields
    }
}

fn positive(value: f32, what: &str) -> PhysicsResult<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidShape(format!("{what} must be positive, got {value}")))
    }
}

fn positive_vec(value: Vec3, what: &str) -> PhysicsResult<Vec3> {
    if value.is_finite() && value.min_element() > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidShape(format!("{what} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_core::Transform;

    fn scene_with_node(transform: Transform, geometry: Option<MeshGeometry>) -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let node = scene.add_node_with_transform("node", transform);
        if let Some(geometry) = geometry {
            scene.set_geometry(node, Arc::new(geometry));
        }
        (scene, node)
    }

    #[test]
    fn test_explicit_box_is_scaled() {
        let transform = Transform::new(Vec3::ZERO, glam::Quat::IDENTITY, Vec3::new(2.0, 1.0, 1.0));
        let (scene, node) = scene_with_node(transform, None);
        let mut cache = ShapeCache::new();

        let (shape, offset) = cache
            .create_shape(&scene, node, &ShapeDefinition::cuboid(Vec3::new(1.0, 2.0, 4.0)), true)
            .unwrap();
        assert_eq!(shape.kind(), ShapeKind::Box);
        assert_eq!(shape.dimensions(), ShapeDimensions::Box { half_extents: Vec3::new(1.0, 1.0, 2.0) });
        assert_eq!(offset, Vec3::ZERO);
    }

    #[test]
    fn test_box_auto_fits_geometry() {
        let geometry = MeshGeometry::cuboid("crate", Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 0.25));
        let (scene, node) = scene_with_node(Transform::IDENTITY, Some(geometry));
        let mut cache = ShapeCache::new();

        let (shape, offset) = cache
            .create_shape(&scene, node, &ShapeDefinition::auto(ShapeKind::Box), false)
            .unwrap();
        assert_eq!(shape.dimensions(), ShapeDimensions::Box { half_extents: Vec3::new(0.5, 1.0, 0.25) });
        assert_eq!(offset, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_capsule_auto_fit() {
        let geometry = MeshGeometry::cuboid("hero", Vec3::new(0.0, 0.9, 0.0), Vec3::new(0.3, 0.9, 0.2));
        let (scene, node) = scene_with_node(Transform::IDENTITY, Some(geometry));
        let mut cache = ShapeCache::new();

        let (shape, offset) = cache
            .create_shape(&scene, node, &ShapeDefinition::auto(ShapeKind::Capsule), true)
            .unwrap();
        match shape.dimensions() {
            ShapeDimensions::Capsule { radius, half_height } => {
                assert!((radius - 0.3).abs() < 1e-6);
                assert!((half_height - 0.6).abs() < 1e-6);
            }
            other => panic!("unexpected dimensions {other:?}"),
        }
        assert!((offset - Vec3::new(0.0, 0.9, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_short_capsule_degenerates_to_sphere_height() {
        let shape = CollisionShape::capsule(0.5, 0.6);
        assert_eq!(shape.dimensions(), ShapeDimensions::Capsule { radius: 0.5, half_height: 0.0 });
    }

    #[test]
    fn test_center_absolute_ignores_scale() {
        let transform = Transform::new(Vec3::ZERO, glam::Quat::IDENTITY, Vec3::splat(2.0));
        let (scene, node) = scene_with_node(transform, None);
        let mut cache = ShapeCache::new();

        let scaled = ShapeDefinition::sphere(1.0).with_center(Vec3::Y, false);
        let absolute = ShapeDefinition::sphere(1.0).with_center(Vec3::Y, true);
        let (_, scaled_offset) = cache.create_shape(&scene, node, &scaled, false).unwrap();
        let (shape, absolute_offset) = cache.create_shape(&scene, node, &absolute, false).unwrap();
        assert_eq!(scaled_offset, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(absolute_offset, Vec3::Y);
        assert_eq!(shape.dimensions(), ShapeDimensions::Sphere { radius: 2.0 });
    }

    #[test]
    fn test_auto_fit_without_geometry_fails() {
        let (scene, node) = scene_with_node(Transform::IDENTITY, None);
        let mut cache = ShapeCache::new();

        let result = cache.create_shape(&scene, node, &ShapeDefinition::auto(ShapeKind::Sphere), false);
        assert!(matches!(result, Err(PhysicsError::MissingGeometry(_, "sphere"))));

        let result = cache.create_shape(&scene, node, &ShapeDefinition::mesh(), false);
        assert!(matches!(result, Err(PhysicsError::MissingGeometry(_, "mesh"))));
    }

    #[test]
    fn test_concave_shapes_rejected_for_dynamic_bodies() {
        let geometry = MeshGeometry::cuboid("rock", Vec3::ZERO, Vec3::ONE);
        let (scene, node) = scene_with_node(Transform::IDENTITY, Some(geometry));
        let mut cache = ShapeCache::new();

        let result = cache.create_shape(&scene, node, &ShapeDefinition::mesh(), true);
        assert!(matches!(result, Err(PhysicsError::UnsupportedDynamicShape("mesh"))));

        let (shape, _) = cache.create_shape(&scene, node, &ShapeDefinition::mesh(), false).unwrap();
        assert!(shape.is_concave());
    }

    #[test]
    fn test_identical_shapes_are_shared_until_released() {
        let (scene, node) = scene_with_node(Transform::IDENTITY, None);
        let mut cache = ShapeCache::new();
        let definition = ShapeDefinition::capsule(0.4, 1.8);

        let (a, _) = cache.create_shape(&scene, node, &definition, true).unwrap();
        let (b, _) = cache.create_shape(&scene, node, &definition, true).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.live_count(), 1);

        drop(a);
        assert_eq!(cache.live_count(), 1);
        drop(b);
        assert_eq!(cache.live_count(), 0);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let (scene, node) = scene_with_node(Transform::IDENTITY, None);
        let mut cache = ShapeCache::new();
        let result = cache.create_shape(&scene, node, &ShapeDefinition::sphere(-1.0), false);
        assert!(matches!(result, Err(PhysicsError::InvalidShape(_))));
    }

    #[test]
    fn test_unknown_node() {
        let (mut scene, node) = scene_with_node(Transform::IDENTITY, None);
        scene.remove_node(node);
        let mut cache = ShapeCache::new();
        let result = cache.create_shape(&scene, node, &ShapeDefinition::sphere(1.0), false);
        assert!(matches!(result, Err(PhysicsError::UnknownNode(_))));
    }

    #[test]
    fn test_definition_from_json() {
        let json = r#"{ "type": "CAPSULE", "radius": 0.5, "height": 2.0, "center": [0.0, 1.0, 0.0] }"#;
        let definition: ShapeDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.kind, ShapeKind::Capsule);
        assert_eq!(definition.center, Some(Vec3::Y));
        assert!(!definition.center_absolute);
        assert_eq!(definition.extents, None);
    }
}
