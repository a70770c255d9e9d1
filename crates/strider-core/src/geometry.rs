//! Render Geometry
//!
//! The renderable geometry attached to a scene node, reduced to what other
//! systems need from it: vertex positions, triangle indices and bounds.

use glam::Vec3;

use crate::math::{Aabb, BoundingSphere};

/// Triangle mesh geometry in node-local space
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    /// Mesh name
    pub name: String,
    /// Vertex positions
    positions: Vec<Vec3>,
    /// Triangle indices
    indices: Vec<[u32; 3]>,
    /// Cached local bounds
    bounds: Aabb,
}

impl MeshGeometry {
    /// Create geometry from positions and triangle indices
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            name: name.into(),
            positions,
            indices,
            bounds,
        }
    }

    /// Axis-aligned box mesh centered at `center`
    pub fn cuboid(name: impl Into<String>, center: Vec3, half_extents: Vec3) -> Self {
        let h = half_extents;
        let positions = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ]
        .iter()
        .map(|p| *p + center)
        .collect();

        let indices = vec![
            [0, 2, 1], [0, 3, 2], // back
            [4, 5, 6], [4, 6, 7], // front
            [0, 1, 5], [0, 5, 4], // bottom
            [3, 6, 2], [3, 7, 6], // top
            [0, 4, 7], [0, 7, 3], // left
            [1, 2, 6], [1, 6, 5], // right
        ];

        Self::new(name, positions, indices)
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Triangle indices
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// Local-space bounding box
    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Local-space bounding sphere
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_aabb(&self.bounds)
    }

    /// Check whether the mesh has any triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
