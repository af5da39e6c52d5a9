//! Mesh geometry representation.
//!
//! This module provides the triangle mesh consumed by the rendering
//! pipelines: world-space vertex positions, triangle indices and optional
//! per-vertex attributes (normal, color, texture coordinate) plus an
//! optional diffuse texture.

use cvr_math::{Aabb, Vec3};
use thiserror::Error;

use crate::texture::Texture;

/// Errors reported by [`Mesh::validate`].
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IncompleteFace(usize),

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{attribute} length {len} does not match vertex count {vertex_count}")]
    AttributeLengthMismatch {
        attribute: &'static str,
        len: usize,
        vertex_count: usize,
    },
}

/// A triangle mesh with optional per-vertex attributes.
///
/// Positions are in world space. Attribute arrays, when present, are indexed
/// by the same vertex indices as positions. Vertex colors are RGB in the
/// 0..=255 range.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - call `compute_normals()` to generate)
    pub normals: Option<Vec<Vec3>>,

    /// Vertex colors, RGB in 0..=255 (optional)
    pub colors: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Diffuse texture sampled through the UV coordinates (optional)
    pub texture: Option<Texture>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices.
    ///
    /// Normals are NOT automatically computed. Call `compute_normals()`
    /// explicitly, or let the renderer derive them during preparation.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals: None,
            colors: None,
            uvs: None,
            indices,
            texture: None,
            bounds,
        }
    }

    /// Attach per-vertex normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach per-vertex colors (RGB in 0..=255).
    pub fn with_colors(mut self, colors: Vec<Vec3>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Attach per-vertex UV coordinates.
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach a diffuse texture.
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        Aabb::from_points(min, max)
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// This generates normals if the mesh doesn't have them, or replaces
    /// existing normals. Triangles wind counter-clockwise as seen from the
    /// front, so the face normal is edge1 x edge2.
    pub fn compute_normals(&mut self) {
        self.normals = Some(Self::smooth_normals(&self.positions, &self.indices));
    }

    /// Smooth per-vertex normals for the given geometry.
    ///
    /// Out-of-range and incomplete faces are skipped; `validate()` reports
    /// them as errors separately.
    pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
        let vertex_count = positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        // Accumulate area-weighted face normals at each vertex
        for face in indices.chunks_exact(3) {
            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let edge1 = positions[i1] - positions[i0];
            let edge2 = positions[i2] - positions[i0];
            let face_normal = edge1.cross(edge2);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        // Normalize accumulated normals
        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y; // Default up normal for degenerate cases
            }
        }

        normals
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has vertex colors.
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Check if the mesh has a diffuse texture.
    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    /// Get the mesh size (diagonal length of bounding box).
    pub fn size(&self) -> f32 {
        let extent = Vec3::new(
            self.bounds.x.size(),
            self.bounds.y.size(),
            self.bounds.z.size(),
        );
        extent.length()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Extract triangle indices as an array of [i0, i1, i2] triples.
    ///
    /// A trailing incomplete face is dropped; `validate()` reports it as an
    /// error separately.
    pub fn face_indices(&self) -> Vec<[u32; 3]> {
        self.indices
            .chunks_exact(3)
            .map(|chunk| [chunk[0], chunk[1], chunk[2]])
            .collect()
    }

    /// Check structural consistency of the mesh.
    ///
    /// Verifies that the index count is a multiple of 3, that every index
    /// references an existing vertex, and that each attribute array present
    /// matches the vertex count.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteFace(self.indices.len()));
        }

        let vertex_count = self.positions.len();
        for &index in &self.indices {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        let attributes = [
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
            ("uvs", self.uvs.as_ref().map(Vec::len)),
        ];
        for (attribute, len) in attributes {
            if let Some(len) = len {
                if len != vertex_count {
                    return Err(MeshError::AttributeLengthMismatch {
                        attribute,
                        len,
                        vertex_count,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2])
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = unit_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
        assert!(!mesh.has_colors());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();

        assert!(mesh.has_normals());
        let normals = mesh.normals.as_ref().unwrap();

        // CCW triangle in the XY plane: normal points +Z
        for normal in normals {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_compute_normals_degenerate() {
        let positions = vec![Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        let mut mesh = Mesh::new(positions, vec![0, 1, 2]);
        mesh.compute_normals();

        // Zero-area face falls back to the default up normal
        for normal in mesh.normals.as_ref().unwrap() {
            assert_eq!(*normal, Vec3::Y);
        }
    }

    #[test]
    fn test_bounds_computation() {
        let positions = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2]);

        assert!((mesh.bounds.x.min - (-1.0)).abs() < 0.001);
        assert!((mesh.bounds.x.max - 4.0).abs() < 0.001);
        assert!((mesh.bounds.y.min - (-2.0)).abs() < 0.001);
        assert!((mesh.bounds.y.max - 5.0).abs() < 0.001);
        assert!((mesh.bounds.z.min - (-3.0)).abs() < 0.001);
        assert!((mesh.bounds.z.max - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_face_indices() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2, 1, 3, 2]);
        let faces = mesh.face_indices();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0], [0, 1, 2]);
        assert_eq!(faces[1], [1, 3, 2]);
    }

    #[test]
    fn test_validate_incomplete_face() {
        let mut mesh = unit_triangle();
        mesh.indices.push(0);

        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IncompleteFace(4))
        ));
    }

    #[test]
    fn test_validate_index_out_of_range() {
        let mut mesh = unit_triangle();
        mesh.indices = vec![0, 1, 7];

        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn test_validate_attribute_mismatch() {
        let mesh = unit_triangle().with_colors(vec![Vec3::ZERO; 2]);

        assert!(matches!(
            mesh.validate(),
            Err(MeshError::AttributeLengthMismatch {
                attribute: "colors",
                len: 2,
                ..
            })
        ));

        let mesh = unit_triangle().with_normals(vec![Vec3::Y; 5]);

        assert!(matches!(
            mesh.validate(),
            Err(MeshError::AttributeLengthMismatch {
                attribute: "normals",
                len: 5,
                ..
            })
        ));
    }
}
