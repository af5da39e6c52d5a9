//! Render orchestration.
//!
//! [`Renderer`] owns the configuration and references to the scene (one mesh,
//! one camera), validates everything up front, and dispatches to one of the
//! two pipelines. Both produce the same three aligned buffers: color, depth
//! and mask.

use std::sync::Arc;
use std::time::Instant;

use cvr_core::{ColorImage, DepthImage, MaskImage, Mesh, MeshError};
use cvr_math::Vec3;
use thiserror::Error;

use crate::bvh::{BvhBuildOptions, BvhError, TriangleBvh};
use crate::camera::Camera;
use crate::shader::ColorData;
use crate::{raster, raycast};

/// Where the per-pixel color comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    /// Per-vertex RGB colors stored on the mesh, in 0..=255.
    VertexColor,
    /// The mesh texture, addressed through per-vertex UV coordinates.
    Texture,
}

/// How attribute values are combined within a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Snap to the nearest vertex color or texel.
    Nearest,
    /// Blend by barycentric weights (vertex colors) or bilinearly (texels).
    Bilinear,
}

/// Which rendering algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPipeline {
    /// Cast one ray per pixel through the BVH.
    RayCast,
    /// Project triangles and scan-convert them with a z-buffer.
    Raster,
}

/// Configuration for a render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub color_source: ColorSource,
    pub interpolation: Interpolation,
    /// Multiplier from metric depth to the 16-bit depth buffer.
    pub depth_scale: f32,
    /// Skip triangles facing away from the camera.
    pub backface_culling: bool,
    pub pipeline: RenderPipeline,
    /// Color written to pixels no surface covers.
    pub background: [u8; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color_source: ColorSource::VertexColor,
            interpolation: Interpolation::Bilinear,
            depth_scale: 1.0,
            backface_culling: true,
            pipeline: RenderPipeline::RayCast,
            background: [0, 0, 0],
        }
    }
}

/// Errors raised by [`Renderer`].
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no camera set")]
    CameraNotSet,

    #[error("no mesh set")]
    MeshNotSet,

    #[error("mesh not prepared; call prepare_mesh first")]
    MeshNotPrepared,

    #[error("color source is vertex colors but the mesh has none")]
    MissingVertexColors,

    #[error("color source is a texture but the mesh has none")]
    MissingTexture,

    #[error("color source is a texture but the mesh has no UV coordinates")]
    MissingUvs,

    #[error("depth scale must be a positive finite number, got {0}")]
    InvalidDepthScale(f32),

    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("acceleration structure: {0}")]
    Bvh(#[from] BvhError),
}

/// Derived per-mesh data built once by [`Renderer::prepare_mesh`].
pub(crate) struct PreparedMesh {
    pub bvh: TriangleBvh,
    /// Unit geometric normal per face, zero for degenerate faces.
    pub face_normals: Vec<Vec3>,
}

/// Everything a pipeline needs for one render call, validated and borrowed.
pub(crate) struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub options: &'a RenderOptions,
    pub positions: &'a [Vec3],
    pub faces: &'a [[u32; 3]],
    pub face_normals: &'a [Vec3],
    pub color_data: ColorData<'a>,
    pub bvh: &'a TriangleBvh,
}

/// Renders a mesh through a camera into color, depth and mask buffers.
///
/// Usage: set a camera and a mesh, call [`prepare_mesh`](Self::prepare_mesh)
/// once, then [`render`](Self::render) as often as needed (typically after
/// moving the camera). Replacing the mesh discards the prepared data.
pub struct Renderer {
    pub options: RenderOptions,
    mesh: Option<Arc<Mesh>>,
    camera: Option<Arc<Camera>>,
    prepared: Option<PreparedMesh>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            mesh: None,
            camera: None,
            prepared: None,
        }
    }

    /// Replace the whole configuration at once.
    ///
    /// Options are read-only for the duration of a render call; change them
    /// between calls.
    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn camera(&self) -> Option<&Arc<Camera>> {
        self.camera.as_ref()
    }

    pub fn set_camera(&mut self, camera: Arc<Camera>) {
        self.camera = Some(camera);
    }

    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Set the mesh to render. Any previously prepared data is discarded.
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = Some(mesh);
        self.prepared = None;
    }

    /// Validate the mesh and build the derived data rendering needs:
    /// per-face normals and the BVH.
    pub fn prepare_mesh(&mut self) -> Result<(), RenderError> {
        let mesh = self.mesh.as_deref().ok_or(RenderError::MeshNotSet)?;
        mesh.validate()?;

        let start = Instant::now();
        let faces = mesh.face_indices();
        let face_normals = face_normals(&mesh.positions, &faces);
        let bvh = TriangleBvh::build(mesh.positions.clone(), faces, BvhBuildOptions::default())?;

        let stats = bvh.stats();
        log::info!(
            "prepared mesh: {} triangles, {} BVH leaves, depth {}, {:.1} ms",
            bvh.faces().len(),
            stats.leaf_nodes,
            stats.max_depth,
            start.elapsed().as_secs_f64() * 1000.0
        );

        self.prepared = Some(PreparedMesh { bvh, face_normals });
        Ok(())
    }

    /// Render into the three output buffers.
    ///
    /// The buffers are resized to the camera's image size; color is cleared
    /// to the background color, depth and mask to zero. Depth holds the
    /// camera-space z of the closest surface times `depth_scale`, rounded
    /// and clamped to 1..=65535 so a hit pixel is never zero.
    pub fn render(
        &self,
        color: &mut ColorImage,
        depth: &mut DepthImage,
        mask: &mut MaskImage,
    ) -> Result<(), RenderError> {
        let camera = self.camera.as_deref().ok_or(RenderError::CameraNotSet)?;
        let mesh = self.mesh.as_deref().ok_or(RenderError::MeshNotSet)?;
        let prepared = self.prepared.as_ref().ok_or(RenderError::MeshNotPrepared)?;

        let color_data = match self.options.color_source {
            ColorSource::VertexColor => {
                let colors = mesh
                    .colors
                    .as_deref()
                    .ok_or(RenderError::MissingVertexColors)?;
                ColorData::Vertex { colors }
            }
            ColorSource::Texture => {
                let texture = mesh.texture.as_ref().ok_or(RenderError::MissingTexture)?;
                let uvs = mesh.uvs.as_deref().ok_or(RenderError::MissingUvs)?;
                ColorData::Texture { texture, uvs }
            }
        };

        let scale = self.options.depth_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderError::InvalidDepthScale(scale));
        }

        color.resize(camera.width(), camera.height(), self.options.background);
        depth.resize(camera.width(), camera.height(), 0);
        mask.resize(camera.width(), camera.height(), 0);

        let ctx = RenderContext {
            camera,
            options: &self.options,
            positions: prepared.bvh.positions(),
            faces: prepared.bvh.faces(),
            face_normals: &prepared.face_normals,
            color_data,
            bvh: &prepared.bvh,
        };

        let start = Instant::now();
        match self.options.pipeline {
            RenderPipeline::RayCast => raycast::render(&ctx, color, depth, mask),
            RenderPipeline::Raster => raster::render(&ctx, color, depth, mask),
        }
        log::debug!(
            "rendered {}x{} ({:?}) in {:.1} ms",
            camera.width(),
            camera.height(),
            self.options.pipeline,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Unit geometric normal of each face. Degenerate faces get a zero vector.
fn face_normals(positions: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    faces
        .iter()
        .map(|face| {
            let v0 = positions[face[0] as usize];
            let v1 = positions[face[1] as usize];
            let v2 = positions[face[2] as usize];
            (v1 - v0).cross(v2 - v0).normalize_or_zero()
        })
        .collect()
}

/// Scale a camera-space depth to the 16-bit output range.
///
/// Zero is reserved for "no surface", so valid depths clamp to 1..=65535.
pub(crate) fn quantize_depth(z: f32, scale: f32) -> u16 {
    (z * scale).round().clamp(1.0, 65535.0) as u16
}
