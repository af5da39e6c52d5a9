//! Mesh rendering against calibrated cameras.
//!
//! The crate provides [`Camera`] (pinhole or orthographic, with precomputed
//! per-pixel ray tables), a [`TriangleBvh`] acceleration structure and the
//! [`Renderer`] front end driving two interchangeable pipelines: per-pixel
//! ray casting and scanline rasterization with a z-buffer. Both pipelines
//! fill the same three aligned buffers: 8-bit color, 16-bit scaled depth
//! and an 8-bit validity mask.

pub mod bvh;
pub mod camera;
pub mod renderer;

mod raster;
mod raycast;
mod shader;

pub use bvh::{BvhBuildOptions, BvhBuildStats, BvhError, RayHit, TriangleBvh};
pub use camera::{Camera, CameraError, PinholeIntrinsics, Projection};
pub use renderer::{
    ColorSource, Interpolation, RenderError, RenderOptions, RenderPipeline, Renderer,
};
