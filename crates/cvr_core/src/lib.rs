//! CVR Core - asset and image types shared by the rendering pipelines.
//!
//! This crate provides:
//!
//! - **Mesh**: triangle geometry with optional per-vertex attributes
//! - **Texture**: 8-bit diffuse textures with nearest/bilinear sampling
//! - **Image**: the color/depth/mask output buffers and their PNG export
//! - **Pose log I/O**: TUM-format trajectory files
//!
//! # Example
//!
//! ```ignore
//! use cvr_core::{ColorImage, Mesh};
//!
//! let mut mesh = Mesh::new(positions, indices);
//! mesh.compute_normals();
//! let color = ColorImage::new(640, 480, [0, 0, 0]);
//! ```

pub mod image;
pub mod mesh;
pub mod texture;
pub mod tum;

// Re-export commonly used types
// `crate::` disambiguates the module from the external `image` crate.
pub use crate::image::{ColorImage, DepthImage, Image, ImageIoError, MaskImage};
pub use mesh::{Mesh, MeshError};
pub use texture::{Texture, TextureError};
pub use tum::{load_tum, save_tum, PoseLogError};
