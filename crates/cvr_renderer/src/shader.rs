//! Pixel shading shared by both pipelines.
//!
//! Both the ray-cast and the raster pipeline end in the same place: a
//! per-pixel surface sample (face id plus barycentric weights) that has to
//! become an 8-bit RGB color according to the active render options.

use cvr_core::Texture;
use cvr_math::Vec3;

use crate::renderer::{Interpolation, RenderOptions};

/// A resolved surface sample at one pixel.
///
/// `u` weights the face's second vertex and `v` the third; the first vertex
/// carries `1 - u - v`. For the raster pipeline the weights are
/// perspective-corrected. `normal` is the geometric face normal used for
/// backface tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SurfaceSample {
    pub face: u32,
    pub u: f32,
    pub v: f32,
    pub normal: Vec3,
}

/// Color attribute source, resolved and validated once per render call.
///
/// Resolving up front keeps the per-pixel path free of `Option` handling;
/// a missing attribute is a render precondition error instead.
pub(crate) enum ColorData<'a> {
    Vertex {
        colors: &'a [Vec3],
    },
    Texture {
        texture: &'a Texture,
        uvs: &'a [[f32; 2]],
    },
}

/// Shade one sample to an 8-bit RGB color.
pub(crate) fn shade(
    faces: &[[u32; 3]],
    color_data: &ColorData,
    options: &RenderOptions,
    sample: &SurfaceSample,
) -> [u8; 3] {
    let face = faces[sample.face as usize];
    let w = 1.0 - sample.u - sample.v;

    match color_data {
        ColorData::Vertex { colors } => {
            let c0 = colors[face[0] as usize];
            let c1 = colors[face[1] as usize];
            let c2 = colors[face[2] as usize];

            let color = match options.interpolation {
                // Snap to the dominant vertex; earlier vertex wins a tie
                Interpolation::Nearest => {
                    let weights = [w, sample.u, sample.v];
                    let candidates = [c0, c1, c2];
                    let mut best = 0;
                    for k in 1..3 {
                        if weights[k] > weights[best] {
                            best = k;
                        }
                    }
                    candidates[best]
                }
                Interpolation::Bilinear => w * c0 + sample.u * c1 + sample.v * c2,
            };
            [
                to_channel(color.x),
                to_channel(color.y),
                to_channel(color.z),
            ]
        }
        ColorData::Texture { texture, uvs } => {
            let uv0 = uvs[face[0] as usize];
            let uv1 = uvs[face[1] as usize];
            let uv2 = uvs[face[2] as usize];
            let u = w * uv0[0] + sample.u * uv1[0] + sample.v * uv2[0];
            let v = w * uv0[1] + sample.u * uv1[1] + sample.v * uv2[1];

            match options.interpolation {
                Interpolation::Nearest => texture.sample_nearest(u, v),
                Interpolation::Bilinear => {
                    let color = texture.sample_bilinear(u, v);
                    [
                        to_channel(color[0]),
                        to_channel(color[1]),
                        to_channel(color[2]),
                    ]
                }
            }
        }
    }
}

/// Convert a 0..=255 float channel to u8, rounding and clamping.
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
