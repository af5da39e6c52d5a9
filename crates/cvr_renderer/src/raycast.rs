//! Ray-casting pipeline: one ray per pixel through the BVH.
//!
//! Each pixel looks up its precomputed ray from the camera tables, finds the
//! closest triangle, applies backface culling against the geometric face
//! normal and writes depth, mask and shaded color. Rows are rendered in
//! parallel.

use cvr_core::{ColorImage, DepthImage, MaskImage};
use cvr_math::Interval;
use rayon::prelude::*;

use crate::renderer::{quantize_depth, RenderContext};
use crate::shader::{self, SurfaceSample};

/// Hits closer than this along the ray are ignored.
const MIN_T: f32 = 1e-4;

/// Far limit for ray queries.
const FAR_T: f32 = 1e30;

pub(crate) fn render(
    ctx: &RenderContext,
    color: &mut ColorImage,
    depth: &mut DepthImage,
    mask: &mut MaskImage,
) {
    let width = ctx.camera.width() as usize;
    let w2c = ctx.camera.w2c();

    color
        .data_mut()
        .par_chunks_mut(width)
        .zip(depth.data_mut().par_chunks_mut(width))
        .zip(mask.data_mut().par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, ((color_row, depth_row), mask_row))| {
            let y = y as u32;
            for x in 0..width {
                let origin = ctx.camera.org_ray_w_at(x as u32, y);
                let direction = ctx.camera.ray_w_at(x as u32, y);

                let hit = match ctx
                    .bvh
                    .intersect(origin, direction, Interval::new(MIN_T, FAR_T))
                {
                    Some(hit) => hit,
                    None => continue,
                };

                let sample = SurfaceSample {
                    face: hit.face,
                    u: hit.u,
                    v: hit.v,
                    normal: ctx.face_normals[hit.face as usize],
                };
                if ctx.options.backface_culling && sample.normal.dot(direction) > 0.0 {
                    continue;
                }

                // Depth is camera-space z, not distance along the ray
                let hit_point = origin + direction * hit.t;
                let z = w2c.transform_point(hit_point).z;

                depth_row[x] = quantize_depth(z, ctx.options.depth_scale);
                mask_row[x] = 255;
                color_row[x] = shader::shade(ctx.faces, &ctx.color_data, ctx.options, &sample);
            }
        });
}
