//! Raster pipeline: project triangles, scan-convert, z-buffer, shade.
//!
//! Triangles are projected once, set up once (edge data, bounding box, fill
//! rule flags), then scan-converted into a per-pixel sample accumulator.
//! The accumulator is split into horizontal bands so bands rasterize in
//! parallel without locking; a final parallel pass shades the samples.
//!
//! Backfaces are detected from the sign of the projected area. Pixels whose
//! center lands exactly on a triangle edge are claimed by at most one of the
//! triangles sharing that edge (top-left rule), so adjacent triangles
//! produce no seams and no double writes.

use cvr_core::{ColorImage, DepthImage, MaskImage};
use cvr_math::Vec2;
use rayon::prelude::*;

use crate::camera::Projection;
use crate::renderer::{quantize_depth, RenderContext};
use crate::shader::{self, SurfaceSample};

/// Rows per parallel rasterization band.
const BAND_ROWS: usize = 64;

/// A vertex after projection: image position and camera-space z.
#[derive(Debug, Clone, Copy)]
struct ProjectedVertex {
    image: Vec2,
    z: f32,
}

/// Per-triangle data prepared once before scan conversion.
///
/// Vertices are stored in positive-area order; `swapped` records whether the
/// second and third vertex changed places to get there.
struct TriangleSetup {
    face: u32,
    v0: Vec2,
    v1: Vec2,
    v2: Vec2,
    z0: f32,
    z1: f32,
    z2: f32,
    inv_area: f32,
    /// Covered pixel range, inclusive on both ends.
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    /// Fill rule flag per edge: w0 (v1->v2), w1 (v2->v0), w2 (v0->v1).
    top_left: [bool; 3],
    swapped: bool,
}

/// The closest surface seen so far at one pixel.
#[derive(Debug, Clone, Copy)]
struct RasterSample {
    z: f32,
    face: u32,
    u: f32,
    v: f32,
}

pub(crate) fn render(
    ctx: &RenderContext,
    color: &mut ColorImage,
    depth: &mut DepthImage,
    mask: &mut MaskImage,
) {
    let width = ctx.camera.width() as usize;
    let height = ctx.camera.height() as usize;
    let w2c = ctx.camera.w2c();
    let perspective = matches!(ctx.camera.projection(), Projection::Pinhole(_));

    let projected: Vec<ProjectedVertex> = ctx
        .positions
        .par_iter()
        .map(|&world_p| {
            let camera_p = w2c.transform_point(world_p);
            let (image, z) = ctx.camera.project(camera_p);
            ProjectedVertex { image, z }
        })
        .collect();

    let setups: Vec<TriangleSetup> = ctx
        .faces
        .par_iter()
        .enumerate()
        .filter_map(|(face_id, face)| {
            setup_triangle(
                face_id as u32,
                *face,
                &projected,
                ctx.camera.width(),
                ctx.camera.height(),
                ctx.options.backface_culling,
            )
        })
        .collect();

    // Scan-convert into the accumulator, one band of rows per task
    let mut samples: Vec<Option<RasterSample>> = vec![None; width * height];
    samples
        .par_chunks_mut(BAND_ROWS * width)
        .enumerate()
        .for_each(|(band, chunk)| {
            let y_start = (band * BAND_ROWS) as u32;
            let y_end = y_start + (chunk.len() / width) as u32 - 1;

            for setup in &setups {
                if setup.max_y < y_start || setup.min_y > y_end {
                    continue;
                }
                for y in setup.min_y.max(y_start)..=setup.max_y.min(y_end) {
                    let row_offset = (y - y_start) as usize * width;
                    for x in setup.min_x..=setup.max_x {
                        let p = Vec2::new(x as f32, y as f32);
                        let w0 = edge_function(setup.v1, setup.v2, p);
                        let w1 = edge_function(setup.v2, setup.v0, p);
                        let w2 = edge_function(setup.v0, setup.v1, p);
                        if !covers(w0, setup.top_left[0])
                            || !covers(w1, setup.top_left[1])
                            || !covers(w2, setup.top_left[2])
                        {
                            continue;
                        }

                        let b0 = w0 * setup.inv_area;
                        let b1 = w1 * setup.inv_area;
                        let b2 = w2 * setup.inv_area;

                        let (z, u, v) = if perspective {
                            let d0 = b0 / setup.z0;
                            let d1 = b1 / setup.z1;
                            let d2 = b2 / setup.z2;
                            let z = 1.0 / (d0 + d1 + d2);
                            (z, d1 * z, d2 * z)
                        } else {
                            (b0 * setup.z0 + b1 * setup.z1 + b2 * setup.z2, b1, b2)
                        };

                        let slot = &mut chunk[row_offset + x as usize];
                        let closer = match slot {
                            Some(current) => z < current.z,
                            None => true,
                        };
                        if closer {
                            // Report weights in the face's original vertex order
                            let (u, v) = if setup.swapped { (v, u) } else { (u, v) };
                            *slot = Some(RasterSample {
                                z,
                                face: setup.face,
                                u,
                                v,
                            });
                        }
                    }
                }
            }
        });

    // Resolve the surviving samples into the output buffers
    color
        .data_mut()
        .par_chunks_mut(width)
        .zip(depth.data_mut().par_chunks_mut(width))
        .zip(mask.data_mut().par_chunks_mut(width))
        .zip(samples.par_chunks(width))
        .for_each(|(((color_row, depth_row), mask_row), sample_row)| {
            for x in 0..width {
                let sample = match sample_row[x] {
                    Some(sample) => sample,
                    None => continue,
                };

                let surface = SurfaceSample {
                    face: sample.face,
                    u: sample.u,
                    v: sample.v,
                    normal: ctx.face_normals[sample.face as usize],
                };
                depth_row[x] = quantize_depth(sample.z, ctx.options.depth_scale);
                mask_row[x] = 255;
                color_row[x] = shader::shade(ctx.faces, &ctx.color_data, ctx.options, &surface);
            }
        });
}

/// Prepare one triangle for scan conversion.
///
/// Returns `None` for triangles that cannot produce a pixel: a vertex at or
/// behind the camera plane, zero projected area, a backface while culling,
/// or a bounding box with no pixel centers inside the image.
fn setup_triangle(
    face_id: u32,
    face: [u32; 3],
    projected: &[ProjectedVertex],
    width: u32,
    height: u32,
    culling: bool,
) -> Option<TriangleSetup> {
    let p0 = projected[face[0] as usize];
    let p1 = projected[face[1] as usize];
    let p2 = projected[face[2] as usize];

    if p0.z <= 0.0 || p1.z <= 0.0 || p2.z <= 0.0 {
        return None;
    }

    let area = edge_function(p0.image, p1.image, p2.image);
    if area.abs() < f32::MIN_POSITIVE {
        return None;
    }

    // Negative area means the camera sees the back of this triangle
    let (v1, v2, z1, z2, area, swapped) = if area < 0.0 {
        if culling {
            return None;
        }
        (p2.image, p1.image, p2.z, p1.z, -area, true)
    } else {
        (p1.image, p2.image, p1.z, p2.z, area, false)
    };
    let v0 = p0.image;

    let min_x = v0.x.min(v1.x).min(v2.x).ceil().max(0.0);
    let max_x = v0.x.max(v1.x).max(v2.x).floor().min((width - 1) as f32);
    let min_y = v0.y.min(v1.y).min(v2.y).ceil().max(0.0);
    let max_y = v0.y.max(v1.y).max(v2.y).floor().min((height - 1) as f32);
    if min_x > max_x || min_y > max_y {
        return None;
    }

    Some(TriangleSetup {
        face: face_id,
        v0,
        v1,
        v2,
        z0: p0.z,
        z1,
        z2,
        inv_area: 1.0 / area,
        min_x: min_x as u32,
        max_x: max_x as u32,
        min_y: min_y as u32,
        max_y: max_y as u32,
        top_left: [
            is_top_left(v1, v2),
            is_top_left(v2, v0),
            is_top_left(v0, v1),
        ],
        swapped,
    })
}

/// Twice the signed area of triangle (a, b, c) in image space.
///
/// Positive when (a, b, c) winds front-facing in y-down image coordinates;
/// with c a pixel center, zero means the pixel lies exactly on edge (a, b).
fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

/// Whether edge a->b of a positive-area triangle is a top or left edge.
///
/// In y-down image coordinates the left edges of such a triangle run toward
/// increasing y and its top edge runs toward decreasing x.
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    b.y > a.y || (b.y == a.y && b.x < a.x)
}

/// Fill rule: edges claim a pixel center on the boundary only for top and
/// left edges, so triangles sharing an edge never both claim it.
fn covers(w: f32, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}
