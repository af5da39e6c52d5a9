use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use cvr_core::{ColorImage, DepthImage, Image, MaskImage, Mesh, load_tum, save_tum};
use cvr_math::{Pose, Vec3};
use cvr_renderer::{Camera, RenderOptions, RenderPipeline, Renderer};

/// Axis-aligned cube with one color per corner (RGB follows the corner sign).
fn colored_cube(center: Vec3, size: f32) -> Mesh {
    let h = size * 0.5;
    let mut positions = Vec::with_capacity(8);
    let mut colors = Vec::with_capacity(8);
    for &z in &[-h, h] {
        for &(x, y) in &[(-h, -h), (h, -h), (h, h), (-h, h)] {
            positions.push(center + Vec3::new(x, y, z));
            colors.push(Vec3::new(
                if x > 0.0 { 255.0 } else { 0.0 },
                if y > 0.0 { 255.0 } else { 0.0 },
                if z > 0.0 { 255.0 } else { 0.0 },
            ));
        }
    }

    // Two triangles per face, wound so the normals point outward
    let indices = vec![
        0, 3, 1, 1, 3, 2, // near (-z)
        5, 6, 4, 4, 6, 7, // far (+z)
        0, 4, 7, 0, 7, 3, // left (-x)
        1, 2, 6, 1, 6, 5, // right (+x)
        0, 1, 5, 0, 5, 4, // top (-y, the world is y-down)
        3, 7, 6, 3, 6, 2, // bottom (+y)
    ];

    Mesh::new(positions, indices).with_colors(colors)
}

/// Rescale the valid depth range to a viewable 8-bit image, near surfaces
/// bright. Empty pixels stay black.
fn depth_to_gray(depth: &DepthImage) -> Image<u8> {
    let mut gray = Image::new(depth.width(), depth.height(), 0u8);

    let mut min = u16::MAX;
    let mut max = 0u16;
    for &d in depth.data() {
        if d > 0 {
            min = min.min(d);
            max = max.max(d);
        }
    }
    if max == 0 {
        return gray;
    }
    let range = (max - min).max(1) as f32;

    for y in 0..depth.height() {
        for x in 0..depth.width() {
            let d = depth.get(x, y);
            if d == 0 {
                continue;
            }
            let t = (d - min) as f32 / range;
            gray.set(x, y, 255 - (t * 200.0) as u8);
        }
    }
    gray
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let out_dir = Path::new("out");
    fs::create_dir_all(out_dir)?;

    let cube_center = Vec3::new(0.0, 0.0, 600.0);
    let mesh = colored_cube(cube_center, 200.0);

    let mut renderer = Renderer::new();
    renderer.options.depth_scale = 10.0;
    renderer.set_mesh(Arc::new(mesh));
    renderer.prepare_mesh()?;

    let mut camera = Camera::pinhole_from_fov_y(640, 480, Pose::IDENTITY, 45.0)?;

    // Orbit the cube in the horizontal plane; the first view looks straight
    // down +z from the origin. World y points down in image terms.
    let view_count = 6;
    let radius = 600.0;
    let poses: Vec<Pose> = (0..view_count)
        .map(|i| {
            let angle = i as f32 / view_count as f32 * std::f32::consts::TAU;
            let eye = cube_center + radius * Vec3::new(angle.sin(), 0.0, -angle.cos());
            Pose::look_at(eye, cube_center, Vec3::Y)
        })
        .collect();

    let mut color = ColorImage::new(0, 0, [0, 0, 0]);
    let mut depth = DepthImage::new(0, 0, 0);
    let mut mask = MaskImage::new(0, 0, 0);

    log::info!("rendering {view_count} views of the demo cube");
    for (i, pose) in poses.iter().enumerate() {
        camera.set_pose(*pose);
        renderer.set_camera(Arc::new(camera.clone()));
        renderer.render(&mut color, &mut depth, &mut mask)?;

        color.save_png(out_dir.join(format!("{i:05}_color.png")))?;
        depth.save_png(out_dir.join(format!("{i:05}_depth.png")))?;
        mask.save_png(out_dir.join(format!("{i:05}_mask.png")))?;
        depth_to_gray(&depth).save_png(out_dir.join(format!("{i:05}_depth_gray.png")))?;
    }

    // Same first view again through the raster pipeline
    renderer.set_options(RenderOptions {
        pipeline: RenderPipeline::Raster,
        ..renderer.options
    });
    camera.set_pose(poses[0]);
    renderer.set_camera(Arc::new(camera.clone()));
    renderer.render(&mut color, &mut depth, &mut mask)?;
    color.save_png(out_dir.join("raster_color.png"))?;
    depth_to_gray(&depth).save_png(out_dir.join("raster_depth_gray.png"))?;

    let pose_log = out_dir.join("poses.tum");
    save_tum(&pose_log, &poses)?;
    let loaded = load_tum(&pose_log)?;
    log::info!(
        "wrote {} images and a pose log with {} entries to {}",
        view_count * 4 + 2,
        loaded.len(),
        out_dir.display()
    );

    Ok(())
}
