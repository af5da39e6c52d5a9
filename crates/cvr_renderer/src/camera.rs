//! Calibrated camera models with precomputed per-pixel ray tables.
//!
//! A [`Camera`] pairs an image size and a rigid camera-to-world pose with a
//! projection model (pinhole or orthographic). For every pixel it precomputes
//! the ray origin and direction in both the camera frame and the world frame,
//! so the render loops can fetch rays with O(1) table lookups.
//!
//! The camera frame is x image-right, y image-down, z forward; all depths are
//! camera-space z. Pinhole focal lengths and principal points are in pixel
//! units. Fields of view are in degrees.

use cvr_math::{Pose, Vec2, Vec3};
use thiserror::Error;

/// Errors raised by camera construction and mutation.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("image size must be positive, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("focal length must be positive, got ({x}, {y})")]
    InvalidFocalLength { x: f32, y: f32 },

    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),

    #[error("operation requires a pinhole camera")]
    NotPinhole,
}

/// Pinhole intrinsics in pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    pub principal_point: Vec2,
    pub focal_length: Vec2,
}

impl PinholeIntrinsics {
    /// Intrinsics with the principal point at the image center and a square
    /// focal length derived from the vertical field of view.
    pub fn from_fov_y(width: u32, height: u32, fov_y_deg: f32) -> Self {
        let focal = focal_from_fov(height as f32, fov_y_deg);
        Self {
            principal_point: center_principal_point(width, height),
            focal_length: Vec2::splat(focal),
        }
    }
}

/// The projection model of a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Pinhole(PinholeIntrinsics),
    Orthographic,
}

/// A calibrated camera with cached per-pixel ray tables.
///
/// The four tables are kept consistent with the current size, pose and
/// intrinsics: every mutating setter rebuilds all of them before returning,
/// so a discrete accessor never observes stale rays.
#[derive(Debug, Clone)]
pub struct Camera {
    width: u32,
    height: u32,
    pose: Pose,
    w2c: Pose,
    projection: Projection,
    org_ray_c_table: Vec<Vec3>,
    org_ray_w_table: Vec<Vec3>,
    ray_c_table: Vec<Vec3>,
    ray_w_table: Vec<Vec3>,
}

impl Camera {
    /// Create a pinhole camera from explicit intrinsics.
    pub fn pinhole(
        width: u32,
        height: u32,
        pose: Pose,
        intrinsics: PinholeIntrinsics,
    ) -> Result<Self, CameraError> {
        check_intrinsics(&intrinsics)?;
        Self::with_projection(width, height, pose, Projection::Pinhole(intrinsics))
    }

    /// Create a pinhole camera from a vertical field of view in degrees.
    ///
    /// The principal point lands at the image center and both focal length
    /// channels get the same value (square pixels).
    pub fn pinhole_from_fov_y(
        width: u32,
        height: u32,
        pose: Pose,
        fov_y_deg: f32,
    ) -> Result<Self, CameraError> {
        check_fov(fov_y_deg)?;
        let intrinsics = PinholeIntrinsics::from_fov_y(width, height, fov_y_deg);
        Self::with_projection(width, height, pose, Projection::Pinhole(intrinsics))
    }

    /// Create an orthographic camera.
    ///
    /// Pixel rays are parallel to the viewing axis, offset from the pose
    /// translation in the image plane.
    pub fn orthographic(width: u32, height: u32, pose: Pose) -> Result<Self, CameraError> {
        Self::with_projection(width, height, pose, Projection::Orthographic)
    }

    fn with_projection(
        width: u32,
        height: u32,
        pose: Pose,
        projection: Projection,
    ) -> Result<Self, CameraError> {
        check_size(width, height)?;
        let mut camera = Self {
            width,
            height,
            pose,
            w2c: pose.inverse(),
            projection,
            org_ray_c_table: Vec::new(),
            org_ray_w_table: Vec::new(),
            ray_c_table: Vec::new(),
            ray_w_table: Vec::new(),
        };
        camera.rebuild_ray_tables();
        Ok(camera)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The camera-to-world pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The world-to-camera transform (inverse pose).
    pub fn w2c(&self) -> Pose {
        self.w2c
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Pinhole principal point, if this is a pinhole camera.
    pub fn principal_point(&self) -> Option<Vec2> {
        match self.projection {
            Projection::Pinhole(intr) => Some(intr.principal_point),
            Projection::Orthographic => None,
        }
    }

    /// Pinhole focal length, if this is a pinhole camera.
    pub fn focal_length(&self) -> Option<Vec2> {
        match self.projection {
            Projection::Pinhole(intr) => Some(intr.focal_length),
            Projection::Orthographic => None,
        }
    }

    /// Horizontal field of view in degrees, if this is a pinhole camera.
    pub fn fov_x(&self) -> Option<f32> {
        self.focal_length()
            .map(|f| fov_from_focal(self.width as f32, f.x))
    }

    /// Vertical field of view in degrees, if this is a pinhole camera.
    pub fn fov_y(&self) -> Option<f32> {
        self.focal_length()
            .map(|f| fov_from_focal(self.height as f32, f.y))
    }

    /// Resize the image and rebuild the ray tables.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), CameraError> {
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        self.rebuild_ray_tables();
        Ok(())
    }

    /// Replace the camera-to-world pose and rebuild the ray tables.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.w2c = pose.inverse();
        self.rebuild_ray_tables();
    }

    /// Replace the pinhole intrinsics and rebuild the ray tables.
    pub fn set_intrinsics(&mut self, intrinsics: PinholeIntrinsics) -> Result<(), CameraError> {
        check_intrinsics(&intrinsics)?;
        match &mut self.projection {
            Projection::Pinhole(intr) => *intr = intrinsics,
            Projection::Orthographic => return Err(CameraError::NotPinhole),
        }
        self.rebuild_ray_tables();
        Ok(())
    }

    /// Set both focal length channels from a horizontal field of view in
    /// degrees and rebuild the ray tables.
    pub fn set_fov_x(&mut self, fov_x_deg: f32) -> Result<(), CameraError> {
        check_fov(fov_x_deg)?;
        let focal = focal_from_fov(self.width as f32, fov_x_deg);
        self.set_focal_length(Vec2::splat(focal))
    }

    /// Set both focal length channels from a vertical field of view in
    /// degrees and rebuild the ray tables.
    pub fn set_fov_y(&mut self, fov_y_deg: f32) -> Result<(), CameraError> {
        check_fov(fov_y_deg)?;
        let focal = focal_from_fov(self.height as f32, fov_y_deg);
        self.set_focal_length(Vec2::splat(focal))
    }

    fn set_focal_length(&mut self, focal_length: Vec2) -> Result<(), CameraError> {
        match &mut self.projection {
            Projection::Pinhole(intr) => intr.focal_length = focal_length,
            Projection::Orthographic => return Err(CameraError::NotPinhole),
        }
        self.rebuild_ray_tables();
        Ok(())
    }

    /// Project a camera-space point to image coordinates, returning the
    /// camera-space depth alongside.
    ///
    /// For the pinhole model this is only valid for z > 0; the caller guards
    /// against points at or behind the camera plane.
    pub fn project(&self, camera_p: Vec3) -> (Vec2, f32) {
        match self.projection {
            Projection::Pinhole(intr) => {
                let image_p =
                    intr.focal_length * camera_p.truncate() / camera_p.z + intr.principal_point;
                (image_p, camera_p.z)
            }
            Projection::Orthographic => (camera_p.truncate(), camera_p.z),
        }
    }

    /// Recover the camera-space point for an image coordinate and depth.
    pub fn unproject(&self, image_p: Vec2, depth: f32) -> Vec3 {
        match self.projection {
            Projection::Pinhole(intr) => {
                let xy = (image_p - intr.principal_point) * depth / intr.focal_length;
                xy.extend(depth)
            }
            Projection::Orthographic => image_p.extend(depth),
        }
    }

    /// Ray origin in the camera frame at a continuous pixel position.
    pub fn org_ray_c(&self, x: f32, y: f32) -> Vec3 {
        match self.projection {
            Projection::Pinhole(_) => Vec3::ZERO,
            Projection::Orthographic => Vec3::new(
                x - self.width as f32 * 0.5,
                y - self.height as f32 * 0.5,
                0.0,
            ),
        }
    }

    /// Ray origin in the world frame at a continuous pixel position.
    pub fn org_ray_w(&self, x: f32, y: f32) -> Vec3 {
        match self.projection {
            Projection::Pinhole(_) => self.pose.t,
            Projection::Orthographic => {
                self.pose.t
                    + (x - self.width as f32 * 0.5) * self.pose.x_axis()
                    + (y - self.height as f32 * 0.5) * self.pose.y_axis()
            }
        }
    }

    /// Unit ray direction in the camera frame at a continuous pixel position.
    pub fn ray_c(&self, x: f32, y: f32) -> Vec3 {
        match self.projection {
            Projection::Pinhole(intr) => Vec3::new(
                (x - intr.principal_point.x) / intr.focal_length.x,
                (y - intr.principal_point.y) / intr.focal_length.y,
                1.0,
            )
            .normalize(),
            Projection::Orthographic => Vec3::Z,
        }
    }

    /// Unit ray direction in the world frame at a continuous pixel position.
    pub fn ray_w(&self, x: f32, y: f32) -> Vec3 {
        match self.projection {
            Projection::Pinhole(_) => self.pose.rotate(self.ray_c(x, y)),
            Projection::Orthographic => self.pose.z_axis(),
        }
    }

    /// Table lookup of the camera-frame ray origin at an integer pixel.
    pub fn org_ray_c_at(&self, x: u32, y: u32) -> Vec3 {
        self.org_ray_c_table[(y * self.width + x) as usize]
    }

    /// Table lookup of the world-frame ray origin at an integer pixel.
    pub fn org_ray_w_at(&self, x: u32, y: u32) -> Vec3 {
        self.org_ray_w_table[(y * self.width + x) as usize]
    }

    /// Table lookup of the camera-frame ray direction at an integer pixel.
    pub fn ray_c_at(&self, x: u32, y: u32) -> Vec3 {
        self.ray_c_table[(y * self.width + x) as usize]
    }

    /// Table lookup of the world-frame ray direction at an integer pixel.
    pub fn ray_w_at(&self, x: u32, y: u32) -> Vec3 {
        self.ray_w_table[(y * self.width + x) as usize]
    }

    /// Recompute all four ray tables from the continuous accessors.
    fn rebuild_ray_tables(&mut self) {
        let len = (self.width * self.height) as usize;
        let mut org_c = Vec::with_capacity(len);
        let mut org_w = Vec::with_capacity(len);
        let mut dir_c = Vec::with_capacity(len);
        let mut dir_w = Vec::with_capacity(len);

        for y in 0..self.height {
            for x in 0..self.width {
                let (fx, fy) = (x as f32, y as f32);
                org_c.push(self.org_ray_c(fx, fy));
                org_w.push(self.org_ray_w(fx, fy));
                dir_c.push(self.ray_c(fx, fy));
                dir_w.push(self.ray_w(fx, fy));
            }
        }

        self.org_ray_c_table = org_c;
        self.org_ray_w_table = org_w;
        self.ray_c_table = dir_c;
        self.ray_w_table = dir_w;
    }
}

/// Principal point for an image with the optical axis through its center.
fn center_principal_point(width: u32, height: u32) -> Vec2 {
    Vec2::new(width as f32 * 0.5 - 0.5, height as f32 * 0.5 - 0.5)
}

/// Focal length in pixels for a field of view (degrees) across `extent` pixels.
fn focal_from_fov(extent: f32, fov_deg: f32) -> f32 {
    extent * 0.5 / (fov_deg.to_radians() * 0.5).tan()
}

/// Field of view in degrees across `extent` pixels for a focal length.
fn fov_from_focal(extent: f32, focal: f32) -> f32 {
    (2.0 * (extent * 0.5 / focal).atan()).to_degrees()
}

fn check_size(width: u32, height: u32) -> Result<(), CameraError> {
    if width == 0 || height == 0 {
        return Err(CameraError::InvalidSize { width, height });
    }
    Ok(())
}

fn check_intrinsics(intrinsics: &PinholeIntrinsics) -> Result<(), CameraError> {
    let f = intrinsics.focal_length;
    if f.x <= 0.0 || f.y <= 0.0 {
        return Err(CameraError::InvalidFocalLength { x: f.x, y: f.y });
    }
    Ok(())
}

fn check_fov(fov_deg: f32) -> Result<(), CameraError> {
    if fov_deg <= 0.0 || fov_deg >= 180.0 {
        return Err(CameraError::InvalidFov(fov_deg));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvr_math::Quat;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    fn test_pinhole() -> Camera {
        Camera::pinhole_from_fov_y(8, 6, Pose::IDENTITY, 45.0).unwrap()
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(matches!(
            Camera::pinhole_from_fov_y(0, 6, Pose::IDENTITY, 45.0),
            Err(CameraError::InvalidSize { .. })
        ));
        assert!(matches!(
            Camera::pinhole_from_fov_y(8, 6, Pose::IDENTITY, 180.0),
            Err(CameraError::InvalidFov(_))
        ));
        let bad = PinholeIntrinsics {
            principal_point: Vec2::new(3.5, 2.5),
            focal_length: Vec2::new(-1.0, 10.0),
        };
        assert!(matches!(
            Camera::pinhole(8, 6, Pose::IDENTITY, bad),
            Err(CameraError::InvalidFocalLength { .. })
        ));

        let mut ortho = Camera::orthographic(8, 6, Pose::IDENTITY).unwrap();
        assert!(matches!(
            ortho.set_fov_y(45.0),
            Err(CameraError::NotPinhole)
        ));
    }

    #[test]
    fn test_principal_point_centered() {
        let camera = test_pinhole();
        let pp = camera.principal_point().unwrap();
        assert!((pp.x - 3.5).abs() < 1e-6);
        assert!((pp.y - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_fov_focal_round_trip() {
        let camera = test_pinhole();
        assert!((camera.fov_y().unwrap() - 45.0).abs() < 1e-4);

        // Square focal channels: fov_x follows from the aspect ratio
        let f = camera.focal_length().unwrap();
        assert_eq!(f.x, f.y);
        let expected_fov_x = (2.0 * (4.0 / f.x).atan()).to_degrees();
        assert!((camera.fov_x().unwrap() - expected_fov_x).abs() < 1e-4);
    }

    #[test]
    fn test_project_unproject_round_trip() {
        let camera = test_pinhole();
        let points = [
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(1.5, -2.0, 35.0),
            Vec3::new(-0.4, 0.9, 3.0),
        ];

        for p in points {
            let (image_p, depth) = camera.project(p);
            assert!((depth - p.z).abs() < 1e-5);
            assert_vec3_near(camera.unproject(image_p, depth), p);
        }
    }

    #[test]
    fn test_ortho_project_is_identity_on_xy() {
        let camera = Camera::orthographic(8, 6, Pose::IDENTITY).unwrap();
        let p = Vec3::new(1.5, -2.0, 35.0);

        let (image_p, depth) = camera.project(p);
        assert_eq!(image_p, Vec2::new(1.5, -2.0));
        assert_eq!(depth, 35.0);
        assert_vec3_near(camera.unproject(image_p, depth), p);
    }

    #[test]
    fn test_pinhole_rays() {
        let camera = test_pinhole();
        let pp = camera.principal_point().unwrap();
        let f = camera.focal_length().unwrap();

        // All origins collapse to the camera position
        assert_eq!(camera.org_ray_c_at(0, 0), Vec3::ZERO);
        assert_eq!(camera.org_ray_w_at(7, 5), Vec3::ZERO);

        // Center pixel looks straight down the optical axis
        let center = camera.ray_c(pp.x, pp.y);
        assert_vec3_near(center, Vec3::Z);

        // Off-center pixel direction matches the normalized pinhole formula
        let dir = camera.ray_c_at(6, 1);
        let expected =
            Vec3::new((6.0 - pp.x) / f.x, (1.0 - pp.y) / f.y, 1.0).normalize();
        assert_vec3_near(dir, expected);
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_discrete_matches_continuous() {
        let pose = Pose::from_quat(Quat::from_rotation_y(0.7), Vec3::new(5.0, -1.0, 2.0));
        let camera = Camera::pinhole_from_fov_y(8, 6, pose, 60.0).unwrap();

        for (x, y) in [(0u32, 0u32), (3, 4), (7, 5)] {
            assert_vec3_near(camera.ray_w_at(x, y), camera.ray_w(x as f32, y as f32));
            assert_vec3_near(
                camera.org_ray_w_at(x, y),
                camera.org_ray_w(x as f32, y as f32),
            );
        }
    }

    #[test]
    fn test_world_rays_follow_pose() {
        let pose = Pose::from_quat(Quat::from_rotation_y(0.7), Vec3::new(5.0, -1.0, 2.0));
        let camera = Camera::pinhole_from_fov_y(8, 6, pose, 60.0).unwrap();

        assert_vec3_near(camera.org_ray_w_at(2, 3), pose.t);
        assert_vec3_near(
            camera.ray_w_at(2, 3),
            pose.rotate(camera.ray_c_at(2, 3)),
        );
    }

    #[test]
    fn test_ortho_rays_parallel_with_offset_origins() {
        let camera = Camera::orthographic(4, 4, Pose::IDENTITY).unwrap();

        // Parallel directions everywhere
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(camera.ray_w_at(x, y), Vec3::Z);
            }
        }

        // Origins offset in the image plane around the pose translation
        assert_eq!(camera.org_ray_w_at(0, 0), Vec3::new(-2.0, -2.0, 0.0));
        assert_eq!(camera.org_ray_w_at(3, 1), Vec3::new(1.0, -1.0, 0.0));

        // A rotated pose offsets along its own axes
        let pose = Pose::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), Vec3::ZERO);
        let rotated = Camera::orthographic(4, 4, pose).unwrap();
        let expected = pose.t + (-2.0) * pose.x_axis() + (-2.0) * pose.y_axis();
        assert_vec3_near(rotated.org_ray_w_at(0, 0), expected);
        assert_vec3_near(rotated.ray_w_at(2, 2), pose.z_axis());
    }

    #[test]
    fn test_resize_rebuilds_tables() {
        let mut camera = test_pinhole();
        assert_eq!(camera.ray_w_table.len(), 48);

        camera.set_size(10, 4).unwrap();
        assert_eq!(camera.org_ray_c_table.len(), 40);
        assert_eq!(camera.org_ray_w_table.len(), 40);
        assert_eq!(camera.ray_c_table.len(), 40);
        assert_eq!(camera.ray_w_table.len(), 40);

        // A pose change after the resize keeps the new size
        camera.set_pose(Pose::from_quat(Quat::from_rotation_x(0.3), Vec3::X));
        assert_eq!(camera.ray_w_table.len(), 40);
        // Lookup at the far corner of the new size stays in range
        let _ = camera.ray_w_at(9, 3);
    }

    #[test]
    fn test_set_intrinsics_rebuilds_tables() {
        let mut camera = test_pinhole();
        let intrinsics = PinholeIntrinsics {
            principal_point: Vec2::new(4.0, 2.0),
            focal_length: Vec2::splat(10.0),
        };
        camera.set_intrinsics(intrinsics).unwrap();

        assert_eq!(camera.principal_point().unwrap(), Vec2::new(4.0, 2.0));
        assert_eq!(camera.focal_length().unwrap(), Vec2::splat(10.0));
        // The table entry under the new principal point is the optical axis
        assert_vec3_near(camera.ray_c_at(4, 2), Vec3::Z);

        let mut ortho = Camera::orthographic(8, 6, Pose::IDENTITY).unwrap();
        assert!(matches!(
            ortho.set_intrinsics(intrinsics),
            Err(CameraError::NotPinhole)
        ));
    }

    #[test]
    fn test_set_fov_updates_focal() {
        let mut camera = test_pinhole();
        camera.set_fov_y(90.0).unwrap();

        // tan(45 deg) = 1, so focal = height/2
        let f = camera.focal_length().unwrap();
        assert!((f.y - 3.0).abs() < 1e-5);
        assert_eq!(f.x, f.y);
        assert!((camera.fov_y().unwrap() - 90.0).abs() < 1e-4);

        // Principal point untouched
        let pp = camera.principal_point().unwrap();
        assert!((pp.x - 3.5).abs() < 1e-6);
    }
}
