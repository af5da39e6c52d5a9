use crate::{Mat3, Quat, Vec3};

/// A rigid transform: rotation followed by translation.
///
/// The primary use is the camera-to-world pose. The rotation columns are the
/// camera axes expressed in world space: x is image-right, y is image-down,
/// z is the viewing direction. The rotation must be orthonormal; `inverse`
/// relies on it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    pub r: Mat3,
    pub t: Vec3,
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Pose = Pose {
        r: Mat3::IDENTITY,
        t: Vec3::ZERO,
    };

    /// Create a pose from a rotation matrix and a translation.
    pub fn new(r: Mat3, t: Vec3) -> Self {
        Self { r, t }
    }

    /// Create a pose from a unit quaternion and a translation.
    pub fn from_quat(q: Quat, t: Vec3) -> Self {
        Self {
            r: Mat3::from_quat(q),
            t,
        }
    }

    /// The rotation part as a quaternion.
    pub fn rotation_quat(&self) -> Quat {
        Quat::from_mat3(&self.r)
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Pose {
        let r = self.r.transpose();
        Pose { r, t: -(r * self.t) }
    }

    /// Apply the full transform to a point.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.r * p + self.t
    }

    /// Apply only the rotation to a direction vector.
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.r * v
    }

    /// First rotation column (image-right in world space).
    pub fn x_axis(&self) -> Vec3 {
        self.r.x_axis
    }

    /// Second rotation column (image-down in world space).
    pub fn y_axis(&self) -> Vec3 {
        self.r.y_axis
    }

    /// Third rotation column (viewing direction in world space).
    pub fn z_axis(&self) -> Vec3 {
        self.r.z_axis
    }

    /// Build a camera pose at `eye` looking toward `target`.
    ///
    /// `down` gives the approximate image-down direction in world space and
    /// must not be parallel to the viewing direction. With a y-down world
    /// (`down` = +Y) and the target straight ahead on +Z this reproduces the
    /// identity orientation.
    pub fn look_at(eye: Vec3, target: Vec3, down: Vec3) -> Pose {
        let z = (target - eye).normalize();
        let x = down.cross(z).normalize();
        let y = z.cross(x);
        Pose {
            r: Mat3::from_cols(x, y, z),
            t: eye,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Pose::IDENTITY.transform_point(p), p);
        assert_eq!(Pose::IDENTITY.rotate(p), p);
    }

    #[test]
    fn test_inverse_round_trip() {
        let pose = Pose::from_quat(
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1),
            Vec3::new(10.0, -5.0, 2.5),
        );
        let p = Vec3::new(1.0, 2.0, 3.0);
        let q = pose.transform_point(p);
        assert_vec3_near(pose.inverse().transform_point(q), p);

        // Inverse of inverse is the original
        let back = pose.inverse().inverse();
        assert_vec3_near(back.t, pose.t);
        assert_vec3_near(back.rotate(p), pose.rotate(p));
    }

    #[test]
    fn test_axes_are_rotation_columns() {
        let pose = Pose::from_quat(Quat::from_rotation_y(0.5), Vec3::ZERO);
        assert_vec3_near(pose.rotate(Vec3::X), pose.x_axis());
        assert_vec3_near(pose.rotate(Vec3::Y), pose.y_axis());
        assert_vec3_near(pose.rotate(Vec3::Z), pose.z_axis());
    }

    #[test]
    fn test_look_at_straight_ahead_is_identity() {
        let pose = Pose::look_at(Vec3::ZERO, Vec3::new(0.0, 0.0, 600.0), Vec3::Y);
        assert_vec3_near(pose.x_axis(), Vec3::X);
        assert_vec3_near(pose.y_axis(), Vec3::Y);
        assert_vec3_near(pose.z_axis(), Vec3::Z);
        assert_vec3_near(pose.t, Vec3::ZERO);
    }

    #[test]
    fn test_look_at_orthonormal() {
        let eye = Vec3::new(300.0, -200.0, 100.0);
        let target = Vec3::new(0.0, 0.0, 600.0);
        let pose = Pose::look_at(eye, target, Vec3::Y);

        let (x, y, z) = (pose.x_axis(), pose.y_axis(), pose.z_axis());
        assert!(x.dot(y).abs() < 1e-5);
        assert!(y.dot(z).abs() < 1e-5);
        assert!(z.dot(x).abs() < 1e-5);
        // Right-handed basis
        assert!((x.cross(y).dot(z) - 1.0).abs() < 1e-5);
        // Viewing direction points at the target
        assert_vec3_near(z, (target - eye).normalize());
    }

    #[test]
    fn test_quat_round_trip() {
        let q = Quat::from_euler(glam::EulerRot::XYZ, 0.2, 0.4, -0.6);
        let pose = Pose::from_quat(q, Vec3::ZERO);
        let back = pose.rotation_quat();
        // q and -q encode the same rotation
        assert!((back.dot(q).abs() - 1.0).abs() < 1e-5);
    }
}
