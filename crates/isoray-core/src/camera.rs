//! Per-frame camera snapshot consumed by the ray generator.

use glam::{Mat4, Vec3};

/// Camera quantities needed to build primary rays for one frame.
///
/// Supplied fresh every frame. Renderers copy what they need into their
/// frame configuration and never hold on to this value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Eye position in world space.
    pub eye: Vec3,
    /// World-to-view transform.
    pub look_at: Mat4,
    /// View-to-clip transform.
    pub projection: Mat4,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Width over height.
    pub aspect_ratio: f32,
}

impl CameraState {
    /// Builds a right-handed perspective snapshot looking from `eye` at `target`.
    #[must_use]
    pub fn looking_at(eye: Vec3, target: Vec3, up: Vec3, fov_y_degrees: f32, aspect_ratio: f32) -> Self {
        Self {
            eye,
            look_at: Mat4::look_at_rh(eye, target, up),
            projection: Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect_ratio, 0.01, 1000.0),
            fov_y_degrees,
            aspect_ratio,
        }
    }

    /// `tan(fov_y / 2)`, the half-height of the image plane at unit distance.
    #[must_use]
    pub fn tan_half_fov_y(&self) -> f32 {
        (self.fov_y_degrees.to_radians() * 0.5).tan()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::looking_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tan_half_fov() {
        let camera = CameraState::looking_at(Vec3::Z, Vec3::ZERO, Vec3::Y, 90.0, 1.0);
        assert!((camera.tan_half_fov_y() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let camera = CameraState::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0);
        let eye_in_view = camera.look_at.transform_point3(camera.eye);
        assert!(eye_in_view.length() < 1e-5);
    }
}
