//! Orbit camera producing per-frame snapshots.

use glam::{Mat4, Vec3};
use isoray_core::{CameraState, VolumeGrid};

/// A perspective camera orbiting a target point.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Creates a camera with the aspect ratio of a `width` x `height` image.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new(width.max(1) as f32 / height.max(1) as f32)
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Orbits the camera around the target.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let radius = (self.position - self.target).length();
        let mut theta = (self.position.x - self.target.x).atan2(self.position.z - self.target.z);
        let mut phi = ((self.position.y - self.target.y) / radius).acos();

        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Moves toward (positive `delta`) or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        let direction = self.forward();
        let distance = (self.position - self.target).length();
        let new_distance = (distance - delta).max(0.1);
        self.position = self.target - direction * new_distance;
    }

    /// Frames the given bounding box from the +z side.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let size = (max - min).length();

        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, size * 1.5);
        self.near = size * 0.001;
        self.far = size * 100.0;
    }

    /// Frames a volume centered on the world origin.
    pub fn look_at_volume(&mut self, grid: &VolumeGrid) {
        let min = grid.origin();
        self.look_at_box(min, min + grid.extent());
    }

    /// Sets FOV in radians, clamped to a usable range.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.1, std::f32::consts::PI - 0.1);
    }

    /// Returns FOV in degrees.
    #[must_use]
    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    /// Sets FOV from degrees.
    pub fn set_fov_degrees(&mut self, degrees: f32) {
        self.set_fov(degrees.to_radians());
    }

    /// Snapshot consumed by a renderer's `update_frame`.
    #[must_use]
    pub fn state(&self) -> CameraState {
        CameraState {
            eye: self.position,
            look_at: self.view_matrix(),
            projection: self.projection_matrix(),
            fov_y_degrees: self.fov_degrees(),
            aspect_ratio: self.aspect_ratio,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoray_core::UVec3;

    #[test]
    fn test_state_matches_default_snapshot() {
        let state = Camera::default().state();
        let expected = CameraState::default();
        assert!(state.eye.abs_diff_eq(expected.eye, 1e-6));
        assert!(state.look_at.abs_diff_eq(expected.look_at, 1e-6));
        assert!((state.fov_y_degrees - 45.0).abs() < 1e-4);
        assert!((state.tan_half_fov_y() - expected.tan_half_fov_y()).abs() < 1e-6);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::default();
        camera.orbit(0.7, -0.3);
        assert!((camera.position.distance(camera.target) - 3.0).abs() < 1e-4);
    }

    proptest::proptest! {
        #[test]
        fn prop_orbit_stays_on_sphere(dx in -6.0f32..6.0, dy in -3.0f32..3.0) {
            let mut camera = Camera::default();
            camera.orbit(dx, dy);
            proptest::prop_assert!((camera.position.distance(camera.target) - 3.0).abs() < 1e-3);
            proptest::prop_assert!(camera.state().look_at.is_finite());
        }
    }

    #[test]
    fn test_zoom_clamps_distance() {
        let mut camera = Camera::default();
        camera.zoom(1.0);
        assert!((camera.position.distance(camera.target) - 2.0).abs() < 1e-5);
        camera.zoom(100.0);
        assert!((camera.position.distance(camera.target) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_set_fov_clamping() {
        let mut camera = Camera::default();
        camera.set_fov(0.0);
        assert!(camera.fov >= 0.1);
        camera.set_fov_degrees(90.0);
        assert!((camera.fov_degrees() - 90.0).abs() < 0.1);
    }

    #[test]
    fn test_look_at_volume_sees_whole_box() {
        let grid = VolumeGrid::from_fn(UVec3::splat(8), glam::Vec3::splat(0.25), |_, _, _| 0.0).unwrap();
        let mut camera = Camera::for_viewport(640, 480);
        camera.look_at_volume(&grid);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!(camera.position.z > 1.0);
        assert!((camera.aspect_ratio - 4.0 / 3.0).abs() < 1e-6);
    }
}
