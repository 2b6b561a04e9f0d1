//! Primary ray construction.

use glam::{Mat3, Mat4, UVec2, Vec3};

use crate::camera::CameraState;

/// A ray `origin + t * direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    /// Point at parameter `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Builds one world-space ray per output pixel from the camera basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayGenerator {
    eye: Vec3,
    view_to_world: Mat3,
    tan_half_fov_y: f32,
    aspect_ratio: f32,
}

impl RayGenerator {
    /// Creates a generator from the raw camera quantities.
    #[must_use]
    pub fn new(eye: Vec3, look_at: Mat4, tan_half_fov_y: f32, aspect_ratio: f32) -> Self {
        Self {
            eye,
            // Rotation part of a look-at matrix is orthonormal.
            view_to_world: Mat3::from_mat4(look_at).transpose(),
            tan_half_fov_y,
            aspect_ratio,
        }
    }

    /// Creates a generator from a camera snapshot.
    #[must_use]
    pub fn from_camera(camera: &CameraState) -> Self {
        Self::new(
            camera.eye,
            camera.look_at,
            camera.tan_half_fov_y(),
            camera.aspect_ratio,
        )
    }

    /// Ray through the center of `pixel` in an image of `extent` pixels.
    ///
    /// Row 0 is the top of the image.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ray(&self, pixel: UVec2, extent: UVec2) -> Ray {
        let ndc_x = (pixel.x as f32 + 0.5) / extent.x as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (pixel.y as f32 + 0.5) / extent.y as f32 * 2.0;
        let view_dir = Vec3::new(
            ndc_x * self.tan_half_fov_y * self.aspect_ratio,
            ndc_y * self.tan_half_fov_y,
            -1.0,
        );
        Ray {
            origin: self.eye,
            direction: (self.view_to_world * view_dir).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(eye: Vec3, target: Vec3) -> RayGenerator {
        RayGenerator::from_camera(&CameraState::looking_at(eye, target, Vec3::Y, 90.0, 2.0))
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let eye = Vec3::new(3.0, 1.0, -2.0);
        let generator = generator(eye, Vec3::ZERO);
        // Odd extent so one pixel center sits on the optical axis.
        let ray = generator.ray(UVec2::new(1, 1), UVec2::new(3, 3));
        let expected = (-eye).normalize();
        assert!(ray.direction.abs_diff_eq(expected, 1e-5));
        assert_eq!(ray.origin, eye);
    }

    #[test]
    fn test_corner_rays_span_fov_and_aspect() {
        let generator = generator(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let extent = UVec2::new(2, 2);
        let top_left = generator.ray(UVec2::new(0, 0), extent).direction;
        let bottom_right = generator.ray(UVec2::new(1, 1), extent).direction;

        // Pixel centers sit at ndc +-0.5; tan(45deg) = 1, aspect = 2.
        let expected_top_left = Vec3::new(-1.0, 0.5, -1.0).normalize();
        assert!(top_left.abs_diff_eq(expected_top_left, 1e-5));
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
    }

    #[test]
    fn test_directions_are_normalized() {
        let generator = generator(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 0.0, 0.0));
        let extent = UVec2::new(7, 5);
        for y in 0..extent.y {
            for x in 0..extent.x {
                let d = generator.ray(UVec2::new(x, y), extent).direction;
                assert!((d.length() - 1.0).abs() < 1e-5);
            }
        }
    }
}
