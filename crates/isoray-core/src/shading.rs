//! Local illumination of isosurface hits.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Value written for pixels with no isosurface hit.
pub const BACKGROUND: Vec4 = Vec4::ZERO;

/// Gradients shorter than this cannot provide a normal.
pub const DEGENERATE_GRADIENT_EPSILON: f32 = 1e-6;

/// Blinn-Phong coefficients and light placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    /// Ambient coefficient.
    pub ambient: f32,
    /// Diffuse coefficient.
    pub diffuse: f32,
    /// Specular coefficient.
    pub specular: f32,
    /// Specular exponent.
    pub shininess: f32,
    /// Specular light color/intensity.
    pub specular_intensity: Vec3,
    /// Light position in world space.
    pub light_position: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.5,
            diffuse: 0.5,
            specular: 0.8,
            shininess: 50.0,
            specular_intensity: Vec3::ONE,
            light_position: Vec3::new(0.0, 0.0, 1000.0),
        }
    }
}

/// Shades a surface hit.
///
/// With `gradient` set, applies two-sided Blinn-Phong using the normalized
/// gradient as the surface normal. Without one, or when the gradient is
/// degenerate, returns the base color unlit. The result is clamped to `[0, 1]`.
#[must_use]
pub fn shade(
    position: Vec3,
    gradient: Option<Vec3>,
    base_color: Vec4,
    lighting: &LightingConfig,
    eye: Vec3,
) -> Vec4 {
    let flat = base_color.clamp(Vec4::ZERO, Vec4::ONE);
    let Some(gradient) = gradient else {
        return flat;
    };
    let length = gradient.length();
    if length.is_nan() || length < DEGENERATE_GRADIENT_EPSILON {
        return flat;
    }

    let view = (eye - position).normalize_or_zero();
    let mut normal = gradient / length;
    if normal.dot(view) < 0.0 {
        normal = -normal;
    }
    let light = (lighting.light_position - position).normalize_or_zero();
    let half = (light + view).normalize_or_zero();

    let diffuse = lighting.diffuse * normal.dot(light).max(0.0);
    let specular = lighting.specular * normal.dot(half).max(0.0).powf(lighting.shininess);
    let rgb = base_color.truncate() * (lighting.ambient + diffuse)
        + lighting.specular_intensity * specular;

    rgb.extend(base_color.w).clamp(Vec4::ZERO, Vec4::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD: Vec4 = Vec4::new(0.66, 0.6, 0.05, 1.0);

    #[test]
    fn test_flat_without_gradient() {
        let lighting = LightingConfig {
            ambient: 3.0,
            diffuse: 9.0,
            ..LightingConfig::default()
        };
        let color = shade(Vec3::ZERO, None, GOLD, &lighting, Vec3::Z);
        assert_eq!(color, GOLD);
    }

    #[test]
    fn test_degenerate_gradient_is_flat() {
        let color = shade(Vec3::ZERO, Some(Vec3::ZERO), GOLD, &LightingConfig::default(), Vec3::Z);
        assert_eq!(color, GOLD);
    }

    #[test]
    fn test_headlight_facing_surface() {
        let lighting = LightingConfig {
            ambient: 0.2,
            diffuse: 0.6,
            specular: 0.0,
            shininess: 1.0,
            specular_intensity: Vec3::ONE,
            light_position: Vec3::new(0.0, 0.0, 10.0),
        };
        let color = shade(Vec3::ZERO, Some(Vec3::Z), Vec4::ONE, &lighting, Vec3::new(0.0, 0.0, 5.0));
        assert!((color.x - 0.8).abs() < 1e-5);
        assert_eq!(color.w, 1.0);
    }

    #[test]
    fn test_two_sided_normal() {
        let lighting = LightingConfig::default();
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let front = shade(Vec3::ZERO, Some(Vec3::Z), GOLD, &lighting, eye);
        let back = shade(Vec3::ZERO, Some(Vec3::NEG_Z), GOLD, &lighting, eye);
        assert!(front.abs_diff_eq(back, 1e-6));
    }

    #[test]
    fn test_output_is_clamped_and_keeps_alpha() {
        let lighting = LightingConfig {
            ambient: 5.0,
            ..LightingConfig::default()
        };
        let base = Vec4::new(0.5, 0.5, 0.5, 0.25);
        let color = shade(Vec3::ZERO, Some(Vec3::Z), base, &lighting, Vec3::Z * 3.0);
        assert_eq!(color, Vec4::new(1.0, 1.0, 1.0, 0.25));
    }
}
