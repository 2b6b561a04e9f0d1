//! User-facing render parameters and their UI clamping.

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Lowest isovalue accepted from the controls layer.
pub const ISOVALUE_MIN: f32 = 0.01;
/// Highest isovalue accepted from the controls layer.
pub const ISOVALUE_MAX: f32 = 100.0;
/// Smallest marching step accepted from the controls layer.
pub const STEP_SIZE_MIN: f32 = 0.05;
/// Largest marching step accepted from the controls layer.
pub const STEP_SIZE_MAX: f32 = 2.0;

/// Default isovalue.
pub const DEFAULT_ISOVALUE: f32 = 0.5;
/// Default marching step.
pub const DEFAULT_STEP_SIZE: f32 = 0.5;
/// Default surface color, opaque gold.
pub const DEFAULT_COLOR: Vec4 = Vec4::new(0.66, 0.6, 0.05, 1.0);

/// Name under which the step size is exposed to parameter sweeps.
pub const STEP_SIZE_PARAMETER: &str = "StepSize";

/// Isovalue, step size, color and shading toggle.
///
/// Setters clamp to the ranges the controls layer allows; the fields stay
/// public so tests and sweeps can bypass clamping deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    /// Threshold of the rendered level set.
    pub isovalue: f32,
    /// Distance between consecutive samples along a ray.
    pub step_size: f32,
    /// Surface color, including alpha.
    pub color: Vec4,
    /// Use the gradient field as a normal for Blinn-Phong shading.
    pub gradient_shading: bool,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            isovalue: DEFAULT_ISOVALUE,
            step_size: DEFAULT_STEP_SIZE,
            color: DEFAULT_COLOR,
            gradient_shading: false,
        }
    }
}

impl RenderParameters {
    /// Sets the isovalue, clamped to `[ISOVALUE_MIN, ISOVALUE_MAX]`.
    ///
    /// Returns whether the stored value changed. Non-finite input is ignored.
    pub fn set_isovalue(&mut self, isovalue: f32) -> bool {
        let Some(value) = clamp_finite("isovalue", isovalue, ISOVALUE_MIN, ISOVALUE_MAX) else {
            return false;
        };
        replace(&mut self.isovalue, value)
    }

    /// Sets the step size, clamped to `[STEP_SIZE_MIN, STEP_SIZE_MAX]`.
    ///
    /// Returns whether the stored value changed. Non-finite input is ignored.
    pub fn set_step_size(&mut self, step_size: f32) -> bool {
        let Some(value) = clamp_finite("step size", step_size, STEP_SIZE_MIN, STEP_SIZE_MAX) else {
            return false;
        };
        replace(&mut self.step_size, value)
    }

    /// Sets the surface color, each channel clamped to `[0, 1]`.
    pub fn set_color(&mut self, color: Vec4) -> bool {
        let value = color.clamp(Vec4::ZERO, Vec4::ONE);
        if value == self.color {
            return false;
        }
        self.color = value;
        true
    }

    /// Enables or disables gradient shading.
    pub fn set_gradient_shading(&mut self, enabled: bool) -> bool {
        if self.gradient_shading == enabled {
            return false;
        }
        self.gradient_shading = enabled;
        true
    }

    /// Returns a copy with every field passed through its setter.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut out = Self::default();
        out.set_isovalue(self.isovalue);
        out.set_step_size(self.step_size);
        out.set_color(self.color);
        out.gradient_shading = self.gradient_shading;
        out
    }
}

fn clamp_finite(name: &str, value: f32, min: f32, max: f32) -> Option<f32> {
    if value.is_finite() {
        Some(value.clamp(min, max))
    } else {
        log::warn!("ignoring non-finite {name}: {value}");
        None
    }
}

#[allow(clippy::float_cmp)]
fn replace(slot: &mut f32, value: f32) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = RenderParameters::default();
        assert_eq!(params.isovalue, 0.5);
        assert_eq!(params.step_size, 0.5);
        assert_eq!(params.color, Vec4::new(0.66, 0.6, 0.05, 1.0));
        assert!(!params.gradient_shading);
    }

    #[test]
    fn test_step_size_clamped() {
        let mut params = RenderParameters::default();
        assert!(params.set_step_size(3.0));
        assert_eq!(params.step_size, STEP_SIZE_MAX);
        assert!(params.set_step_size(0.0));
        assert_eq!(params.step_size, STEP_SIZE_MIN);
    }

    #[test]
    fn test_isovalue_clamped() {
        let mut params = RenderParameters::default();
        params.set_isovalue(-4.0);
        assert_eq!(params.isovalue, ISOVALUE_MIN);
        params.set_isovalue(1e6);
        assert_eq!(params.isovalue, ISOVALUE_MAX);
    }

    #[test]
    fn test_unchanged_value_reports_no_change() {
        let mut params = RenderParameters::default();
        assert!(!params.set_isovalue(0.5));
        assert!(!params.set_gradient_shading(false));
        assert!(!params.set_color(DEFAULT_COLOR));
    }

    #[test]
    fn test_non_finite_ignored() {
        let mut params = RenderParameters::default();
        assert!(!params.set_step_size(f32::NAN));
        assert!(!params.set_isovalue(f32::INFINITY));
        assert_eq!(params, RenderParameters::default());
    }

    #[test]
    fn test_clamped_copy() {
        let raw = RenderParameters {
            isovalue: 500.0,
            step_size: 3.0,
            color: Vec4::new(2.0, 0.5, -1.0, 1.0),
            gradient_shading: true,
        };
        let clamped = raw.clamped();
        assert_eq!(clamped.isovalue, 100.0);
        assert_eq!(clamped.step_size, 2.0);
        assert_eq!(clamped.color, Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert!(clamped.gradient_shading);
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let params: RenderParameters = serde_json::from_str(r#"{"isovalue": 0.25}"#).unwrap();
        assert_eq!(params.isovalue, 0.25);
        assert_eq!(params.step_size, DEFAULT_STEP_SIZE);
    }
}
