//! First-hit isosurface search along a clipped ray.

use glam::Vec3;

use crate::bbox::RayInterval;
use crate::ray::Ray;

/// The first isosurface crossing found along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoHit {
    /// Refined ray parameter of the crossing.
    pub t: f32,
    /// World-space position of the crossing.
    pub position: Vec3,
}

/// Marches `ray` over `interval` in increments of `step_size` and returns the
/// first crossing of `isovalue`.
///
/// Samples are taken at the entry, every `step_size` after it, and at the exit
/// so the tail of the interval is never skipped. A crossing is a sign change of
/// `sample - isovalue` between consecutive samples; the hit is placed by linear
/// interpolation between those two samples.
///
/// A non-positive or non-finite step size yields no hit.
pub fn march_isosurface<F>(
    ray: &Ray,
    interval: RayInterval,
    step_size: f32,
    isovalue: f32,
    sample: F,
) -> Option<IsoHit>
where
    F: Fn(Vec3) -> f32,
{
    if !step_size.is_finite() || step_size <= 0.0 {
        return None;
    }

    let mut t_prev = interval.t_entry;
    let mut v_prev = sample(ray.at(t_prev));

    while t_prev < interval.t_exit {
        let t = (t_prev + step_size).min(interval.t_exit);
        if t <= t_prev {
            // Step too small to advance at this magnitude of t.
            break;
        }
        let v = sample(ray.at(t));

        if (v_prev >= isovalue) != (v >= isovalue) {
            let fraction = (isovalue - v_prev) / (v - v_prev);
            let t_hit = t_prev + fraction * (t - t_prev);
            return Some(IsoHit {
                t: t_hit,
                position: ray.at(t_hit),
            });
        }

        t_prev = t;
        v_prev = v;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn x_ray() -> Ray {
        Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        }
    }

    fn interval(t_entry: f32, t_exit: f32) -> RayInterval {
        RayInterval { t_entry, t_exit }
    }

    #[test]
    fn test_linear_ramp_hit_is_exact() {
        // Linear field: interpolation recovers the root exactly.
        let hit = march_isosurface(&x_ray(), interval(0.0, 1.0), 0.1, 0.5, |p| p.x).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!(hit.position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_descending_crossing_detected() {
        let hit = march_isosurface(&x_ray(), interval(0.0, 2.0), 0.3, 0.25, |p| 1.0 - p.x).unwrap();
        assert!((hit.t - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_constant_field_misses() {
        assert!(march_isosurface(&x_ray(), interval(0.0, 10.0), 0.1, 0.5, |_| 0.3).is_none());
    }

    #[test]
    fn test_crossing_in_tail_is_found() {
        // Exit at 1.05 with step 0.5: the last sample is clamped to the exit.
        let hit = march_isosurface(&x_ray(), interval(0.0, 1.05), 0.5, 1.02, |p| p.x).unwrap();
        assert!((hit.t - 1.02).abs() < 1e-5);
    }

    #[test]
    fn test_first_of_two_crossings_wins() {
        // Bump between 1 and 3: crosses up at 1.5, down at 2.5.
        let bump = |p: Vec3| if (1.5..2.5).contains(&p.x) { 1.0 } else { 0.0 };
        let hit = march_isosurface(&x_ray(), interval(0.0, 4.0), 0.25, 0.5, bump).unwrap();
        assert!(hit.t > 1.25 && hit.t <= 1.5);
    }

    #[test]
    fn test_entry_offset_respected() {
        let hit = march_isosurface(&x_ray(), interval(2.0, 6.0), 0.5, 4.2, |p| p.x).unwrap();
        assert!((hit.t - 4.2).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_step_size() {
        assert!(march_isosurface(&x_ray(), interval(0.0, 1.0), 0.0, 0.5, |p| p.x).is_none());
        assert!(march_isosurface(&x_ray(), interval(0.0, 1.0), -0.1, 0.5, |p| p.x).is_none());
        assert!(march_isosurface(&x_ray(), interval(0.0, 1.0), f32::NAN, 0.5, |p| p.x).is_none());
    }

    #[test]
    fn test_empty_interval_misses() {
        assert!(march_isosurface(&x_ray(), interval(1.0, 1.0), 0.1, 0.5, |p| p.x).is_none());
    }

    proptest! {
        #[test]
        fn prop_monotone_transition_found_within_one_step(
            root in 0.5f32..9.5,
            sharpness in 0.5f32..20.0,
            step in 0.05f32..2.0,
        ) {
            // Smooth monotone transition through 0.5 at `root`.
            let field = |p: Vec3| 1.0 / (1.0 + (-(p.x - root) * sharpness).exp());
            let hit = march_isosurface(&x_ray(), interval(0.0, 10.0), step, 0.5, field);
            prop_assert!(hit.is_some());
            prop_assert!((hit.unwrap().t - root).abs() <= step);
        }

        #[test]
        fn prop_no_crossing_means_miss(
            level in -5.0f32..5.0,
            offset in 0.01f32..5.0,
            step in 0.05f32..2.0,
        ) {
            // Field stays strictly below the isovalue everywhere.
            let iso = level + offset;
            let field = |p: Vec3| level - 0.1 * p.x.sin().abs();
            prop_assert!(march_isosurface(&x_ray(), interval(0.0, 10.0), step, iso, field).is_none());
        }
    }
}
