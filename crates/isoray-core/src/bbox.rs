//! Ray clipping against the volume's axis-aligned bounding box.

use glam::Vec3;

use crate::ray::Ray;

/// Direction components smaller than this are treated as parallel to a slab.
pub const PARALLEL_EPSILON: f32 = 1e-12;

/// Parametric interval `[t_entry, t_exit]` where a ray is inside the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayInterval {
    /// Never negative: marching does not start behind the eye.
    pub t_entry: f32,
    pub t_exit: f32,
}

impl RayInterval {
    /// Length of the interval.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.t_exit - self.t_entry
    }
}

/// Axis-aligned box `[min, max]` in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl VolumeBox {
    /// Box anchored at `origin` spanning `extent`.
    #[must_use]
    pub fn from_origin_extent(origin: Vec3, extent: Vec3) -> Self {
        Self {
            min: origin,
            max: origin + extent,
        }
    }

    /// Box of size `extent` centered on the world origin.
    #[must_use]
    pub fn centered(extent: Vec3) -> Self {
        Self::from_origin_extent(-0.5 * extent, extent)
    }

    /// Whether `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Intersects `ray` with the box using the slab method.
    ///
    /// Returns `None` when the ray misses or the box lies entirely behind
    /// the origin. The entry parameter is clamped to zero, so a ray that
    /// starts inside the box enters at its origin.
    #[must_use]
    pub fn clip(&self, ray: &Ray) -> Option<RayInterval> {
        let mut t_entry = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < PARALLEL_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let t0 = (lo - o) * inv;
            let t1 = (hi - o) * inv;
            t_entry = t_entry.max(t0.min(t1));
            t_exit = t_exit.min(t0.max(t1));
        }

        if t_exit < t_entry || t_exit < 0.0 {
            return None;
        }
        Some(RayInterval {
            t_entry: t_entry.max(0.0),
            t_exit,
        })
    }
}
