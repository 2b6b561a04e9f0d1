//! Structured scalar volumes and their gradient fields.
//!
//! Values are stored x-fastest: the value for node (i, j, k) lives at
//! `i + j * nx + k * nx * ny`. Sampling uses normalized texture coordinates
//! in `[0, 1]^3` with trilinear interpolation between texel centers and
//! clamp-to-edge addressing, matching the GPU sampler in `isoray-render`.

use std::ops::{Add, Mul};
use std::sync::Arc;

use glam::{UVec3, Vec3};

use crate::error::{IsorayError, Result};

/// A structured grid of scalar values with physical voxel spacing.
#[derive(Debug, Clone)]
pub struct VolumeGrid {
    resolution: UVec3,
    voxel_size: Vec3,
    values: Vec<f32>,
}

impl VolumeGrid {
    /// Creates a grid from x-fastest values.
    pub fn new(resolution: UVec3, voxel_size: Vec3, values: Vec<f32>) -> Result<Self> {
        check_resolution(resolution)?;
        let expected = node_count(resolution);
        if values.len() != expected {
            return Err(IsorayError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            resolution,
            voxel_size,
            values,
        })
    }

    /// Creates a grid by evaluating `f(i, j, k)` at every node.
    pub fn from_fn(
        resolution: UVec3,
        voxel_size: Vec3,
        mut f: impl FnMut(u32, u32, u32) -> f32,
    ) -> Result<Self> {
        check_resolution(resolution)?;
        let mut values = Vec::with_capacity(node_count(resolution));
        for k in 0..resolution.z {
            for j in 0..resolution.y {
                for i in 0..resolution.x {
                    values.push(f(i, j, k));
                }
            }
        }
        Self::new(resolution, voxel_size, values)
    }

    /// Number of nodes along each axis.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Physical size of one voxel.
    #[must_use]
    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    /// Physical extent of the volume box (`resolution * voxel_size`).
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.resolution.as_vec3() * self.voxel_size
    }

    /// World-space minimum corner. Volumes are centered on the world origin.
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        -0.5 * self.extent()
    }

    /// Raw values, x-fastest.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at a node index, clamped to the grid.
    #[must_use]
    pub fn value(&self, i: u32, j: u32, k: u32) -> f32 {
        self.values[linear_index(self.resolution, i, j, k)]
    }

    /// Minimum and maximum finite value, or `(0, 1)` for an all-NaN grid.
    #[must_use]
    pub fn value_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.values {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min > max {
            (0.0, 1.0)
        } else {
            (min, max)
        }
    }

    /// Samples the field at normalized texture coordinates.
    #[must_use]
    pub fn sample(&self, tex: Vec3) -> f32 {
        trilinear(self.resolution, tex, |i, j, k| self.value(i, j, k))
    }

    /// Converts a world-space position to normalized texture coordinates.
    #[must_use]
    pub fn world_to_tex(&self, position: Vec3) -> Vec3 {
        (position - self.origin()) / self.extent()
    }

    /// Samples the field at a world-space position.
    #[must_use]
    pub fn sample_world(&self, position: Vec3) -> f32 {
        self.sample(self.world_to_tex(position))
    }
}

/// A 3-D vector field aligned node-for-node with a [`VolumeGrid`].
#[derive(Debug, Clone)]
pub struct GradientField {
    resolution: UVec3,
    vectors: Vec<Vec3>,
}

impl GradientField {
    /// Creates a gradient field from x-fastest vectors.
    pub fn new(resolution: UVec3, vectors: Vec<Vec3>) -> Result<Self> {
        check_resolution(resolution)?;
        let expected = node_count(resolution);
        if vectors.len() != expected {
            return Err(IsorayError::SizeMismatch {
                expected,
                actual: vectors.len(),
            });
        }
        Ok(Self {
            resolution,
            vectors,
        })
    }

    /// Estimates the gradient of `grid` in world units.
    ///
    /// Central differences inside, one-sided differences on the boundary.
    /// A single-node axis has zero derivative.
    #[must_use]
    pub fn from_central_differences(grid: &VolumeGrid) -> Self {
        let res = grid.resolution();
        let h = grid.voxel_size();
        let derivative = |lo: u32, hi: u32, a: f32, b: f32, spacing: f32| -> f32 {
            if hi == lo {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let span = (hi - lo) as f32 * spacing;
                (b - a) / span
            }
        };

        let mut vectors = Vec::with_capacity(node_count(res));
        for k in 0..res.z {
            for j in 0..res.y {
                for i in 0..res.x {
                    let (x0, x1) = (i.saturating_sub(1), (i + 1).min(res.x - 1));
                    let (y0, y1) = (j.saturating_sub(1), (j + 1).min(res.y - 1));
                    let (z0, z1) = (k.saturating_sub(1), (k + 1).min(res.z - 1));
                    vectors.push(Vec3::new(
                        derivative(x0, x1, grid.value(x0, j, k), grid.value(x1, j, k), h.x),
                        derivative(y0, y1, grid.value(i, y0, k), grid.value(i, y1, k), h.y),
                        derivative(z0, z1, grid.value(i, j, z0), grid.value(i, j, z1), h.z),
                    ));
                }
            }
        }
        Self {
            resolution: res,
            vectors,
        }
    }

    /// Number of nodes along each axis.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Raw vectors, x-fastest.
    #[must_use]
    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }

    /// Vector at a node index.
    #[must_use]
    pub fn vector(&self, i: u32, j: u32, k: u32) -> Vec3 {
        self.vectors[linear_index(self.resolution, i, j, k)]
    }

    /// Samples the field at normalized texture coordinates.
    #[must_use]
    pub fn sample(&self, tex: Vec3) -> Vec3 {
        trilinear(self.resolution, tex, |i, j, k| self.vector(i, j, k))
    }
}

/// Read access to the externally owned volume data.
///
/// The renderer re-queries this every time it initializes and keeps the
/// returned handles only while it stays built.
pub trait VolumeSource {
    /// The current scalar field, if any.
    fn scalar_field(&self) -> Option<Arc<VolumeGrid>>;

    /// The precomputed gradient field, if the source provides one.
    fn gradient_field(&self) -> Option<Arc<GradientField>>;
}

/// A simple in-memory [`VolumeSource`].
#[derive(Debug, Clone, Default)]
pub struct VolumeData {
    scalar: Option<Arc<VolumeGrid>>,
    gradient: Option<Arc<GradientField>>,
}

impl VolumeData {
    /// Creates an empty data source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source holding `grid` and no gradient.
    #[must_use]
    pub fn with_volume(grid: VolumeGrid) -> Self {
        Self {
            scalar: Some(Arc::new(grid)),
            gradient: None,
        }
    }

    /// Replaces the scalar field. Drops a gradient that no longer lines up.
    pub fn set_volume(&mut self, grid: VolumeGrid) {
        if self
            .gradient
            .as_ref()
            .is_some_and(|g| g.resolution() != grid.resolution())
        {
            log::warn!("dropping gradient field: resolution no longer matches volume");
            self.gradient = None;
        }
        self.scalar = Some(Arc::new(grid));
    }

    /// Sets the gradient field. It must match the scalar field's resolution.
    pub fn set_gradient(&mut self, gradient: GradientField) -> Result<()> {
        let scalar = self.scalar.as_ref().ok_or(IsorayError::NoVolumeData)?;
        if scalar.resolution() != gradient.resolution() {
            return Err(IsorayError::SizeMismatch {
                expected: node_count(scalar.resolution()),
                actual: node_count(gradient.resolution()),
            });
        }
        self.gradient = Some(Arc::new(gradient));
        Ok(())
    }

    /// Computes and stores a central-difference gradient for the current volume.
    pub fn compute_gradient(&mut self) -> Result<()> {
        let scalar = self.scalar.as_ref().ok_or(IsorayError::NoVolumeData)?;
        self.gradient = Some(Arc::new(GradientField::from_central_differences(scalar)));
        Ok(())
    }

    /// Removes the gradient field.
    pub fn clear_gradient(&mut self) {
        self.gradient = None;
    }

    /// Removes all data.
    pub fn clear(&mut self) {
        self.scalar = None;
        self.gradient = None;
    }
}

impl VolumeSource for VolumeData {
    fn scalar_field(&self) -> Option<Arc<VolumeGrid>> {
        self.scalar.clone()
    }

    fn gradient_field(&self) -> Option<Arc<GradientField>> {
        self.gradient.clone()
    }
}

fn check_resolution(resolution: UVec3) -> Result<()> {
    if resolution.cmpeq(UVec3::ZERO).any() {
        return Err(IsorayError::InvalidResolution(
            resolution.x,
            resolution.y,
            resolution.z,
        ));
    }
    Ok(())
}

fn node_count(resolution: UVec3) -> usize {
    resolution.x as usize * resolution.y as usize * resolution.z as usize
}

fn linear_index(resolution: UVec3, i: u32, j: u32, k: u32) -> usize {
    let i = i.min(resolution.x - 1) as usize;
    let j = j.min(resolution.y - 1) as usize;
    let k = k.min(resolution.z - 1) as usize;
    let nx = resolution.x as usize;
    let ny = resolution.y as usize;
    i + j * nx + k * nx * ny
}

/// Lower texel, upper texel and blend weight along one axis.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn axis_footprint(u: f32, n: u32) -> (u32, u32, f32) {
    let p = (u * n as f32 - 0.5).clamp(0.0, (n - 1) as f32);
    let i0 = p.floor() as u32;
    let i1 = (i0 + 1).min(n - 1);
    (i0, i1, p - i0 as f32)
}

fn trilinear<T, F>(resolution: UVec3, tex: Vec3, fetch: F) -> T
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
    F: Fn(u32, u32, u32) -> T,
{
    let (x0, x1, fx) = axis_footprint(tex.x, resolution.x);
    let (y0, y1, fy) = axis_footprint(tex.y, resolution.y);
    let (z0, z1, fz) = axis_footprint(tex.z, resolution.z);
    let lerp = |a: T, b: T, t: f32| a * (1.0 - t) + b * t;

    let c00 = lerp(fetch(x0, y0, z0), fetch(x1, y0, z0), fx);
    let c10 = lerp(fetch(x0, y1, z0), fetch(x1, y1, z0), fx);
    let c01 = lerp(fetch(x0, y0, z1), fetch(x1, y0, z1), fx);
    let c11 = lerp(fetch(x0, y1, z1), fetch(x1, y1, z1), fx);
    lerp(lerp(c00, c10, fy), lerp(c01, c11, fy), fz)
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn ramp_x(n: u32) -> VolumeGrid {
        VolumeGrid::from_fn(UVec3::splat(n), Vec3::ONE, |i, _, _| i as f32).unwrap()
    }

    #[test]
    fn test_new_rejects_size_mismatch() {
        let err = VolumeGrid::new(UVec3::new(2, 2, 2), Vec3::ONE, vec![0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            IsorayError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_new_rejects_zero_resolution() {
        let err = VolumeGrid::new(UVec3::new(0, 2, 2), Vec3::ONE, vec![]).unwrap_err();
        assert!(matches!(err, IsorayError::InvalidResolution(0, 2, 2)));
    }

    #[test]
    fn test_extent_and_origin() {
        let grid = VolumeGrid::from_fn(UVec3::new(4, 2, 8), Vec3::new(0.5, 1.0, 0.25), |_, _, _| 0.0)
            .unwrap();
        assert_eq!(grid.extent(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(grid.origin(), Vec3::splat(-1.0));
    }

    #[test]
    fn test_sample_hits_texel_centers() {
        let grid = ramp_x(4);
        // Texel i has its center at u = (i + 0.5) / n.
        for i in 0..4u32 {
            let u = (i as f32 + 0.5) / 4.0;
            let v = grid.sample(Vec3::new(u, 0.5, 0.5));
            assert!((v - i as f32).abs() < 1e-5, "texel {i}: {v}");
        }
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let grid = ramp_x(4);
        assert!((grid.sample(Vec3::new(0.25, 0.5, 0.5)) - 0.5).abs() < 1e-5);
        assert_eq!(grid.sample(Vec3::new(-1.0, 0.5, 0.5)), 0.0);
        assert_eq!(grid.sample(Vec3::new(2.0, 0.5, 0.5)), 3.0);
    }

    #[test]
    fn test_world_to_tex_covers_box() {
        let grid = ramp_x(4);
        assert_eq!(grid.world_to_tex(grid.origin()), Vec3::ZERO);
        assert_eq!(grid.world_to_tex(grid.origin() + grid.extent()), Vec3::ONE);
    }

    #[test]
    fn test_value_range_ignores_nan() {
        let grid = VolumeGrid::new(UVec3::new(3, 1, 1), Vec3::ONE, vec![f32::NAN, -2.0, 5.0])
            .unwrap();
        assert_eq!(grid.value_range(), (-2.0, 5.0));
    }

    #[test]
    fn test_central_differences_of_ramp() {
        // f(x) = 2x sampled every 0.5 units.
        let grid =
            VolumeGrid::from_fn(UVec3::splat(5), Vec3::splat(0.5), |i, _, _| 2.0 * (i as f32 * 0.5))
                .unwrap();
        let gradient = GradientField::from_central_differences(&grid);
        for v in gradient.vectors() {
            assert!((v.x - 2.0).abs() < 1e-5);
            assert_eq!(v.y, 0.0);
            assert_eq!(v.z, 0.0);
        }
    }

    #[test]
    fn test_volume_data_gradient_must_match() {
        let mut data = VolumeData::new();
        let gradient = GradientField::new(UVec3::splat(2), vec![Vec3::X; 8]).unwrap();
        assert!(matches!(
            data.set_gradient(gradient.clone()),
            Err(IsorayError::NoVolumeData)
        ));

        data.set_volume(ramp_x(3));
        assert!(data.set_gradient(gradient).is_err());
        data.compute_gradient().unwrap();
        assert!(data.gradient_field().is_some());

        data.set_volume(ramp_x(4));
        assert!(data.gradient_field().is_none());
    }
}
