//! Procedural volumes for demos, tests and benchmarks.
//!
//! Every generator evaluates its field at node centers in world space, so the
//! fields line up with how the marcher samples them: the volume box is
//! centered on the origin and node `(i, j, k)` sits at
//! `origin + (index + 0.5) * voxel_size`.

use glam::{UVec3, Vec3};
use isoray_core::{Result, VolumeData, VolumeGrid};

/// Coordinate axis of a [`ramp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    fn pick(self, v: Vec3) -> f32 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn node_position(resolution: UVec3, voxel_size: Vec3, i: u32, j: u32, k: u32) -> Vec3 {
    let origin = -0.5 * resolution.as_vec3() * voxel_size;
    origin + (Vec3::new(i as f32, j as f32, k as f32) + 0.5) * voxel_size
}

/// Radial field equal to 1 at the center and 0 on the sphere inscribed in
/// the box. The 0.5 isosurface is a sphere of half that radius.
pub fn sphere(resolution: UVec3, voxel_size: Vec3) -> Result<VolumeGrid> {
    let radius = 0.5 * (resolution.as_vec3() * voxel_size).min_element();
    VolumeGrid::from_fn(resolution, voxel_size, |i, j, k| {
        let p = node_position(resolution, voxel_size, i, j, k);
        1.0 - p.length() / radius
    })
}

/// Field rising linearly from 0 to 1 across the box along `axis`.
///
/// Sampled values equal the normalized texture coordinate along the axis, so
/// the 0.5 isosurface is the mid-plane of the box.
pub fn ramp(resolution: UVec3, voxel_size: Vec3, axis: Axis) -> Result<VolumeGrid> {
    let extent = resolution.as_vec3() * voxel_size;
    let half = 0.5 * axis.pick(extent);
    VolumeGrid::from_fn(resolution, voxel_size, |i, j, k| {
        let p = node_position(resolution, voxel_size, i, j, k);
        (axis.pick(p) + half) / axis.pick(extent)
    })
}

/// Field holding `value` everywhere.
pub fn constant(resolution: UVec3, voxel_size: Vec3, value: f32) -> Result<VolumeGrid> {
    VolumeGrid::from_fn(resolution, voxel_size, |_, _, _| value)
}

/// Wraps `grid` into a volume source, with a central-difference gradient
/// field when `with_gradient` is set.
pub fn volume_data(grid: VolumeGrid, with_gradient: bool) -> Result<VolumeData> {
    let mut data = VolumeData::with_volume(grid);
    if with_gradient {
        data.compute_gradient()?;
    }
    Ok(data)
}
