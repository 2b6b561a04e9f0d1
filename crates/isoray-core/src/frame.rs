//! Per-frame configuration and its GPU uniform layout.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2, Vec3, Vec4};

use crate::camera::CameraState;
use crate::params::RenderParameters;
use crate::ray::RayGenerator;
use crate::shading::LightingConfig;
use crate::volume::VolumeGrid;

/// Work-items per workgroup along each image axis.
pub const WORKGROUP_SIZE: u32 = 16;

/// Number of pixels a single dispatch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchExtent {
    pub width: u32,
    pub height: u32,
}

impl DispatchExtent {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Workgroup counts covering every pixel.
    ///
    /// Edge workgroups may overhang; the kernel discards those invocations.
    #[must_use]
    pub fn workgroups(&self) -> (u32, u32) {
        (
            self.width.div_ceil(WORKGROUP_SIZE),
            self.height.div_ceil(WORKGROUP_SIZE),
        )
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn as_uvec2(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

/// Grid uniforms, fixed for the lifetime of a built renderer.
///
/// Must match `GridUniforms` in `ray_bbox_intersection.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridUniforms {
    /// Node counts in xyz, w unused.
    pub resolution: [f32; 4],
    pub voxel_size: [f32; 4],
    pub extent: [f32; 4],
    /// World position of the box's minimum corner.
    pub origin: [f32; 4],
}

impl GridUniforms {
    /// Derives the grid uniforms from a volume.
    #[must_use]
    pub fn from_grid(grid: &VolumeGrid) -> Self {
        Self {
            resolution: grid.resolution().as_vec3().extend(0.0).to_array(),
            voxel_size: grid.voxel_size().extend(0.0).to_array(),
            extent: grid.extent().extend(0.0).to_array(),
            origin: grid.origin().extend(0.0).to_array(),
        }
    }
}

/// Snapshot of everything one dispatch reads.
///
/// Rebuilt every frame from the camera, the parameters and the lighting
/// settings and handed to the dispatch as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConfig {
    pub extent: DispatchExtent,
    pub eye: Vec3,
    pub look_at: Mat4,
    pub projection: Mat4,
    pub tan_half_fov_y: f32,
    pub aspect_ratio: f32,
    pub isovalue: f32,
    pub step_size: f32,
    pub color: Vec4,
    /// Shading flag gated on gradient availability.
    pub gradient_shading: bool,
    pub lighting: LightingConfig,
}

impl FrameConfig {
    /// Builds the configuration for one frame.
    ///
    /// Gradient shading is only enabled when requested and a gradient field
    /// is bound.
    #[must_use]
    pub fn new(
        extent: DispatchExtent,
        camera: &CameraState,
        parameters: &RenderParameters,
        lighting: &LightingConfig,
        gradient_available: bool,
    ) -> Self {
        Self {
            extent,
            eye: camera.eye,
            look_at: camera.look_at,
            projection: camera.projection,
            tan_half_fov_y: camera.tan_half_fov_y(),
            aspect_ratio: camera.aspect_ratio,
            isovalue: parameters.isovalue,
            step_size: parameters.step_size,
            color: parameters.color,
            gradient_shading: parameters.gradient_shading && gradient_available,
            lighting: *lighting,
        }
    }

    /// Ray generator for this frame's camera.
    #[must_use]
    pub fn ray_generator(&self) -> RayGenerator {
        RayGenerator::new(self.eye, self.look_at, self.tan_half_fov_y, self.aspect_ratio)
    }

    /// GPU layout of this configuration.
    #[must_use]
    pub fn to_uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            look_at: self.look_at.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            eye: self.eye.extend(1.0).to_array(),
            color: self.color.to_array(),
            light_position: self.lighting.light_position.extend(1.0).to_array(),
            specular_intensity: self.lighting.specular_intensity.extend(0.0).to_array(),
            tan_half_fov_y: self.tan_half_fov_y,
            aspect_ratio: self.aspect_ratio,
            isovalue: self.isovalue,
            step_size: self.step_size,
            ambient: self.lighting.ambient,
            diffuse: self.lighting.diffuse,
            specular: self.lighting.specular,
            shininess: self.lighting.shininess,
            extent: [self.extent.width, self.extent.height],
            apply_gradient_shading: u32::from(self.gradient_shading),
            _pad: 0,
        }
    }
}

/// Per-frame uniforms.
///
/// Must match `FrameUniforms` in `ray_bbox_intersection.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub look_at: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub color: [f32; 4],
    pub light_position: [f32; 4],
    pub specular_intensity: [f32; 4],
    pub tan_half_fov_y: f32,
    pub aspect_ratio: f32,
    pub isovalue: f32,
    pub step_size: f32,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
    pub extent: [u32; 2],
    pub apply_gradient_shading: u32,
    pub _pad: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<GridUniforms>(), 64);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 240);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn test_workgroups_cover_extent() {
        assert_eq!(DispatchExtent::new(640, 480).workgroups(), (40, 30));
        assert_eq!(DispatchExtent::new(641, 1).workgroups(), (41, 1));
        assert_eq!(DispatchExtent::new(17, 33).pixel_count(), 561);
    }

    #[test]
    fn test_gradient_shading_gated() {
        let params = RenderParameters {
            gradient_shading: true,
            ..RenderParameters::default()
        };
        let extent = DispatchExtent::new(4, 4);
        let camera = CameraState::default();
        let lighting = LightingConfig::default();
        assert!(!FrameConfig::new(extent, &camera, &params, &lighting, false).gradient_shading);
        let config = FrameConfig::new(extent, &camera, &params, &lighting, true);
        assert!(config.gradient_shading);
        assert_eq!(config.to_uniforms().apply_gradient_shading, 1);
    }

    #[test]
    fn test_grid_uniforms() {
        let grid = VolumeGrid::from_fn(UVec3::new(4, 2, 8), Vec3::new(0.5, 1.0, 0.25), |_, _, _| 0.0).unwrap();
        let uniforms = GridUniforms::from_grid(&grid);
        assert_eq!(uniforms.resolution, [4.0, 2.0, 8.0, 0.0]);
        assert_eq!(uniforms.extent, [2.0, 2.0, 2.0, 0.0]);
        assert_eq!(uniforms.origin, [-1.0, -1.0, -1.0, 0.0]);
    }
}
