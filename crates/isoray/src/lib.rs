//! isoray: single-pass GPU isosurface raycasting for scalar volumes.
//!
//! A structured scalar volume is rendered by marching one ray per output
//! pixel through the volume box and shading the first crossing of an
//! isovalue. The whole ray/clip/march/shade sequence runs in a single
//! compute dispatch per frame.
//!
//! # Quick Start
//!
//! ```no_run
//! use isoray::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let grid = synthetic::sphere(UVec3::splat(64), Vec3::splat(1.0 / 64.0))?;
//!     let data = synthetic::volume_data(grid, true)?;
//!
//!     let mut options = Options::default();
//!     options.parameters.set_gradient_shading(true);
//!
//!     let mut camera = Camera::for_viewport(800, 600);
//!     camera.look_at_volume(&data.scalar_field().unwrap());
//!     render_to_file("sphere.png", &data, &camera.state(), &options)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`VolumeRenderer`] is the lifecycle contract: `initialize`, then per
//!   frame `update_frame` and `render_frame`, with `clean` and
//!   `reload_program` for teardown and live shader edits.
//! - [`IsoRaycaster`] implements it on the GPU with wgpu.
//! - [`CpuIsoRaycaster`] implements it on the CPU with the same numerics and
//!   serves as the reference in tests.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod headless;
pub mod sweep;
pub mod synthetic;

pub use headless::{
    render_once, render_to_file, render_to_image, render_to_image_cpu, RenderedImage,
};
pub use sweep::{run_step_size_sweep, run_sweep, SweepReport, SweepSample};

// Re-export core types
pub use isoray_core::{
    march_isosurface, quantize_unorm8, shade, CameraState, CpuIsoRaycaster, DisplayScaling,
    FrameConfig, GradientField, GridDataType, IsoHit, IsorayError, LightingConfig, Mat4,
    Options, ParameterRange, ParameterSpace, Ray, RayGenerator, RayInterval, RenderParameters,
    RenderSettings, Result, UVec2, UVec3, Vec3, Vec4, VolumeBox, VolumeData, VolumeGrid,
    VolumeRenderer, VolumeSource, STEP_SIZE_PARAMETER,
};

// Re-export render types
pub use isoray_render::{
    save_image, Camera, GpuContext, IsoRaycaster, ProgramSource, RenderError, ScreenshotError,
};

/// Initializes `env_logger` from `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("isoray logging initialized");
    }
}
